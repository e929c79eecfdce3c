use std::fmt;
use std::str::FromStr;

use crate::protocol::ROOT_PATH;

/// How the back button decides whether it is enabled.
///
/// `go_back` never moves unless at least two paths are on the back stack, but
/// the legacy rule enables the button as soon as one is. `Movable` ties the
/// button to actual movement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackPolicy {
    #[default]
    Legacy,
    Movable,
}

impl FromStr for BackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Self::Legacy),
            "movable" => Ok(Self::Movable),
            other => Err(format!("unknown back policy: {other}")),
        }
    }
}

impl fmt::Display for BackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Legacy => "legacy",
            Self::Movable => "movable",
        })
    }
}

/// Back/forward path stacks. The top of `back` is the current path once
/// anything has been visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    current: String,
    back: Vec<String>,
    forward: Vec<String>,
    policy: BackPolicy,
}

impl Default for History {
    fn default() -> Self {
        Self::new(BackPolicy::default())
    }
}

impl History {
    pub fn new(policy: BackPolicy) -> Self {
        Self {
            current: ROOT_PATH.to_string(),
            back: Vec::new(),
            forward: Vec::new(),
            policy,
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn back_stack(&self) -> &[String] {
        &self.back
    }

    pub fn forward_stack(&self) -> &[String] {
        &self.forward
    }

    pub const fn policy(&self) -> BackPolicy {
        self.policy
    }

    /// A new, user-initiated visit. Consecutive repeats are not stacked.
    pub fn navigate(&mut self, path: &str) {
        let path = if path.is_empty() { ROOT_PATH } else { path };
        self.current = path.to_string();
        if self.back.last().map(String::as_str) != Some(path) {
            self.back.push(self.current.clone());
        }
        self.forward.clear();
    }

    /// Step back, returning the path to replay. Needs two paths on the stack.
    pub fn go_back(&mut self) -> Option<&str> {
        if self.back.len() <= 1 {
            return None;
        }
        let left = self.back.pop()?;
        self.forward.push(left);
        self.current = self.back.last()?.clone();
        Some(&self.current)
    }

    pub fn go_forward(&mut self) -> Option<&str> {
        let next = self.forward.pop()?;
        self.back.push(next.clone());
        self.current = next;
        Some(&self.current)
    }

    pub fn back_enabled(&self) -> bool {
        match self.policy {
            BackPolicy::Legacy => !self.back.is_empty(),
            BackPolicy::Movable => self.back.len() > 1,
        }
    }

    pub fn forward_enabled(&self) -> bool {
        !self.forward.is_empty()
    }
}

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::protocol::{Entry, EntryDetails, Listing, ServerFailure};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortCriterion {
    #[default]
    NameAsc,
    NameDesc,
    ModifiedAsc,
    ModifiedDesc,
    SizeAsc,
    SizeDesc,
}

impl SortCriterion {
    pub const ALL: [Self; 6] = [
        Self::NameAsc,
        Self::NameDesc,
        Self::ModifiedAsc,
        Self::ModifiedDesc,
        Self::SizeAsc,
        Self::SizeDesc,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NameAsc => "name_asc",
            Self::NameDesc => "name_desc",
            Self::ModifiedAsc => "modified_asc",
            Self::ModifiedDesc => "modified_desc",
            Self::SizeAsc => "size_asc",
            Self::SizeDesc => "size_desc",
        }
    }

    /// The next criterion in `ALL`, wrapping around.
    pub fn cycle(self) -> Self {
        let index = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn compare(self, a: &Entry, b: &Entry) -> Ordering {
        match self {
            Self::NameAsc => compare_names(a.name(), b.name()),
            Self::NameDesc => compare_names(b.name(), a.name()),
            Self::ModifiedAsc => modified_millis(&a.details).cmp(&modified_millis(&b.details)),
            Self::ModifiedDesc => modified_millis(&b.details).cmp(&modified_millis(&a.details)),
            Self::SizeAsc => a.details.size.unwrap_or(0).cmp(&b.details.size.unwrap_or(0)),
            Self::SizeDesc => b.details.size.unwrap_or(0).cmp(&a.details.size.unwrap_or(0)),
        }
    }
}

impl FromStr for SortCriterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown sort criterion: {s}"))
    }
}

impl fmt::Display for SortCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collation-style name order. Base letters decide first (accents and case
/// folded away), then accents, then case with lowercase first.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| case_folded(a).cmp(case_folded(b)))
        .then_with(|| b.cmp(a))
}

fn base_letters(name: &str) -> impl Iterator<Item = char> + '_ {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn case_folded(name: &str) -> impl Iterator<Item = char> + '_ {
    name.nfd().flat_map(char::to_lowercase)
}

/// Milliseconds since the epoch; anything unparseable counts as the epoch.
pub fn modified_millis(details: &EntryDetails) -> i64 {
    details.modified.as_deref().and_then(parse_timestamp).unwrap_or(0)
}

pub fn parse_timestamp(value: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// What the render layer should show instead of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder<'a> {
    Loading,
    Empty,
    Error(&'a ServerFailure),
}

#[derive(Debug, Clone, PartialEq)]
enum Content {
    Loading,
    Ready {
        listing: Listing,
        /// Indices into `listing.entries` in render order.
        order: Vec<usize>,
    },
    Failed(ServerFailure),
}

/// The authoritative "what to render" for the current path.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingView {
    content: Content,
    sort: Option<SortCriterion>,
}

impl Default for ListingView {
    fn default() -> Self {
        Self::new(SortCriterion::default())
    }
}

impl ListingView {
    pub fn new(sort: SortCriterion) -> Self {
        Self {
            content: Content::Loading,
            sort: Some(sort),
        }
    }

    /// `None` when an unrecognised criterion was chosen; entries then keep
    /// server order.
    pub const fn sort_criterion(&self) -> Option<SortCriterion> {
        self.sort
    }

    pub fn set_loading(&mut self) {
        self.content = Content::Loading;
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self.content, Content::Loading)
    }

    /// Accept `listing` only if it describes `current_path`.
    pub fn apply_listing(&mut self, listing: Listing, current_path: &str) -> bool {
        if listing.path != current_path {
            tracing::debug!(
                "Dropping stale listing for {} (current is {})",
                listing.path,
                current_path
            );
            return false;
        }
        let order = self.sorted_order(&listing.entries);
        self.content = Content::Ready { listing, order };
        true
    }

    pub fn show_failure(&mut self, failure: ServerFailure) {
        self.content = Content::Failed(failure);
    }

    pub fn set_sort_criterion(&mut self, criterion: SortCriterion) {
        self.sort = Some(criterion);
        self.resort();
    }

    /// String form used by the render layer; unknown values fall back to
    /// server order.
    pub fn set_sort_criterion_str(&mut self, criterion: &str) {
        self.sort = criterion.parse().ok();
        if self.sort.is_none() {
            tracing::debug!("Unknown sort criterion {:?}, keeping server order", criterion);
        }
        self.resort();
    }

    fn resort(&mut self) {
        let order = match &self.content {
            Content::Ready { listing, .. } => self.sorted_order(&listing.entries),
            _ => return,
        };
        if let Content::Ready { order: current, .. } = &mut self.content {
            *current = order;
        }
    }

    fn sorted_order(&self, entries: &[Entry]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..entries.len()).collect();
        if let Some(sort) = self.sort {
            // Stable, so ties keep server order.
            order.sort_by(|&a, &b| sort.compare(&entries[a], &entries[b]));
        }
        order
    }

    pub fn listing(&self) -> Option<&Listing> {
        match &self.content {
            Content::Ready { listing, .. } => Some(listing),
            _ => None,
        }
    }

    pub fn folder_details(&self) -> Option<&EntryDetails> {
        self.listing().and_then(|l| l.details.as_ref())
    }

    /// Entries in render order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        let (entries, order): (&[Entry], &[usize]) = match &self.content {
            Content::Ready { listing, order } => (&listing.entries, order),
            _ => (&[], &[]),
        };
        order.iter().map(move |&i| &entries[i])
    }

    /// Render-pass visibility filter; the listing itself is untouched.
    pub fn filter<'a>(&'a self, query: &str) -> Vec<&'a Entry> {
        let needle = query.to_lowercase();
        self.entries()
            .filter(|entry| entry.name().to_lowercase().contains(&needle))
            .collect()
    }

    pub fn placeholder(&self) -> Option<Placeholder<'_>> {
        match &self.content {
            Content::Loading => Some(Placeholder::Loading),
            Content::Failed(failure) => Some(Placeholder::Error(failure)),
            Content::Ready { listing, .. } if listing.entries.is_empty() => {
                Some(Placeholder::Empty)
            }
            Content::Ready { .. } => None,
        }
    }
}

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use crate::error::{BrowseError, BrowseResult};
use crate::protocol::{
    ClientEvent, ListDirRequest, ListDirResponse, Listing, Outcome, ServerEvent,
};
use crate::session::{Session, Subscription};

/// Default deadline for an ad hoc fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Issues listing requests and matches their responses.
///
/// Navigation requests are fire-and-forget and correlated by path against the
/// current path by whoever observes the response. Ad hoc fetches carry an
/// explicit request id and own their subscription for their whole lifetime.
#[derive(Clone, Debug)]
pub struct Correlator {
    session: Session,
    next_request_id: Arc<AtomicU64>,
}

impl Correlator {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            next_request_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn request_listing(&self, path: &str) -> BrowseResult<()> {
        tracing::info!("Requesting listing for {}", path);
        self.session.emit(ClientEvent::ListDir(ListDirRequest {
            path: path.to_string(),
            request_id: None,
        }))
    }

    /// Fetch one listing outside of navigation, failing with `Timeout` when
    /// nothing matching arrives in time.
    pub async fn fetch_once(&self, path: &str, timeout: Duration) -> BrowseResult<Listing> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        // Subscribe before emitting so a fast response cannot slip past.
        let mut subscription = self.session.subscribe();
        self.session.emit(ClientEvent::ListDir(ListDirRequest {
            path: path.to_string(),
            request_id: Some(request_id),
        }))?;
        tracing::debug!("Ad hoc fetch #{} for {}", request_id, path);

        // The subscription is dropped with this frame on every path out.
        match tokio::time::timeout(timeout, await_reply(&mut subscription, request_id, path)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Ad hoc fetch #{} for {} timed out", request_id, path);
                Err(BrowseError::Timeout {
                    path: path.to_string(),
                    after: timeout,
                })
            }
        }
    }
}

async fn await_reply(
    subscription: &mut Subscription,
    request_id: u64,
    path: &str,
) -> BrowseResult<Listing> {
    loop {
        let ServerEvent::ListDirResult(response) = subscription.recv().await? else {
            continue;
        };
        if !is_reply_to(&response, request_id, path) {
            continue;
        }
        match response.outcome() {
            Outcome::Listing(listing) => return Ok(listing),
            Outcome::Failure(failure) => {
                return Err(BrowseError::Server {
                    code: failure.code,
                    message: failure.message,
                })
            }
            Outcome::Incomplete => continue,
        }
    }
}

/// An echoed request id must be ours; without one, fall back to the path.
fn is_reply_to(response: &ListDirResponse, request_id: u64, path: &str) -> bool {
    match response.request_id {
        Some(id) => id == request_id,
        None => response.path() == Some(path),
    }
}

use std::time::Duration;

use crate::correlator::{Correlator, DEFAULT_FETCH_TIMEOUT};
use crate::error::{BrowseError, BrowseResult};
use crate::history::{BackPolicy, History};
use crate::listing::{ListingView, Placeholder, SortCriterion};
use crate::media::{self, MediaKind, UrlBuilder};
use crate::protocol::{Entry, EntryDetails, EntryKind, Outcome, ServerEvent, ROOT_PATH};
use crate::selection::{Region, Selection};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8888";

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub base_url: String,
    pub fetch_timeout: Duration,
    pub back_policy: BackPolicy,
    pub sort: SortCriterion,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            back_policy: BackPolicy::default(),
            sort: SortCriterion::default(),
        }
    }
}

/// What activating an entry asks the presentation layer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// A directory was opened; a listing request is already in flight.
    Navigated(String),
    Stream {
        kind: MediaKind,
        url: String,
        mime: Option<String>,
    },
    Download {
        name: String,
        url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub name: String,
    pub url: String,
}

/// Owned state of the browsing session. All mutation goes through here, from
/// a single event-processing task.
#[derive(Debug)]
pub struct Browser {
    correlator: Correlator,
    urls: UrlBuilder,
    fetch_timeout: Duration,
    history: History,
    view: ListingView,
    selection: Selection,
    status: Option<String>,
    notice: Option<String>,
    folder_info_open: bool,
    sidebar_open: bool,
}

impl Browser {
    pub fn new(correlator: Correlator, options: BrowserOptions) -> Self {
        Self {
            correlator,
            urls: UrlBuilder::new(options.base_url),
            fetch_timeout: options.fetch_timeout,
            history: History::new(options.back_policy),
            view: ListingView::new(options.sort),
            selection: Selection::default(),
            status: None,
            notice: None,
            folder_info_open: false,
            sidebar_open: false,
        }
    }

    // --- Read access ---

    pub fn current_path(&self) -> &str {
        self.history.current()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn view(&self) -> &ListingView {
        &self.view
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn back_enabled(&self) -> bool {
        self.history.back_enabled()
    }

    pub fn forward_enabled(&self) -> bool {
        self.history.forward_enabled()
    }

    pub fn placeholder(&self) -> Option<Placeholder<'_>> {
        self.view.placeholder()
    }

    /// Entries for this render pass, narrowed by a name filter.
    pub fn visible_entries(&self, query: &str) -> Vec<&Entry> {
        self.view.filter(query)
    }

    pub fn actions_visible(&self, entry: &Entry) -> bool {
        self.selection.actions_visible(entry)
    }

    pub fn folder_details(&self) -> Option<&EntryDetails> {
        self.view.folder_details()
    }

    pub const fn is_folder_info_open(&self) -> bool {
        self.folder_info_open
    }

    pub const fn is_sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    // --- Navigation ---

    pub fn start(&mut self) -> BrowseResult<()> {
        self.navigate(ROOT_PATH)
    }

    /// A new visit: pushes history and drops any forward trail.
    pub fn navigate(&mut self, path: &str) -> BrowseResult<()> {
        self.history.navigate(path);
        tracing::info!("Navigating to {}", self.history.current());
        self.load_current()
    }

    pub fn go_back(&mut self) -> BrowseResult<bool> {
        if self.history.go_back().is_none() {
            return Ok(false);
        }
        tracing::info!("Back to {}", self.history.current());
        self.load_current()?;
        Ok(true)
    }

    pub fn go_forward(&mut self) -> BrowseResult<bool> {
        if self.history.go_forward().is_none() {
            return Ok(false);
        }
        tracing::info!("Forward to {}", self.history.current());
        self.load_current()?;
        Ok(true)
    }

    /// Request the current path again without touching history.
    pub fn refresh(&mut self) -> BrowseResult<()> {
        self.load_current()
    }

    fn load_current(&mut self) -> BrowseResult<()> {
        self.view.set_loading();
        self.status = Some("Loading...".to_string());
        let requested = self.correlator.request_listing(self.history.current());
        self.folder_info_open = false;
        self.sidebar_open = false;
        self.selection.clear();
        requested
    }

    // --- Server events ---

    /// Apply one inbound event. Returns whether anything visible changed.
    pub fn handle_event(&mut self, event: ServerEvent) -> bool {
        match event {
            ServerEvent::ListDirStatus(status) => {
                if !status.is_loading() {
                    return false;
                }
                self.status = Some(format!("Loading {}...", status.path.unwrap_or_default()));
                true
            }
            ServerEvent::ListDirResult(response) => {
                if response.request_id.is_some() {
                    // Owned by an ad hoc fetch.
                    return false;
                }
                self.status = None;
                match response.outcome() {
                    Outcome::Listing(listing) => {
                        if !self.view.apply_listing(listing, self.history.current()) {
                            tracing::warn!(
                                "Ignoring listing that no longer matches {}",
                                self.history.current()
                            );
                        }
                    }
                    Outcome::Failure(failure) => {
                        tracing::warn!("Listing {} failed: {}", self.history.current(), failure);
                        self.view.show_failure(failure);
                    }
                    Outcome::Incomplete => {
                        tracing::debug!("Listing response without data, waiting");
                    }
                }
                true
            }
        }
    }

    // --- Sorting ---

    pub fn set_sort(&mut self, criterion: SortCriterion) {
        self.view.set_sort_criterion(criterion);
    }

    pub fn set_sort_str(&mut self, criterion: &str) {
        self.view.set_sort_criterion_str(criterion);
    }

    // --- Selection ---

    pub fn select(&mut self, path: &str) {
        self.selection.select(path.to_string());
    }

    pub fn toggle_selection(&mut self, path: &str) {
        self.selection.toggle(path.to_string());
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn pointer(&mut self, region: Region) {
        if self.selection.pointer(region) {
            tracing::debug!("Selection cleared by pointer outside interactive regions");
        }
    }

    // --- Transient UI ---

    /// Opens the folder-info modal if the current folder has details.
    pub fn open_folder_info(&mut self) -> bool {
        self.folder_info_open = self.view.folder_details().is_some();
        self.folder_info_open
    }

    pub fn close_folder_info(&mut self) {
        self.folder_info_open = false;
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn close_sidebar(&mut self) {
        self.sidebar_open = false;
    }

    /// Escape closes every transient surface.
    pub fn escape(&mut self) {
        self.sidebar_open = false;
        self.folder_info_open = false;
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    // --- Entry actions ---

    /// Open an entry from the current listing: directories navigate, media
    /// streams, everything else downloads.
    pub fn activate(&mut self, path: &str) -> BrowseResult<Option<Intent>> {
        let Some(entry) = self.view.entries().find(|e| e.path == path).cloned() else {
            return Ok(None);
        };
        if entry.kind == EntryKind::Directory {
            self.navigate(&entry.path)?;
            return Ok(Some(Intent::Navigated(entry.path)));
        }
        Ok(Some(
            self.stream_intent(&entry)
                .unwrap_or_else(|| self.download_intent(&entry)),
        ))
    }

    pub fn stream_intent(&self, entry: &Entry) -> Option<Intent> {
        Some(Intent::Stream {
            kind: MediaKind::of(entry)?,
            url: self.urls.playback(entry)?,
            mime: media::stream_mime(entry),
        })
    }

    pub fn download_intent(&self, entry: &Entry) -> Intent {
        Intent::Download {
            name: entry.name().to_string(),
            url: self.urls.download(&entry.path),
        }
    }

    /// Start a bulk download of the files directly inside `path`. The
    /// returned job runs independently of navigation.
    pub fn begin_folder_download(&mut self, path: &str) -> FolderDownload {
        self.status = Some("Fetching folder contents...".to_string());
        FolderDownload {
            correlator: self.correlator.clone(),
            urls: self.urls.clone(),
            path: path.to_string(),
            timeout: self.fetch_timeout,
        }
    }

    /// Folder-info modal action: download the current folder and close.
    pub fn download_current_folder(&mut self) -> FolderDownload {
        let path = self.history.current().to_string();
        self.folder_info_open = false;
        self.begin_folder_download(&path)
    }

    /// Record how a folder download ended; failures become a user notice.
    pub fn finish_folder_download(
        &mut self,
        result: &BrowseResult<Vec<DownloadTarget>>,
    ) {
        self.status = None;
        match result {
            Ok(targets) => {
                tracing::info!("Folder download resolved {} files", targets.len());
            }
            Err(e @ BrowseError::NoFiles { .. }) => self.notice = Some(e.to_string()),
            Err(BrowseError::Server { .. }) => {
                self.notice = Some("Could not fetch folder contents.".to_string());
            }
            Err(e) => {
                tracing::error!("Folder download failed: {}", e);
                self.notice = Some(format!("Failed to download folder files: {e}"));
            }
        }
    }
}

/// A pending bulk download, detached from the browser so the event loop can
/// keep running while it waits.
#[derive(Debug, Clone)]
pub struct FolderDownload {
    correlator: Correlator,
    urls: UrlBuilder,
    path: String,
    timeout: Duration,
}

impl FolderDownload {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolve the files (not subfolders) inside the folder to download URLs.
    pub async fn run(self) -> BrowseResult<Vec<DownloadTarget>> {
        let listing = self.correlator.fetch_once(&self.path, self.timeout).await?;
        let targets: Vec<DownloadTarget> = listing
            .entries
            .iter()
            .filter(|entry| entry.kind == EntryKind::File)
            .map(|entry| DownloadTarget {
                name: entry.name().to_string(),
                url: self.urls.download(&entry.path),
            })
            .collect();
        if targets.is_empty() {
            return Err(BrowseError::NoFiles { path: self.path });
        }
        Ok(targets)
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
};
use futures::stream::{FuturesUnordered, StreamExt};
use itertools::Itertools;
use ratatui::layout::{Position, Rect};
use tokio::sync::mpsc;

use super::ui::{render, ScreenMap};
use crate::browser::{Browser, DownloadTarget, FolderDownload, Intent};
use crate::config::Config;
use crate::correlator::Correlator;
use crate::error::{BrowseError, BrowseResult};
use crate::protocol::Entry;
use crate::selection::Region;
use crate::session::{Session, Subscription};

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Terminal-side state layered over the browser core: cursor, filter text
/// and the last thing worth telling the user.
pub struct App {
    pub browser: Browser,
    pub server_addr: String,
    pub cursor: usize,
    pub query: String,
    pub searching: bool,
    pub message: Option<String>,
    pub regions: Vec<(Rect, Region)>,
    /// First entry row shown by the last draw.
    pub list_offset: usize,
    pub should_quit: bool,
}

/// Work the key handler hands back to the event loop.
#[derive(Debug)]
pub enum Action {
    None,
    Spawn(FolderDownload),
}

impl App {
    pub fn new(browser: Browser, server_addr: String) -> Self {
        Self {
            browser,
            server_addr,
            cursor: 0,
            query: String::new(),
            searching: false,
            message: None,
            regions: Vec::new(),
            list_offset: 0,
            should_quit: false,
        }
    }

    pub fn visible_entries(&self) -> Vec<&Entry> {
        self.browser.visible_entries(&self.query)
    }

    fn cursor_entry(&self) -> Option<Entry> {
        let entries = self.visible_entries();
        if entries.is_empty() {
            return None;
        }
        entries
            .get(self.cursor.min(entries.len() - 1))
            .map(|entry| (*entry).clone())
    }

    fn reset_for_navigation(&mut self) {
        self.cursor = 0;
        self.query.clear();
        self.searching = false;
    }

    pub fn next_entry(&mut self) {
        let len = self.visible_entries().len();
        if len > 0 && self.cursor + 1 < len {
            self.cursor += 1;
        }
    }

    pub fn previous_entry(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn report(&mut self, result: BrowseResult<()>) {
        if let Err(e) = result {
            tracing::error!("Request failed: {}", e);
            self.message = Some(e.to_string());
        }
    }

    fn show_intent(&mut self, intent: Intent) {
        self.message = Some(match intent {
            Intent::Navigated(_) => return,
            Intent::Stream { url, mime, .. } => {
                format!("Stream {} ({})", url, mime.unwrap_or_default())
            }
            Intent::Download { name, url } => format!("Download {name}: {url}"),
        });
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }

        if self.browser.notice().is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.browser.dismiss_notice();
            }
            return Action::None;
        }

        if self.searching {
            match key.code {
                KeyCode::Esc => {
                    self.searching = false;
                    self.query.clear();
                }
                KeyCode::Enter => self.searching = false,
                KeyCode::Backspace => {
                    self.query.pop();
                }
                KeyCode::Char(c) => {
                    self.query.push(c);
                    self.cursor = 0;
                }
                _ => {}
            }
            return Action::None;
        }

        if self.browser.is_folder_info_open() {
            match key.code {
                KeyCode::Esc | KeyCode::Char('i') => self.browser.close_folder_info(),
                KeyCode::Char('d') => {
                    return Action::Spawn(self.browser.download_current_folder());
                }
                _ => {}
            }
            return Action::None;
        }

        self.message = None;
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.next_entry(),
            KeyCode::Up | KeyCode::Char('k') => self.previous_entry(),
            KeyCode::Enter => {
                if let Some(entry) = self.cursor_entry() {
                    match self.browser.activate(&entry.path) {
                        Ok(Some(Intent::Navigated(_))) => self.reset_for_navigation(),
                        Ok(Some(intent)) => self.show_intent(intent),
                        Ok(None) => {}
                        Err(e) => self.report(Err(e)),
                    }
                }
            }
            KeyCode::Char(' ') => {
                if let Some(entry) = self.cursor_entry() {
                    self.browser.toggle_selection(&entry.path);
                }
            }
            KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => {
                let moved = self.browser.go_back();
                if matches!(moved, Ok(true)) {
                    self.reset_for_navigation();
                }
                self.report(moved.map(|_| ()));
            }
            KeyCode::Right | KeyCode::Char('l') => {
                let moved = self.browser.go_forward();
                if matches!(moved, Ok(true)) {
                    self.reset_for_navigation();
                }
                self.report(moved.map(|_| ()));
            }
            KeyCode::Char('r') => {
                let result = self.browser.refresh();
                self.report(result);
            }
            KeyCode::Char('s') => {
                let next = self
                    .browser
                    .view()
                    .sort_criterion()
                    .map_or_else(Default::default, |c| c.cycle());
                self.browser.set_sort(next);
            }
            KeyCode::Char('/') => self.searching = true,
            KeyCode::Char('i') => {
                if !self.browser.open_folder_info() {
                    self.message = Some("No folder details yet".to_string());
                }
            }
            KeyCode::Char('m') => self.browser.toggle_sidebar(),
            KeyCode::Esc => self.browser.escape(),
            KeyCode::Char('p') => {
                if let Some(entry) = self.cursor_entry() {
                    if let Some(intent) = self.browser.stream_intent(&entry) {
                        self.show_intent(intent);
                    }
                }
            }
            KeyCode::Char('d') => {
                if let Some(entry) = self.cursor_entry() {
                    if !self.browser.actions_visible(&entry) {
                        self.message = Some("Select the folder first (Space)".to_string());
                    } else if entry.is_dir() {
                        return Action::Spawn(self.browser.begin_folder_download(&entry.path));
                    } else {
                        let intent = self.browser.download_intent(&entry);
                        self.show_intent(intent);
                    }
                }
            }
            _ => {}
        }
        Action::None
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
            return;
        }
        let position = Position::new(mouse.column, mouse.row);
        let region = self
            .regions
            .iter()
            .find(|(rect, _)| rect.contains(position))
            .map_or(Region::Outside, |(_, region)| *region);
        self.browser.pointer(region);
        if region == Region::EntryCard {
            if let Some((rect, _)) = self.regions.iter().find(|(_, r)| *r == Region::EntryCard) {
                let row = self.list_offset + usize::from(mouse.row.saturating_sub(rect.y));
                let len = self.visible_entries().len();
                self.cursor = row.min(len.saturating_sub(1));
            }
        }
    }

    pub fn finish_download(&mut self, result: BrowseResult<Vec<DownloadTarget>>) {
        self.browser.finish_folder_download(&result);
        if let Ok(targets) = result {
            let urls = targets
                .iter()
                .map(|target| format!("{} -> {}", target.name, target.url))
                .join(", ");
            self.message = Some(format!("Download {} files: {}", targets.len(), urls));
        }
    }
}

fn spawn_input_reader() -> mpsc::UnboundedReceiver<Event> {
    let (sender, receiver) = mpsc::unbounded_channel();
    tokio::task::spawn_blocking(move || {
        while !sender.is_closed() {
            match event::poll(INPUT_POLL_INTERVAL) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if sender.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to read terminal event: {}", e);
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("Failed to poll terminal: {}", e);
                    break;
                }
            }
        }
    });
    receiver
}

/// Connect to the server and run the terminal browser until the user quits.
pub async fn run(config: Config) -> Result<()> {
    let session = Session::connect(config.server_addr.as_str())
        .await
        .with_context(|| format!("failed to connect to {}", config.server_addr))?;
    tracing::info!("Connected to {}", config.server_addr);
    let navigation = session.subscribe();
    let mut browser = Browser::new(Correlator::new(session), config.browser_options());
    browser
        .navigate(&config.root)
        .context("failed to request the initial listing")?;

    let mut terminal = ratatui::init();
    execute!(std::io::stdout(), EnableMouseCapture)?;
    let result = event_loop(&mut terminal, App::new(browser, config.server_addr), navigation).await;
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();
    result
}

async fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    mut app: App,
    mut navigation: Subscription,
) -> Result<()> {
    let mut input = spawn_input_reader();
    let mut downloads = FuturesUnordered::new();

    while !app.should_quit {
        let mut screen = ScreenMap::default();
        terminal.draw(|frame| screen = render(frame, &app))?;
        app.regions = screen.regions;
        app.list_offset = screen.list_offset;

        tokio::select! {
            event = input.recv() => match event {
                Some(Event::Key(key)) => {
                    if let Action::Spawn(job) = app.handle_key(key) {
                        tracing::info!("Starting folder download for {}", job.path());
                        downloads.push(job.run());
                    }
                }
                Some(Event::Mouse(mouse)) => app.handle_mouse(mouse),
                Some(_) => {}
                None => break,
            },
            event = navigation.recv() => match event {
                Ok(event) => {
                    app.browser.handle_event(event);
                }
                Err(BrowseError::SessionClosed) => {
                    app.message = Some("Disconnected from server".to_string());
                    app.should_quit = true;
                }
                Err(e) => tracing::error!("Navigation listener failed: {}", e),
            },
            Some(result) = downloads.next(), if !downloads.is_empty() => app.finish_download(result),
        }
    }
    Ok(())
}

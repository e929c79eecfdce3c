use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::cli::app::App;
use crate::listing::{Placeholder, SortCriterion};
use crate::media;
use crate::protocol::EntryDetails;
use crate::selection::Region;

/// What the last draw put where, for mapping mouse clicks back to state.
#[derive(Debug, Default)]
pub struct ScreenMap {
    /// Topmost region first.
    pub regions: Vec<(Rect, Region)>,
    pub list_offset: usize,
}

/// Draw the browser and report which screen areas are interactive.
pub fn render(frame: &mut Frame, app: &App) -> ScreenMap {
    let mut regions = Vec::new();
    let browser = &app.browser;

    let main_block = Block::default()
        .title(format!(" Remote File Browser - {} ", app.server_addr))
        .borders(Borders::ALL);
    frame.render_widget(main_block, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Toolbar
            Constraint::Min(5),    // Entries
            Constraint::Length(3), // Status
        ])
        .split(frame.area());

    render_title(frame, chunks[0]);
    render_toolbar(frame, app, chunks[1]);
    regions.push((chunks[1], Region::Toolbar));

    let list_area = if browser.is_sidebar_open() {
        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(28), Constraint::Min(20)])
            .split(chunks[2]);
        render_sidebar(frame, app, horizontal[0]);
        regions.push((horizontal[0], Region::Sidebar));
        horizontal[1]
    } else {
        chunks[2]
    };
    let list_offset = render_entries(frame, app, list_area, &mut regions);
    render_status(frame, app, chunks[3]);
    regions.push((chunks[3], Region::PathWidget));

    if browser.is_folder_info_open() {
        if let Some(details) = browser.folder_details() {
            let area = centered_rect(50, 12, frame.area());
            render_folder_info(frame, details, area);
            regions.push((area, Region::Modal));
        }
    }

    if let Some(notice) = browser.notice() {
        let area = centered_rect(60, 5, frame.area());
        frame.render_widget(Clear, area);
        let alert = Paragraph::new(notice.to_string())
            .wrap(Wrap { trim: true })
            .block(Block::default().title(" ⚠️ Notice (Enter to dismiss) ").borders(Borders::ALL))
            .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD));
        frame.render_widget(alert, area);
        regions.push((area, Region::Modal));
    }

    // Later entries win when regions overlap.
    regions.reverse();
    ScreenMap {
        regions,
        list_offset,
    }
}

fn render_title(frame: &mut Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let title = Paragraph::new(Line::from(vec![
        key("↑↓"),
        Span::raw(" Move | "),
        key("Enter"),
        Span::raw(" Open | "),
        key("Space"),
        Span::raw(" Select | "),
        key("←/→"),
        Span::raw(" Back/Fwd | "),
        key("s"),
        Span::raw(" Sort | "),
        key("/"),
        Span::raw(" Filter | "),
        key("d"),
        Span::raw(" Download | "),
        key("i"),
        Span::raw(" Info | "),
        key("m"),
        Span::raw(" Menu | "),
        key("q"),
        Span::raw(" Quit"),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, area);
}

fn render_toolbar(frame: &mut Frame, app: &App, area: Rect) {
    let browser = &app.browser;
    let enabled = |on: bool| {
        if on {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };
    let sort = browser
        .view()
        .sort_criterion()
        .map_or("unsorted", SortCriterion::as_str);

    let mut spans = vec![
        Span::styled("◀ ", enabled(browser.back_enabled())),
        Span::styled("▶ ", enabled(browser.forward_enabled())),
        Span::styled(
            browser.current_path().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  | sort: {sort}")),
    ];
    if app.searching || !app.query.is_empty() {
        spans.push(Span::raw("  | filter: "));
        spans.push(Span::styled(
            format!("{}{}", app.query, if app.searching { "▏" } else { "" }),
            Style::default().fg(Color::Yellow),
        ));
    }

    let toolbar = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(toolbar, area);
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let current = app.browser.view().sort_criterion();
    let items: Vec<ListItem> = SortCriterion::ALL
        .iter()
        .map(|criterion| {
            let marker = if Some(*criterion) == current { "● " } else { "  " };
            ListItem::new(format!("{marker}{criterion}"))
        })
        .collect();
    let sidebar = List::new(items).block(Block::default().title(" Sort ").borders(Borders::ALL));
    frame.render_widget(sidebar, area);
}

/// Returns the scroll offset the list ended up at.
fn render_entries(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    regions: &mut Vec<(Rect, Region)>,
) -> usize {
    let browser = &app.browser;
    let block = Block::default()
        .title(format!(" {} ", browser.current_path()))
        .borders(Borders::ALL);

    if let Some(placeholder) = browser.placeholder() {
        let (text, style) = match placeholder {
            Placeholder::Loading => (
                browser.status().unwrap_or("Loading...").to_string(),
                Style::default().fg(Color::Yellow),
            ),
            Placeholder::Empty => ("No files or folders".to_string(), Style::default()),
            Placeholder::Error(failure) => (failure.to_string(), Style::default().fg(Color::Red)),
        };
        frame.render_widget(Paragraph::new(text).style(style).block(block), area);
        return 0;
    }

    let entries = app.visible_entries();
    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let selected = browser.selection().is_selected(&entry.path);
            let marker = if selected { "🔵 " } else { "  " };
            let name_style = if selected {
                Style::default().fg(Color::Green)
            } else if entry.is_dir() {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            let mut spans = vec![
                Span::raw(marker),
                Span::raw(format!("{} ", media::icon(entry))),
                Span::styled(entry.name().to_string(), name_style),
                Span::styled(
                    format!("  {}", media::caption(entry)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("  {}", media::format_date(entry.details.modified.as_deref())),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if browser.actions_visible(entry) {
                let actions = if media::is_streamable(entry) {
                    "  [d]ownload [p]lay"
                } else {
                    "  [d]ownload"
                };
                spans.push(Span::styled(actions, Style::default().fg(Color::Yellow)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = ListState::default().with_offset(app.list_offset);
    if !entries.is_empty() {
        state.select(Some(app.cursor.min(entries.len() - 1)));
    }
    frame.render_stateful_widget(list, area, &mut state);

    // Only rows that hold an entry count as entry cards.
    let shown = entries.len().saturating_sub(state.offset());
    let rows = u16::try_from(shown)
        .unwrap_or(u16::MAX)
        .min(area.height.saturating_sub(2));
    if rows > 0 {
        regions.push((
            Rect::new(area.x + 1, area.y + 1, area.width.saturating_sub(2), rows),
            Region::EntryCard,
        ));
    }
    state.offset()
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let browser = &app.browser;
    let (text, style) = if let Some(status) = browser.status() {
        (status.to_string(), Style::default().fg(Color::Yellow))
    } else if let Some(message) = &app.message {
        (message.clone(), Style::default().fg(Color::Green))
    } else {
        let count = browser.view().entries().count();
        (
            format!("{} entries | {} selected", count, browser.selection().len()),
            Style::default().fg(Color::Green),
        )
    };
    let status = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, area);
}

fn render_folder_info(frame: &mut Frame, details: &EntryDetails, area: Rect) {
    frame.render_widget(Clear, area);
    let field = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label}: "), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(value),
        ])
    };
    let lines = vec![
        field("Name", details.name.clone()),
        field("Items", details.count.map(|c| c.to_string()).unwrap_or_default()),
        field("Created", media::format_date(details.created.as_deref())),
        field("Modified", media::format_date(details.modified.as_deref())),
        field("Accessed", media::format_date(details.accessed.as_deref())),
        Line::raw(""),
        Line::styled(
            "[d] Download files   [Esc] Close",
            Style::default().fg(Color::Yellow),
        ),
    ];
    let modal = Paragraph::new(lines)
        .block(Block::default().title(" Folder Info ").borders(Borders::ALL));
    frame.render_widget(modal, area);
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = u32::from(area.width) * u32::from(percent_x.min(100)) / 100;
    let width = u16::try_from(width).unwrap_or(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_on_wide_terminal() {
        let area = Rect::new(0, 0, 2000, 50);
        let popup = centered_rect(60, 5, area);
        assert_eq!(popup, Rect::new(400, 22, 1200, 5));
    }

    #[test]
    fn test_centered_rect_clamps_height() {
        let area = Rect::new(10, 10, 40, 3);
        let popup = centered_rect(50, 12, area);
        assert_eq!(popup, Rect::new(20, 10, 20, 3));
    }
}

//! Terminal User Interface rendering module
//!
//! This module handles all UI rendering for washpro using the ratatui
//! framework: the metric cards, the paginated record table, the row menu
//! and the modal dialogs.
//!
//! # Architecture
//!
//! - `header` - Header bar with resource, API and fetch status
//! - `dialog` - View, form and delete dialogs
//! - `help` - Help overlay showing keybindings
//! - `notifications` - Notification history panel
//!
//! Every frame is derived from the session: the table shows only the
//! current page, while the metric cards always cover the full collection.

mod dialog;
mod header;
mod help;
mod notifications;

use crate::app::{App, Mode};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame,
};
use washpro::core::{FetchStatus, MenuAction, Severity};
use washpro::resource::{get_color_for_value, ColumnDef, Record};

pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Header (multi-line)
            Constraint::Length(3), // Metric cards
            Constraint::Min(1),    // Table
            Constraint::Length(1), // Footer/crumb
        ])
        .split(f.area());

    header::render(f, app, chunks[0]);
    render_metrics(f, app, chunks[1]);
    render_main_content(f, app, chunks[2]);
    render_crumb(f, app, chunks[3]);

    if let Some(anchor) = app.session.selection().menu_anchor() {
        render_menu(f, anchor.row, anchor.col);
    }

    // Dialogs, then overlays on top
    dialog::render(f, app);
    match app.mode {
        Mode::Help => {
            help::render(f, app);
        },
        Mode::Notifications => {
            notifications::render(f, app);
        },
        _ => {},
    }
}

fn render_metrics(f: &mut Frame, app: &App, area: Rect) {
    let metrics = app.session.metrics();
    if metrics.is_empty() {
        return;
    }

    let constraints: Vec<Constraint> = metrics
        .iter()
        .map(|_| Constraint::Ratio(1, metrics.len() as u32))
        .collect();
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    let loading = app.session.fetch_status().is_loading() && app.session.collection().is_empty();

    for (metric, card) in metrics.iter().zip(cards.iter()) {
        let value = if loading {
            "…".to_string()
        } else {
            metric.value.display()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                format!(" {} ", metric.label),
                Style::default().fg(Color::DarkGray),
            ));
        let paragraph = Paragraph::new(Line::from(Span::styled(
            value,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(block);
        f.render_widget(paragraph, *card);
    }
}

fn render_main_content(f: &mut Frame, app: &App, area: Rect) {
    // If filter is active or has text, show filter input above table
    let show_filter = app.mode == Mode::Filter || !app.filter_input.is_empty();

    if show_filter {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(area);

        render_filter_bar(f, app, chunks[0]);
        render_table(f, app, chunks[1]);
    } else {
        render_table(f, app, area);
    }
}

fn render_filter_bar(f: &mut Frame, app: &App, area: Rect) {
    let active = app.mode == Mode::Filter;
    let cursor_style = if active {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let filter_display = if active {
        format!("/{}_", app.filter_input)
    } else {
        format!("/{}", app.filter_input)
    };

    let paragraph = Paragraph::new(Line::from(vec![Span::styled(filter_display, cursor_style)]));
    f.render_widget(paragraph, area);
}

fn render_table(f: &mut Frame, app: &App, area: Rect) {
    let def = app.session.definition();
    let page = app.page();

    let category = app
        .session
        .filter()
        .category
        .as_ref()
        .map(|c| format!(" [{}]", c.value))
        .unwrap_or_default();
    let title = if app.session.filter().is_empty() {
        format!(" {}[{}] ", def.display_name, app.session.collection().len())
    } else {
        format!(
            " {}[{}/{}]{} ",
            def.display_name,
            page.total_matching,
            app.session.collection().len(),
            category
        )
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Center);

    let inner_area = block.inner(area);
    f.render_widget(block, area);

    if page.is_empty() {
        let (message, style) = match app.session.fetch_status() {
            FetchStatus::Loading if app.session.collection().is_empty() => (
                format!("Loading {}...", def.display_name.to_lowercase()),
                Style::default().fg(Color::Yellow),
            ),
            FetchStatus::Failed(err) if app.session.collection().is_empty() => {
                (format!("Error: {}", err), Style::default().fg(Color::Red))
            },
            _ => (
                "No records found".to_string(),
                Style::default().fg(Color::DarkGray),
            ),
        };
        let paragraph = Paragraph::new(message)
            .style(style)
            .alignment(Alignment::Center);
        f.render_widget(paragraph, inner_area);
        return;
    }

    let mut header_cells = vec![Cell::from(" S/N").style(header_style())];
    header_cells.extend(
        def.columns
            .iter()
            .map(|col| Cell::from(format!(" {}", col.header)).style(header_style())),
    );
    let header = Row::new(header_cells).height(1);

    let active = app.session.selection().active();
    let rows: Vec<Row> = page
        .rows
        .iter()
        .map(|row| {
            let marked = active == Some(row.record.id());
            let mut cells = vec![Cell::from(format!(" {}", row.number)).style(
                if marked {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::DarkGray)
                },
            )];
            cells.extend(def.columns.iter().map(|col| {
                let value = row.record.field(&col.json_path);
                Cell::from(format!(" {}", truncate_string(&value, 38)))
                    .style(get_cell_style(&value, col))
            }));
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![Constraint::Length(5)];
    widths.extend(def.columns.iter().map(|col| Constraint::Percentage(col.width)));

    let table = Table::new(rows, widths).header(header).row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = TableState::default();
    state.select(Some(app.cursor));
    f.render_stateful_widget(table, inner_area, &mut state);
}

fn header_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

/// Get cell style based on value and column definition
fn get_cell_style(value: &str, col: &ColumnDef) -> Style {
    if let Some(ref color_map_name) = col.color_map {
        if let Some([r, g, b]) = get_color_for_value(color_map_name, value) {
            return Style::default().fg(Color::Rgb(r, g, b));
        }
    }
    Style::default()
}

/// Truncate string for display (Unicode-safe)
fn truncate_string(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count > max_len {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

/// Row action menu at the anchor, kept inside the frame
fn render_menu(f: &mut Frame, row: u16, col: u16) {
    let frame = f.area();
    let width = 16u16.min(frame.width);
    let height = (MenuAction::ALL.len() as u16 + 2).min(frame.height);
    let area = Rect {
        x: col.min(frame.width.saturating_sub(width)),
        y: (row + 1).min(frame.height.saturating_sub(height)),
        width,
        height,
    };

    f.render_widget(Clear, area);
    let lines: Vec<Line> = MenuAction::ALL
        .iter()
        .map(|action| {
            let style = if *action == MenuAction::Delete {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(vec![
                Span::styled(
                    format!(" {} ", action.shortcut()),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(action.label(), style),
            ])
        })
        .collect();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_crumb(f: &mut Frame, app: &App, area: Rect) {
    let def = app.session.definition();
    let page = app.page();

    let page_info = match page.page {
        Some(p) => format!(" Page {} of {}", p, page.total_pages),
        None => String::new(),
    };

    let toast = app.notifications.current_toast();
    let (status_text, style) = if let Some(notif) = toast {
        let color = match notif.severity {
            Severity::Success => Color::Green,
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
            Severity::Info => Color::Cyan,
        };
        (notif.toast_message(), Style::default().fg(color))
    } else if app.session.is_submitting() {
        ("Saving...".to_string(), Style::default().fg(Color::Yellow))
    } else if app.session.fetch_status().is_loading() {
        ("Loading...".to_string(), Style::default().fg(Color::Yellow))
    } else if let Some(err) = app.session.fetch_status().error() {
        (
            format!("Error: {}", err),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else if app.mode == Mode::Filter {
        (
            "Type to filter | Enter: apply | Esc: clear".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (
            "[:prev ]:next | Enter: actions | a: add".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    };

    let errors = app.notifications.recent_error_count();
    let indicator = if errors > 0 {
        Span::styled(
            format!(" [{}✗]", errors),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else if app.notifications.has_notifications() {
        Span::styled(" [n]", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw("")
    };

    let crumb = Line::from(vec![
        Span::styled(
            format!("<{}>", def.display_name),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::styled(page_info, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(status_text, style),
        indicator,
    ]);

    f.render_widget(Paragraph::new(crumb), area);
}

/// Readable value for the view dialog
pub(crate) fn display_field(record: &Record, key: &str) -> String {
    match record.field_value(key) {
        Some(serde_json::Value::Object(obj)) => match obj.get("coordinates") {
            Some(serde_json::Value::Array(coords)) => coords
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            _ => record.field(key),
        },
        _ => record.field(key),
    }
}

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string_is_char_safe() {
        assert_eq!(truncate_string("Tudun Wada", 38), "Tudun Wada");
        assert_eq!(truncate_string("ÀÀÀÀÀÀ", 5), "ÀÀ...");
    }

    #[test]
    fn test_centered_rect_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(50, 50, area);
        assert_eq!(popup.width, 50);
        assert_eq!(popup.height, 20);
        assert_eq!(popup.x, 25);
    }
}

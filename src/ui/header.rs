//! Header Component
//!
//! Displays the resource, API endpoint and fetch status.

use crate::app::App;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use washpro::core::FetchStatus;
use washpro::resource::ResourceKind;
use washpro::VERSION;

pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" washpro v{} ", VERSION),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    // Row 1: resource tabs
    let mut tabs = vec![Span::styled(" Resource: ", Style::default().fg(Color::DarkGray))];
    for kind in ResourceKind::ALL {
        let style = if kind == app.kind() {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let name = washpro::resource::get_resource(kind)
            .map(|d| d.display_name.as_str())
            .unwrap_or(kind.key());
        tabs.push(Span::styled(format!(" {} ", name), style));
        tabs.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Line::from(tabs)), rows[0]);

    // Row 2: API and fetch status
    let (status, status_color) = match app.session.fetch_status() {
        FetchStatus::Idle => ("idle".to_string(), Color::DarkGray),
        FetchStatus::Loading => ("loading".to_string(), Color::Yellow),
        FetchStatus::Succeeded => ("ok".to_string(), Color::Green),
        FetchStatus::Failed(_) => ("failed".to_string(), Color::Red),
    };
    let updated = app
        .session
        .last_updated()
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "never".to_string());
    let api_line = Line::from(vec![
        Span::styled(" API: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            &app.api_label,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("Status: ", Style::default().fg(Color::DarkGray)),
        Span::styled(status, Style::default().fg(status_color)),
        Span::raw("  "),
        Span::styled("Updated: ", Style::default().fg(Color::DarkGray)),
        Span::styled(updated, Style::default().fg(Color::White)),
    ]);
    f.render_widget(Paragraph::new(api_line), rows[1]);

    // Row 3: filter summary
    let filter = app.session.filter();
    let category = app
        .session
        .definition()
        .category_field
        .as_deref()
        .map(|field| {
            let value = filter
                .category
                .as_ref()
                .map(|c| c.value.as_str())
                .unwrap_or("all");
            format!("{}: {}", field, value)
        })
        .unwrap_or_default();
    let filter_line = Line::from(vec![
        Span::styled(" Filter: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            if filter.text.is_empty() {
                "-".to_string()
            } else {
                format!("\"{}\"", filter.text)
            },
            Style::default().fg(Color::White),
        ),
        Span::raw("  "),
        Span::styled(category, Style::default().fg(Color::White)),
    ]);
    f.render_widget(Paragraph::new(filter_line), rows[2]);

    // Row 4: Help hint
    let help_line = Line::from(vec![
        Span::styled(
            " ?:help  /:filter  c:category  a:add  Tab:resource  R:refresh  q:quit",
            Style::default().fg(Color::DarkGray),
        ),
        if app.session.is_readonly() {
            Span::styled(
                "  [READ-ONLY]",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::raw("")
        },
    ]);
    f.render_widget(Paragraph::new(help_line), rows[3]);
}

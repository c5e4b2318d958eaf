//! Dialog Components
//!
//! View, form and delete dialogs for the open modal.

use super::{centered_rect, display_field};
use crate::app::App;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use washpro::core::ModalState;
use washpro::resource::{Draft, FieldInput, Record};

pub fn render(f: &mut Frame, app: &App) {
    match app.session.modal() {
        ModalState::Closed => {},
        ModalState::Viewing(record) => render_view_dialog(f, app, record),
        ModalState::Editing { draft, .. } => {
            let title = format!(" Edit {} ", app.session.definition().singular);
            render_form_dialog(f, app, draft, &title);
        },
        ModalState::Creating { draft } => {
            let title = format!(" Add {} ", app.session.definition().singular);
            render_form_dialog(f, app, draft, &title);
        },
        ModalState::Deleting { target_id } => {
            let label = app
                .session
                .record(target_id)
                .zip(app.session.definition().search_fields.first())
                .map(|(r, key)| r.field(key))
                .unwrap_or_else(|| target_id.to_string());
            render_delete_dialog(f, app, &label);
        },
    }
}

fn dialog_block(title: String, color: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(
            title,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
}

fn render_view_dialog(f: &mut Frame, app: &App, record: &Record) {
    let def = app.session.definition();
    let popup_area = centered_rect(60, 70, f.area());
    f.render_widget(Clear, popup_area);

    let block = dialog_block(format!(" {} Details ", def.singular), Color::Cyan);
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{:<24}", "ID"), Style::default().fg(Color::DarkGray)),
        Span::styled(record.id().to_string(), Style::default().fg(Color::White)),
    ])];
    lines.extend(def.fields.iter().map(|field| {
        Line::from(vec![
            Span::styled(
                format!("{:<24}", field.label),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                display_field(record, &field.key),
                Style::default().fg(Color::White),
            ),
        ])
    }));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "j/k: scroll | Esc: close",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines).scroll((app.view_scroll, 0));
    f.render_widget(paragraph, inner);
}

fn render_form_dialog(f: &mut Frame, app: &App, draft: &Draft, title: &str) {
    let def = app.session.definition();
    let popup_area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, popup_area);

    let block = dialog_block(title.to_string(), Color::Yellow);
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let mut lines = Vec::new();
    for (idx, field) in def.fields.iter().enumerate() {
        let focused = idx == app.form_field;
        let marker = if field.required { "*" } else { " " };
        let label_style = if focused {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let value = draft.get(&field.key);
        let shown = match &field.input {
            FieldInput::Choice { .. } if focused => format!("◀ {} ▶", value),
            FieldInput::Coordinates if value.is_empty() && !focused => "lng, lat".to_string(),
            _ if focused => format!("{}_", value),
            _ => value.to_string(),
        };

        lines.push(Line::from(vec![
            Span::styled(format!("{}{:<23}", marker, field.label), label_style),
            Span::styled(shown, Style::default().fg(Color::White)),
        ]));
        if let Some(err) = draft.error(&field.key) {
            lines.push(Line::from(Span::styled(
                format!("   {}", err),
                Style::default().fg(Color::Red),
            )));
        }
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), chunks[0]);

    let footer = if app.session.is_submitting() {
        Span::styled("Saving...", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(
            "Tab: next field | ←/→: change choice | Enter: save | Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )
    };
    f.render_widget(
        Paragraph::new(Line::from(footer)).alignment(Alignment::Center),
        chunks[1],
    );
}

fn render_delete_dialog(f: &mut Frame, app: &App, label: &str) {
    let def = app.session.definition();
    let popup_area = centered_rect(50, 25, f.area());
    f.render_widget(Clear, popup_area);

    let block = dialog_block(format!(" Delete {} ", def.singular), Color::Red);
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let content_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(inner);

    let message = Paragraph::new(Line::from(Span::styled(
        format!(
            "Delete {} \"{}\"? This cannot be undone.",
            def.singular.to_lowercase(),
            label
        ),
        Style::default().fg(Color::White),
    )))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(message, content_chunks[0]);

    let buttons = if app.session.is_submitting() {
        Line::from(Span::styled("Deleting...", Style::default().fg(Color::Yellow)))
    } else {
        Line::from(vec![
            Span::styled(
                " Yes (y) ",
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Red)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("    "),
            Span::styled(" No (n) ", Style::default().fg(Color::DarkGray)),
        ])
    };
    f.render_widget(
        Paragraph::new(buttons).alignment(Alignment::Center),
        content_chunks[2],
    );
}

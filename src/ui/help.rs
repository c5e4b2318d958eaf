//! Help Overlay
//!
//! Shows keyboard shortcuts and help information.

use super::centered_rect;
use crate::app::App;
use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Navigation",
        &[
            ("j/k, ↑/↓", "Move up/down"),
            ("gg / G", "Go to top/bottom"),
            ("[/], ←/→", "Previous/next page"),
            ("Tab/S-Tab", "Next/previous resource"),
            ("R", "Refresh"),
        ],
    ),
    (
        "Filtering",
        &[
            ("/", "Search ward, village, hamlet..."),
            ("c", "Cycle category filter"),
            ("Esc", "Clear search"),
        ],
    ),
    (
        "Records",
        &[
            ("Enter/m", "Open row menu"),
            ("v", "View details"),
            ("e", "Edit"),
            ("d", "Delete"),
            ("a", "Add new"),
        ],
    ),
    (
        "Forms",
        &[
            ("Tab, ↑/↓", "Move between fields"),
            ("←/→", "Change a choice"),
            ("Enter", "Save"),
            ("Esc", "Cancel"),
        ],
    ),
    (
        "General",
        &[
            ("n", "Notification history"),
            ("?/Esc", "Close help"),
            ("q", "Quit application"),
        ],
    ),
];

pub fn render(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(70, 80, f.area());
    f.render_widget(Clear, popup_area);

    let mut help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    for (title, keys) in SECTIONS {
        help_text.push(Line::from(Span::styled(
            *title,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (key, desc) in keys.iter() {
            help_text.push(Line::from(vec![
                Span::styled(format!("  {:<12}", key), Style::default().fg(Color::Yellow)),
                Span::raw(*desc),
            ]));
        }
        help_text.push(Line::from(""));
    }

    if app.session.is_readonly() {
        help_text.push(Line::from(Span::styled(
            "Read-only mode: add, edit and delete are disabled",
            Style::default().fg(Color::Yellow),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Help ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .alignment(Alignment::Left);

    f.render_widget(paragraph, popup_area);
}

//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, Screen};

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = if app.editor.is_some() {
        "Enter: save | Tab: next field | Esc: cancel"
    } else {
        match app.screen {
            Screen::Login => "Enter: sign in | F2: register | Esc: quit",
            Screen::Register => "Enter: create account | Esc: back",
            Screen::Board => {
                "n: new | e: edit | d: delete | s: status | /: search | f: filter | r: refresh | L: logout | q: quit"
            }
            Screen::Detail => "e: edit | d: delete | s: status | Esc: back",
        }
    };

    let (dot_color, status_text) = if app.connected {
        (theme::SUCCESS, "Live")
    } else {
        (theme::OFFLINE, "Offline")
    };

    let mut spans = vec![
        Span::styled("TaskLive", theme::bold()),
        Span::raw(" | "),
        Span::styled("\u{25cf}", theme::normal().fg(dot_color)),
        Span::raw(format!(" {status_text}")),
    ];
    if let Some(user) = &app.current_user {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(format!("@{}", user.username), theme::normal()));
    }
    if let Some(message) = &app.status_line {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            message.clone(),
            theme::normal().fg(theme::WARNING),
        ));
    }
    spans.push(Span::raw(" | "));
    spans.push(Span::styled(help_text, theme::dimmed()));

    let paragraph = Paragraph::new(Line::from(spans)).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}

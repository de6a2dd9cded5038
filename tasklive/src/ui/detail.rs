//! Single-task detail rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::theme;
use crate::app::App;

/// Render the detail view for the task behind `app.detail`.
///
/// A stale id (the task vanished between frames) renders a placeholder;
/// the net event that removed it sends the user back to the board.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(Span::styled(
            " Task ",
            theme::panel_title(theme::BOARD_TITLE),
        ))
        .borders(Borders::ALL)
        .border_style(theme::normal());

    let Some(task) = app
        .detail
        .as_ref()
        .and_then(|id| app.engine.read().get(id).cloned())
    else {
        frame.render_widget(
            Paragraph::new(Span::styled("task no longer exists", theme::dimmed())).block(block),
            area,
        );
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(task.title.clone(), theme::bold())),
        Line::from(vec![
            Span::styled("status: ", theme::dimmed()),
            Span::styled(
                task.status.to_string(),
                theme::normal().fg(theme::status_color(task.status)),
            ),
            Span::raw("   "),
            Span::styled("by: ", theme::dimmed()),
            Span::raw(task.created_by.username.clone()),
        ]),
        Line::from(vec![
            Span::styled("created: ", theme::dimmed()),
            Span::raw(
                task.created_at
                    .with_timezone(&chrono::Local)
                    .format(&app.timestamp_format)
                    .to_string(),
            ),
            Span::raw("   "),
            Span::styled("updated: ", theme::dimmed()),
            Span::raw(
                task.updated_at
                    .with_timezone(&chrono::Local)
                    .format(&app.timestamp_format)
                    .to_string(),
            ),
        ]),
    ];

    if !task.tags.is_empty() {
        let mut spans = vec![Span::styled("tags: ", theme::dimmed())];
        for tag in &task.tags {
            spans.push(Span::styled(format!("#{tag} "), theme::tag()));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::default());
    if task.description.is_empty() {
        lines.push(Line::from(Span::styled("(no description)", theme::dimmed())));
    } else {
        for text_line in task.description.lines() {
            lines.push(Line::from(Span::raw(text_line.to_string())));
        }
    }

    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

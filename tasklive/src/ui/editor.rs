//! Task editor modal rendering.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::{centered_rect, theme};
use crate::app::{EditorField, InputField, TaskEditor};

/// Render the editor modal over the current screen.
pub fn render(frame: &mut Frame, area: Rect, editor: &TaskEditor) {
    let title = if editor.target.is_some() {
        " Edit task "
    } else {
        " New task "
    };

    let modal = centered_rect(70, 70, area);
    frame.render_widget(Clear, modal);

    let block = Block::default()
        .title(Span::styled(title, theme::panel_title(theme::AUTH_TITLE)))
        .borders(Borders::ALL)
        .border_style(theme::highlighted());
    let inner = block.inner(modal);
    frame.render_widget(block, modal);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Length(3), // description
            Constraint::Length(3), // tags
            Constraint::Length(3), // status
            Constraint::Min(0),    // hint
        ])
        .split(inner);

    field(frame, rows[0], "Title", &editor.title, editor.focus == EditorField::Title);
    field(
        frame,
        rows[1],
        "Description",
        &editor.description,
        editor.focus == EditorField::Description,
    );
    render_tags(frame, rows[2], editor);
    render_status(frame, rows[3], editor);

    let hint = match editor.focus {
        EditorField::Tags => "space: add tag | Enter: add tag / save | Tab: next | Esc: cancel",
        EditorField::Status => "\u{2190}\u{2192}: change status | Enter: save | Esc: cancel",
        _ => "Enter: save | Tab: next field | Esc: cancel",
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(hint, theme::dimmed()))),
        rows[4],
    );
}

fn field(frame: &mut Frame, area: Rect, label: &str, input: &InputField, focused: bool) {
    let border = if focused {
        theme::highlighted()
    } else {
        theme::normal()
    };
    frame.render_widget(
        Paragraph::new(input.value.clone()).block(
            Block::default()
                .title(label.to_string())
                .borders(Borders::ALL)
                .border_style(border),
        ),
        area,
    );
}

fn render_tags(frame: &mut Frame, area: Rect, editor: &TaskEditor) {
    let focused = editor.focus == EditorField::Tags;
    let border = if focused {
        theme::highlighted()
    } else {
        theme::normal()
    };

    let mut spans: Vec<Span> = editor
        .tags
        .iter()
        .map(|tag| Span::styled(format!("#{tag} "), theme::tag()))
        .collect();
    spans.push(Span::raw(editor.tag_input.value.clone()));

    frame.render_widget(
        Paragraph::new(Line::from(spans)).block(
            Block::default()
                .title("Tags")
                .borders(Borders::ALL)
                .border_style(border),
        ),
        area,
    );
}

fn render_status(frame: &mut Frame, area: Rect, editor: &TaskEditor) {
    let focused = editor.focus == EditorField::Status;
    let border = if focused {
        theme::highlighted()
    } else {
        theme::normal()
    };

    frame.render_widget(
        Paragraph::new(Span::styled(
            editor.status.to_string(),
            theme::normal().fg(theme::status_color(editor.status)),
        ))
        .block(
            Block::default()
                .title("Status")
                .borders(Borders::ALL)
                .border_style(border),
        ),
        area,
    );
}

//! Login and registration form rendering.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::{centered_rect, theme};
use crate::app::{App, InputField, Screen};

/// Render the login or registration form, centered.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let registering = app.screen == Screen::Register;
    let title = if registering {
        " Create account "
    } else {
        " Sign in "
    };

    let form_area = centered_rect(50, 50, area);
    let block = Block::default()
        .title(Span::styled(title, theme::panel_title(theme::AUTH_TITLE)))
        .borders(Borders::ALL)
        .border_style(theme::highlighted());
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let row_count = if registering { 4 } else { 3 };
    let mut constraints = vec![Constraint::Length(3); row_count];
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    let mut row = 0;
    if registering {
        field(frame, rows[row], "Username", &app.auth.username, app.auth.focus == 0, false);
        row += 1;
    }
    let email_focus = usize::from(registering);
    field(
        frame,
        rows[row],
        "Email",
        &app.auth.email,
        app.auth.focus == email_focus,
        false,
    );
    row += 1;
    field(
        frame,
        rows[row],
        "Password",
        &app.auth.password,
        app.auth.focus == email_focus + 1,
        true,
    );
    row += 1;

    let hint = if registering {
        "Enter: create account | Esc: back to sign in | Tab: next field"
    } else {
        "Enter: sign in | F2: create account | Esc: quit | Tab: next field"
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(hint, theme::dimmed()))),
        rows[row],
    );
}

/// One labelled input row. Passwords render as dots.
fn field(frame: &mut Frame, area: Rect, label: &str, input: &InputField, focused: bool, mask: bool) {
    let border = if focused {
        theme::highlighted()
    } else {
        theme::normal()
    };
    let shown = if mask {
        "\u{2022}".repeat(input.value.chars().count())
    } else {
        input.value.clone()
    };
    let widget = Paragraph::new(shown).block(
        Block::default()
            .title(label.to_string())
            .borders(Borders::ALL)
            .border_style(border),
    );
    frame.render_widget(widget, area);
}

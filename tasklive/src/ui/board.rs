//! Task board rendering.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::theme;
use crate::app::App;

/// Render the board: filter line on top, task list below.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    render_filter_line(frame, chunks[0], app);
    render_task_list(frame, chunks[1], app);
}

fn render_filter_line(frame: &mut Frame, area: Rect, app: &App) {
    let status_label = app
        .status_filter
        .map_or_else(|| "all".to_string(), |s| s.to_string());

    let mut spans = vec![
        Span::styled("Filter: ", theme::dimmed()),
        Span::styled(status_label, theme::bold()),
        Span::raw("  "),
        Span::styled("Search: ", theme::dimmed()),
        Span::raw(app.search.value.clone()),
    ];
    if app.search_active {
        spans.push(Span::styled("\u{2588}", theme::highlighted()));
    }

    let border = if app.search_active {
        theme::highlighted()
    } else {
        theme::normal()
    };
    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).border_style(border)),
        area,
    );
}

fn render_task_list(frame: &mut Frame, area: Rect, app: &App) {
    let tasks = app.visible_tasks();

    let items: Vec<ListItem> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let row_style = if i == app.selected {
                theme::selected()
            } else {
                theme::normal()
            };

            let mut spans = vec![
                Span::styled(
                    format!("[{}]", task.status),
                    theme::normal().fg(theme::status_color(task.status)),
                ),
                Span::raw(" "),
                Span::styled(task.title.clone(), row_style),
                Span::raw("  "),
                Span::styled(format!("@{}", task.created_by.username), theme::dimmed()),
            ];
            for tag in &task.tags {
                spans.push(Span::raw(" "));
                spans.push(Span::styled(format!("#{tag}"), theme::tag()));
            }
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                task.updated_at
                    .with_timezone(&chrono::Local)
                    .format(&app.timestamp_format)
                    .to_string(),
                theme::dimmed(),
            ));

            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = format!(" Tasks ({}) ", tasks.len());
    let block = Block::default()
        .title(Span::styled(title, theme::panel_title(theme::BOARD_TITLE)))
        .borders(Borders::ALL)
        .border_style(theme::normal());

    if items.is_empty() {
        let empty = Paragraph::new(Span::styled("no tasks match", theme::dimmed())).block(block);
        frame.render_widget(empty, area);
    } else {
        frame.render_widget(List::new(items).block(block), area);
    }
}

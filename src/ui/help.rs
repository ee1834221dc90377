use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;

/// Render the key help overlay, centered over the reader.
pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let entries: &[(&str, &str)] = &[
        ("j/k ↑/↓", "scroll one line"),
        ("^d/^u PgDn/PgUp", "scroll one page"),
        ("Space", "page down"),
        ("g / G", "top / bottom"),
        ("/", "search, Enter confirms"),
        ("n / N", "next / previous match"),
        ("r", "reload file"),
        ("w", "toggle watch mode"),
        ("?", "toggle this help"),
        ("q", "quit"),
        ("", ""),
        ("click [n]", "jump to the reference entry"),
        ("click ↩ back", "return to where you were reading"),
        ("click heading", "snap to top, copy its anchor link"),
        ("click #link", "jump to section"),
    ];

    let key_col = entries.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    let lines: Vec<Line> = entries
        .iter()
        .map(|(key, desc)| {
            Line::from(vec![
                Span::raw("  "),
                Span::styled(format!("{:<key_col$}", key), theme.key_hint_style()),
                Span::raw("  "),
                Span::styled(*desc, Style::default().fg(theme.text)),
            ])
        })
        .collect();

    let popup_height = lines.len() as u16 + 2;
    let popup_width = 54u16.min(area.width.saturating_sub(4));
    let popup = centered_rect(popup_width, popup_height.min(area.height), area);

    f.render_widget(Clear, popup);

    let block = Block::default()
        .title(Span::styled(
            " KEYS (Esc=close) ",
            Style::default().fg(theme.cyan),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.surface));

    f.render_widget(Paragraph::new(lines).block(block), popup);
}

/// Calculate a centered rectangle within an area
fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(r.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(r.width.saturating_sub(width) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vertical[1])[1]
}

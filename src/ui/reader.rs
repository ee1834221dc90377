use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;

/// Render the visible slice of the laid-out document into the reading pane.
/// Lines are pre-wrapped by the layout, so overlong lines (code) simply clip.
pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let visible = app.viewport.visible();
    let mut lines: Vec<Line> = Vec::with_capacity(visible.len());

    for idx in visible {
        let Some(laid) = app.layout.line(idx) else {
            break;
        };
        let spans: Vec<Span> = laid
            .spans
            .iter()
            .map(|s| Span::styled(s.text.clone(), s.style))
            .collect();
        let mut line = Line::from(spans);
        if app.is_match_line(idx) {
            line = line.style(app.theme.search_hit_style());
        }
        lines.push(line);
    }

    let body = Paragraph::new(lines).style(app.theme.default_style());
    f.render_widget(body, area);
}

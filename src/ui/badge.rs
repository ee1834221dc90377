use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::app::App;

/// Draw the back badge over the reading pane, riding the first line of the
/// reference entry it is attached to. `App::badge_rect` is the single source
/// of truth for placement; mouse hit-testing uses the same rect.
pub fn render(f: &mut Frame, frame_area: Rect, app: &App) {
    let content = app.content_rect(frame_area);
    let Some(rect) = app.badge_rect(content) else {
        return;
    };
    let Some(badge) = app.nav.badge() else {
        return;
    };

    f.render_widget(Clear, rect);
    let control = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::raw(badge.label),
        Span::raw(" "),
    ]))
    .style(badge.style);
    f.render_widget(control, rect);
}

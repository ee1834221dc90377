mod badge;
mod help;
pub mod highlight;
mod reader;
mod status_bar;
pub mod styles;

use ratatui::layout::Rect;
use ratatui::widgets::Block;
use ratatui::Frame;

use crate::app::App;

/// Render the entire UI
pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    // full-frame backdrop so the centered column reads as a page
    f.render_widget(Block::default().style(app.theme.default_style()), area);

    let top = Rect::new(area.x, area.y, area.width, 1.min(area.height));
    status_bar::render_top_bar(f, top, app);

    let content = app.content_rect(area);
    reader::render(f, content, app);

    if area.height > 1 {
        let bottom = Rect::new(area.x, area.y + area.height - 1, area.width, 1);
        status_bar::render_bottom_bar(f, bottom, app);
    }

    // overlays, innermost last
    badge::render(f, area, app);
    if let Some(ref msg) = app.message {
        status_bar::render_notification(f, area, app, msg);
    }
    if app.show_help {
        help::render(f, area, app);
    }
}

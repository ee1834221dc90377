use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, InputMode};

/// Compute the display width of a list of spans
fn spans_width(spans: &[Span]) -> usize {
    spans.iter().map(|s| s.content.chars().count()).sum()
}

/// Render the top bar: document title · file name (left), reference count,
/// scroll percentage and watch indicator (right).
pub fn render_top_bar(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let file_name = app
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| app.path.display().to_string());

    let mut left: Vec<Span> = Vec::new();
    match &app.doc.title {
        Some(title) => {
            left.push(Span::styled(format!(" {}", title), theme.title_style()));
            left.push(Span::styled(" · ", Style::default().fg(theme.border)));
            left.push(Span::styled(file_name, theme.dim_style()));
        }
        None => {
            left.push(Span::styled(format!(" {}", file_name), theme.title_style()));
        }
    }

    let mut right: Vec<Span> = Vec::new();
    let refs = app.doc.reference_count();
    if refs > 0 {
        right.push(Span::styled(
            format!("{} ref{}", refs, if refs == 1 { "" } else { "s" }),
            Style::default().fg(theme.purple),
        ));
        right.push(Span::styled(" · ", Style::default().fg(theme.border)));
    }
    right.push(Span::styled(
        format!("{}%", app.viewport.percent()),
        Style::default().fg(theme.blue),
    ));
    if app.watching {
        right.push(Span::raw("  "));
        right.push(Span::styled(
            "\u{25cf} WATCHING",
            Style::default().fg(theme.green).add_modifier(Modifier::BOLD),
        ));
    }
    right.push(Span::raw(" "));

    let left_w = spans_width(&left);
    let right_w = spans_width(&right);
    let gap = (area.width as usize).saturating_sub(left_w + right_w);
    let mut spans = left;
    spans.push(Span::raw(" ".repeat(gap)));
    spans.extend(right);

    let bar = Paragraph::new(Line::from(spans)).style(theme.surface_style());
    f.render_widget(bar, area);
}

/// A key-label hint pair, e.g. ("j/k", " scroll ")
struct Hint {
    key: String,
    label: String,
}

impl Hint {
    fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
        }
    }
    fn width(&self) -> usize {
        self.key.chars().count() + self.label.chars().count()
    }
}

fn build_hints(app: &App) -> Vec<Hint> {
    let mut hints = vec![
        Hint::new("j/k", " scroll "),
        Hint::new("^d/^u", " page "),
        Hint::new("g/G", " top/end "),
        Hint::new("/", " search "),
    ];
    if !app.matches.is_empty() {
        hints.push(Hint::new("n/N", " matches "));
    }
    hints.push(Hint::new("r", " reload "));
    hints.push(Hint::new("w", " watch "));
    hints.push(Hint::new("?", " help "));
    hints.push(Hint::new("q", " quit "));

    // live indicators
    if let Some(status) = app.match_status() {
        hints.push(Hint {
            key: String::new(),
            label: format!(" {} \"{}\" ", status, app.search_query),
        });
    }
    hints
}

/// Pack hints into a single row, dropping trailing hints that do not fit.
fn pack_hint_line(app: &App, hints: &[Hint], width: usize) -> Line<'static> {
    let theme = &app.theme;
    let mut spans: Vec<Span<'static>> = vec![Span::raw(" ")];
    let mut used: usize = 1;

    for hint in hints {
        if used + hint.width() > width {
            break;
        }
        if !hint.key.is_empty() {
            spans.push(Span::styled(hint.key.clone(), theme.key_hint_style()));
        }
        spans.push(Span::styled(
            hint.label.clone(),
            if hint.key.is_empty() {
                Style::default().fg(theme.yellow)
            } else {
                theme.dim_style()
            },
        ));
        used += hint.width();
    }
    Line::from(spans)
}

/// Render the bottom bar: search input while typing, key hints otherwise.
pub fn render_bottom_bar(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    match app.input_mode {
        InputMode::Search => {
            let spans = vec![
                Span::styled(" /", theme.key_hint_style()),
                Span::styled(
                    format!(" {}", app.search_query),
                    Style::default().fg(theme.text),
                ),
                Span::styled("█", Style::default().fg(theme.blue)),
                Span::raw("  "),
                Span::styled("Enter", theme.key_hint_style()),
                Span::styled(" confirm  ", theme.dim_style()),
                Span::styled("Esc", theme.key_hint_style()),
                Span::styled(" cancel", theme.dim_style()),
            ];
            let bar = Paragraph::new(Line::from(spans)).style(theme.surface_style());
            f.render_widget(bar, area);
        }
        InputMode::Normal => {
            let hints = build_hints(app);
            let line = pack_hint_line(app, &hints, area.width as usize);
            let bar = Paragraph::new(line).style(theme.surface_style());
            f.render_widget(bar, area);
        }
    }
}

/// Render the transient notification overlay, top-right under the title bar.
pub fn render_notification(f: &mut Frame, area: Rect, app: &App, message: &str) {
    let theme = &app.theme;
    let notif_width = message.chars().count() as u16 + 4;
    let notif_x = area.x + area.width.saturating_sub(notif_width + 2);
    let notif_y = area.y + 1;

    let notif_area = Rect {
        x: notif_x,
        y: notif_y,
        width: notif_width.min(area.width),
        height: 1,
    };

    let (dot, text_style) = if app.message_is_error {
        (Style::default().fg(theme.red), theme.error_style())
    } else {
        (Style::default().fg(theme.green), theme.notice_style())
    };

    let notif = Paragraph::new(Line::from(vec![
        Span::styled(" ● ", dot),
        Span::styled(message.to_string(), text_style),
        Span::raw(" "),
    ]))
    .style(theme.surface_style());

    f.render_widget(notif, notif_area);
}

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use ratatui::layout::Rect;
use sha2::{Digest, Sha256};

use crate::config::CvConfig;
use crate::doc::{self, BlockKind, Document, Layout, LinkTarget, CITATION_PREFIX};
use crate::ui::highlight::Highlighter;
use crate::ui::styles::Theme;

use super::navigator::{BadgeState, Navigator};
use super::viewport::Viewport;

/// Whether we're navigating or typing a search query
#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Normal,
    Search,
}

/// Rows reserved above and below the reading pane (title bar, status bar).
const TOP_BAR_ROWS: u16 = 1;
const STATUS_ROWS: u16 = 1;

/// The reading pane: a centered column capped at the configured width.
fn reading_pane(frame: Rect, max_width: u16) -> Rect {
    let height = frame.height.saturating_sub(TOP_BAR_ROWS + STATUS_ROWS);
    let width = frame.width.min(max_width.max(20));
    let x = frame.x + frame.width.saturating_sub(width) / 2;
    Rect::new(x, frame.y + TOP_BAR_ROWS, width, height)
}

fn rect_contains(rect: Rect, col: u16, row: u16) -> bool {
    col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}

// ── Main App State ──

pub struct App {
    /// Path of the opened document
    pub path: PathBuf,
    pub doc: Document,
    pub layout: Layout,
    pub viewport: Viewport,
    pub nav: Navigator,
    pub theme: Theme,
    pub config: CvConfig,

    /// Whether we're navigating or typing a search query
    pub input_mode: InputMode,

    /// Should the app quit?
    pub should_quit: bool,

    /// Whether the key help overlay is open
    pub show_help: bool,

    pub search_query: String,
    /// Laid line indices matching the confirmed query, ascending
    pub matches: Vec<usize>,
    /// Index into `matches` of the focused hit
    pub current_match: Option<usize>,

    /// Whether watch mode is active
    pub watching: bool,

    /// Last notification message
    pub message: Option<String>,

    /// Whether the message reports a failure (styled differently)
    pub message_is_error: bool,

    /// Ticks since last notification (for auto-clearing)
    pub message_ticks: u8,

    /// Hash of the loaded content (reload staleness check)
    content_hash: String,

    /// Kept for the app lifetime: X11 selections die with their handle
    clipboard: Option<arboard::Clipboard>,
}

impl App {
    pub fn open(
        path: &Path,
        config: CvConfig,
        theme: Theme,
        hl: &Highlighter,
        frame: Rect,
    ) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let content_hash = content_hash(&content);
        let doc = doc::parse_document(&content);
        let pane = reading_pane(frame, config.display.max_width);
        let layout = Layout::build(&doc, pane.width, &theme, hl);
        let mut viewport = Viewport::new(pane.height as usize);
        viewport.set_content(layout.line_count());

        let clipboard = if config.features.clipboard {
            arboard::Clipboard::new().ok()
        } else {
            None
        };
        let nav = Navigator::new(theme.badge_style());

        Ok(App {
            path: path.to_path_buf(),
            doc,
            layout,
            viewport,
            nav,
            theme,
            config,
            input_mode: InputMode::Normal,
            should_quit: false,
            show_help: false,
            search_query: String::new(),
            matches: Vec::new(),
            current_match: None,
            // the run loop flips this on once the watcher is actually running
            watching: false,
            message: None,
            message_is_error: false,
            message_ticks: 0,
            content_hash,
            clipboard,
        })
    }

    // ── Geometry ──

    pub fn content_rect(&self, frame: Rect) -> Rect {
        reading_pane(frame, self.config.display.max_width)
    }

    /// Where the badge sits this frame, or None when it should not be drawn.
    /// The badge rides the first line of its reference entry, right-aligned.
    pub fn badge_rect(&self, content: Rect) -> Option<Rect> {
        if self.nav.state() != BadgeState::Visible {
            return None;
        }
        let badge = self.nav.badge()?;
        let block = badge.attached?;
        let row = self.layout.block_start(block);
        let visible = self.viewport.visible();
        if !visible.contains(&row) {
            return None;
        }
        let y = content.y + (row - visible.start) as u16;
        let width = (badge.label.chars().count() as u16 + 2).min(content.width);
        let x = content.x + content.width - width;
        Some(Rect::new(x, y, width, 1))
    }

    // ── Document lifecycle ──

    /// Re-read the file; no-op when content is unchanged. On a real change
    /// the layout is rebuilt and citation tracking starts over, since block
    /// indices may no longer line up.
    pub fn reload(&mut self, hl: &Highlighter) -> Result<bool> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read {}", self.path.display()))?;
        let hash = content_hash(&content);
        if hash == self.content_hash {
            return Ok(false);
        }
        self.content_hash = hash;
        self.doc = doc::parse_document(&content);
        self.layout = Layout::build(&self.doc, self.layout.width, &self.theme, hl);
        self.viewport.set_content(self.layout.line_count());
        self.nav.reset();
        self.refresh_matches();
        Ok(true)
    }

    pub fn resized(&mut self, frame: Rect, hl: &Highlighter) {
        let pane = self.content_rect(frame);
        self.viewport.set_height(pane.height as usize);
        if pane.width != self.layout.width {
            self.layout = Layout::build(&self.doc, pane.width, &self.theme, hl);
            self.viewport.set_content(self.layout.line_count());
            self.refresh_matches();
        }
    }

    // ── Scrolling ──

    /// Every viewport move funnels through here so the navigator sees it.
    fn notify_scroll(&mut self, now: Instant) {
        let rows = self.nav.target().map(|b| self.layout.block_range(b));
        self.nav.scrolled(rows, self.viewport.visible(), now);
    }

    fn after_scroll(&mut self, before: usize, now: Instant) {
        if self.viewport.offset() != before {
            self.notify_scroll(now);
        }
    }

    pub fn scroll_lines(&mut self, delta: i64, now: Instant) {
        let before = self.viewport.offset();
        self.viewport.scroll_by(delta);
        self.after_scroll(before, now);
    }

    pub fn page(&mut self, dir: i64, now: Instant) {
        let step = (self.viewport.height() as i64 - 2).max(1);
        self.scroll_lines(dir * step, now);
    }

    pub fn jump_top(&mut self, now: Instant) {
        let before = self.viewport.offset();
        self.viewport.jump_to(0);
        self.after_scroll(before, now);
    }

    pub fn jump_bottom(&mut self, now: Instant) {
        let before = self.viewport.offset();
        let max = self.viewport.max_offset();
        self.viewport.jump_to(max);
        self.after_scroll(before, now);
    }

    /// Advance the return animation. Returns true when the view moved.
    pub fn tick_scroll(&mut self, now: Instant) -> bool {
        if self.viewport.tick() {
            self.notify_scroll(now);
            true
        } else {
            false
        }
    }

    // ── Mouse ──

    pub fn mouse_click(&mut self, col: u16, row: u16, frame: Rect, now: Instant) {
        let content = self.content_rect(frame);

        // the badge floats above the text and wins ties
        if let Some(badge) = self.badge_rect(content) {
            if rect_contains(badge, col, row) {
                self.badge_clicked(now);
                return;
            }
        }

        if !rect_contains(content, col, row) {
            return;
        }
        let line = self.viewport.offset() + (row - content.y) as usize;
        if line >= self.layout.line_count() {
            return;
        }
        let x = col - content.x;
        match self.layout.link_at(x, line).cloned() {
            Some(LinkTarget::Internal(anchor)) if anchor.starts_with(CITATION_PREFIX) => {
                self.follow_citation(&anchor, now);
            }
            Some(LinkTarget::Internal(anchor)) => {
                if let Some(block) = self.doc.block_for_anchor(&anchor) {
                    let before = self.viewport.offset();
                    self.viewport.jump_to(self.layout.block_start(block));
                    self.after_scroll(before, now);
                }
            }
            Some(LinkTarget::External(url)) => {
                self.open_external(&url);
            }
            None => self.heading_clicked(line, now),
        }
    }

    /// A citation link was activated. Resolution comes first: a dangling
    /// citation changes nothing, not even the recorded return offset. On
    /// success the offset is recorded (last click wins), the view jumps to
    /// the entry, and the badge is scheduled.
    pub fn follow_citation(&mut self, anchor: &str, now: Instant) {
        let Some(block) = self.doc.block_for_anchor(anchor) else {
            return;
        };
        let before = self.viewport.offset();
        self.nav.citation_clicked(block, before, now);
        self.viewport.jump_to(self.layout.block_start(block));
        self.after_scroll(before, now);
    }

    /// The badge was activated: ride back to the recorded offset.
    pub fn badge_clicked(&mut self, _now: Instant) {
        self.nav.badge_clicked();
        self.viewport.animate_to(self.nav.last_scroll());
    }

    /// Clicking a heading jumps it to the top and copies a shareable
    /// `path#anchor` link when a clipboard is around.
    fn heading_clicked(&mut self, line: usize, now: Instant) {
        let Some(block) = self.layout.block_of_line(line) else {
            return;
        };
        let heading = &self.doc.blocks[block];
        if !matches!(heading.kind, BlockKind::Heading { .. }) {
            return;
        }
        let Some(anchor) = heading.anchor.clone() else {
            return;
        };

        let before = self.viewport.offset();
        self.viewport.jump_to(self.layout.block_start(block));
        self.after_scroll(before, now);

        if let Some(clipboard) = self.clipboard.as_mut() {
            let link = format!("{}#{}", self.path.display(), anchor);
            if clipboard.set_text(link).is_ok() {
                self.notify(&format!("Copied link to #{}", anchor));
            }
        }
    }

    fn open_external(&mut self, url: &str) {
        match system_open(url) {
            Ok(()) => self.notify(&format!("Opened {}", url)),
            Err(_) => self.notify(&format!("Link: {}", url)),
        }
    }

    // ── Search ──

    pub fn start_search(&mut self) {
        self.input_mode = InputMode::Search;
        self.search_query.clear();
        self.refresh_matches();
    }

    pub fn push_search_char(&mut self, c: char) {
        self.search_query.push(c);
        self.refresh_matches();
    }

    pub fn pop_search_char(&mut self) {
        self.search_query.pop();
        self.refresh_matches();
    }

    pub fn cancel_search(&mut self) {
        self.input_mode = InputMode::Normal;
        self.search_query.clear();
        self.matches.clear();
        self.current_match = None;
    }

    pub fn confirm_search(&mut self, now: Instant) {
        self.input_mode = InputMode::Normal;
        if self.matches.is_empty() {
            if !self.search_query.is_empty() {
                self.notify("No matches");
            }
            return;
        }
        // first hit at or below the current position, wrapping to the top
        let offset = self.viewport.offset();
        let idx = self
            .matches
            .iter()
            .position(|&line| line >= offset)
            .unwrap_or(0);
        self.focus_match(idx, now);
    }

    pub fn next_match(&mut self, now: Instant) {
        if self.matches.is_empty() {
            return;
        }
        let idx = match self.current_match {
            Some(i) => (i + 1) % self.matches.len(),
            None => 0,
        };
        self.focus_match(idx, now);
    }

    pub fn prev_match(&mut self, now: Instant) {
        if self.matches.is_empty() {
            return;
        }
        let idx = match self.current_match {
            Some(i) => (i + self.matches.len() - 1) % self.matches.len(),
            None => 0,
        };
        self.focus_match(idx, now);
    }

    fn focus_match(&mut self, idx: usize, now: Instant) {
        self.current_match = Some(idx);
        let line = self.matches[idx];
        let before = self.viewport.offset();
        self.viewport
            .jump_to(line.saturating_sub(self.viewport.height() / 3));
        self.after_scroll(before, now);
    }

    fn refresh_matches(&mut self) {
        self.matches.clear();
        self.current_match = None;
        if self.search_query.is_empty() {
            return;
        }
        let q = self.search_query.to_lowercase();
        for (i, line) in self.layout.lines().iter().enumerate() {
            if line.plain_text().to_lowercase().contains(&q) {
                self.matches.push(i);
            }
        }
    }

    pub fn is_match_line(&self, line: usize) -> bool {
        self.matches.binary_search(&line).is_ok()
    }

    /// "3/17" for the status bar while a search is live.
    pub fn match_status(&self) -> Option<String> {
        if self.matches.is_empty() {
            return None;
        }
        let pos = self.current_match.map(|i| i + 1).unwrap_or(0);
        Some(format!("{}/{}", pos, self.matches.len()))
    }

    // ── Notifications ──

    pub fn notify(&mut self, msg: &str) {
        self.message = Some(msg.to_string());
        self.message_is_error = false;
        self.message_ticks = 0;
    }

    pub fn notify_error(&mut self, msg: &str) {
        self.message = Some(msg.to_string());
        self.message_is_error = true;
        self.message_ticks = 0;
    }

    pub fn tick(&mut self) {
        if self.message.is_some() {
            self.message_ticks += 1;
            if self.message_ticks > 20 {
                self.message = None;
                self.message_is_error = false;
                self.message_ticks = 0;
            }
        }
    }
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn system_open(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    let status = std::process::Command::new("open").arg(url).status()?;

    #[cfg(all(unix, not(target_os = "macos")))]
    let status = std::process::Command::new("xdg-open").arg(url).status()?;

    #[cfg(target_os = "windows")]
    let status = std::process::Command::new("cmd")
        .args(["/C", "start", ""])
        .arg(url)
        .status()?;

    if !status.success() {
        anyhow::bail!("open command failed with status {status}");
    }
    Ok(())
}

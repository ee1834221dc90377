use std::ops::Range;
use std::time::{Duration, Instant};

use ratatui::style::Style;

// ── Timing ──

/// Wait after a citation jump before mounting the badge, long enough for
/// the jump to land and the reader to register the new position.
pub const ATTACH_DELAY: Duration = Duration::from_millis(300);
/// Gap between mounting the badge and making it visible, so the reveal
/// reads as a transition instead of a pop-in.
pub const REVEAL_DELAY: Duration = Duration::from_millis(100);
/// How long the reference entry must stay off screen before the badge hides.
pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);

pub const BADGE_LABEL: &str = "↩ back";

// ── State ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeState {
    /// No badge has ever been shown this session.
    Uncreated,
    Hidden,
    Visible,
}

/// The back badge. Created lazily on the first citation jump and reused for
/// the rest of the session; relocation re-anchors it, never recreates it.
#[derive(Debug, Clone)]
pub struct Badge {
    pub label: &'static str,
    pub style: Style,
    /// Block index of the reference entry the badge sits on.
    pub attached: Option<usize>,
    pub visible: bool,
}

impl Badge {
    fn new(style: Style) -> Self {
        Badge {
            label: BADGE_LABEL,
            style,
            attached: None,
            visible: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TimerKind {
    Attach,
    Reveal,
}

#[derive(Debug)]
struct Timer {
    due: Instant,
    token: u64,
    kind: TimerKind,
}

/// Citation-return state machine. Tracks where the reader jumped from, which
/// reference entry they jumped to, and walks the badge through its
/// uncreated / hidden / visible lifecycle on explicit timestamps.
///
/// Timers are never cancelled: each citation click bumps a token, and a
/// timer whose token is stale no-ops at fire time. The latest click always
/// wins, regardless of how callbacks interleave.
pub struct Navigator {
    last_scroll: usize,
    target: Option<usize>,
    badge: Option<Badge>,
    badge_style: Style,
    token: u64,
    timers: Vec<Timer>,
    pending_hide: Option<Instant>,
}

impl Navigator {
    pub fn new(badge_style: Style) -> Self {
        Navigator {
            last_scroll: 0,
            target: None,
            badge: None,
            badge_style,
            token: 0,
            timers: Vec::new(),
            pending_hide: None,
        }
    }

    pub fn state(&self) -> BadgeState {
        match &self.badge {
            None => BadgeState::Uncreated,
            Some(b) if b.visible => BadgeState::Visible,
            Some(_) => BadgeState::Hidden,
        }
    }

    pub fn badge(&self) -> Option<&Badge> {
        self.badge.as_ref()
    }

    /// Block index of the entry currently tracked for scroll visibility.
    pub fn target(&self) -> Option<usize> {
        self.target
    }

    /// Offset recorded at the most recent citation click. 0 both before any
    /// click and when the click happened at the top; returning to 0 is
    /// correct either way.
    pub fn last_scroll(&self) -> usize {
        self.last_scroll
    }

    // ── Operations ──

    /// A citation link resolved to `block`; the jump is about to happen.
    /// Records the pre-jump offset (last click wins) and schedules the
    /// badge to mount on the entry.
    pub fn citation_clicked(&mut self, block: usize, offset: usize, now: Instant) {
        self.last_scroll = offset;
        self.target = Some(block);
        self.token += 1;
        self.timers.push(Timer {
            due: now + ATTACH_DELAY,
            token: self.token,
            kind: TimerKind::Attach,
        });
    }

    /// The badge was activated: hide it. The return destination stays
    /// readable through `last_scroll`.
    pub fn badge_clicked(&mut self) {
        self.hide();
    }

    /// The viewport moved. `target_rows` is the tracked entry's laid line
    /// range. Any scroll supersedes a pending hide; if the entry is fully
    /// off screen a fresh settle window starts.
    pub fn scrolled(&mut self, target_rows: Option<Range<usize>>, view: Range<usize>, now: Instant) {
        self.pending_hide = None;
        if self.badge.is_none() || self.target.is_none() {
            return;
        }
        let Some(rows) = target_rows else {
            return;
        };
        let off_screen = rows.end <= view.start || rows.start >= view.end;
        if off_screen {
            self.pending_hide = Some(now + SETTLE_DELAY);
        }
    }

    /// Fire timers that have come due. Returns true when the badge changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;
        loop {
            let next = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.due <= now)
                .min_by_key(|(_, t)| t.due)
                .map(|(i, _)| i);
            let Some(i) = next else {
                break;
            };
            let timer = self.timers.swap_remove(i);
            if timer.token != self.token {
                continue; // superseded by a later click
            }
            match timer.kind {
                TimerKind::Attach => {
                    self.attach(now);
                    changed = true;
                }
                TimerKind::Reveal => {
                    if let Some(b) = self.badge.as_mut() {
                        if b.attached.is_some() && !b.visible {
                            b.visible = true;
                            changed = true;
                        }
                    }
                }
            }
        }
        if let Some(due) = self.pending_hide {
            if due <= now {
                self.pending_hide = None;
                changed |= self.hide();
            }
        }
        changed
    }

    /// Document content changed: block indices may have shifted, so drop
    /// tracking and in-flight timers. The badge survives, detached.
    pub fn reset(&mut self) {
        self.target = None;
        self.token += 1;
        self.timers.clear();
        self.pending_hide = None;
        if let Some(b) = self.badge.as_mut() {
            b.attached = None;
            b.visible = false;
        }
    }

    // ── Internals ──

    /// Mount the badge on the tracked entry, creating it on first use.
    /// Relocation keeps current visibility; the reveal timer makes it
    /// visible if it was not already.
    fn attach(&mut self, now: Instant) {
        let Some(target) = self.target else {
            return;
        };
        let style = self.badge_style;
        let badge = self.badge.get_or_insert_with(|| Badge::new(style));
        badge.attached = Some(target);
        self.timers.push(Timer {
            due: now + REVEAL_DELAY,
            token: self.token,
            kind: TimerKind::Reveal,
        });
    }

    fn hide(&mut self) -> bool {
        match self.badge.as_mut() {
            Some(b) if b.visible => {
                b.visible = false;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn nav() -> Navigator {
        Navigator::new(Style::default())
    }

    /// Click, then run the clock past attach and reveal.
    fn shown_nav(t: Instant) -> Navigator {
        let mut n = nav();
        n.citation_clicked(7, 120, t);
        n.poll(t + ms(300));
        n.poll(t + ms(400));
        assert_eq!(n.state(), BadgeState::Visible);
        n
    }

    #[test]
    fn test_starts_uncreated_with_zero_scroll() {
        let n = nav();
        assert_eq!(n.state(), BadgeState::Uncreated);
        assert_eq!(n.last_scroll(), 0);
        assert_eq!(n.target(), None);
    }

    #[test]
    fn test_click_attaches_then_reveals() {
        let t = Instant::now();
        let mut n = nav();
        n.citation_clicked(3, 42, t);
        assert_eq!(n.state(), BadgeState::Uncreated);

        assert!(!n.poll(t + ms(299)));
        assert_eq!(n.state(), BadgeState::Uncreated);

        assert!(n.poll(t + ms(300)));
        assert_eq!(n.state(), BadgeState::Hidden);
        assert_eq!(n.badge().unwrap().attached, Some(3));

        assert!(!n.poll(t + ms(399)));
        assert_eq!(n.state(), BadgeState::Hidden);

        assert!(n.poll(t + ms(400)));
        assert_eq!(n.state(), BadgeState::Visible);
    }

    #[test]
    fn test_reveal_counts_from_attach_fire_time() {
        let t = Instant::now();
        let mut n = nav();
        n.citation_clicked(3, 42, t);
        // first poll arrives late; attach fires now, reveal runs 100ms later
        n.poll(t + ms(450));
        assert_eq!(n.state(), BadgeState::Hidden);
        n.poll(t + ms(549));
        assert_eq!(n.state(), BadgeState::Hidden);
        n.poll(t + ms(550));
        assert_eq!(n.state(), BadgeState::Visible);
    }

    #[test]
    fn test_rapid_second_click_supersedes_first() {
        let t = Instant::now();
        let mut n = nav();
        n.citation_clicked(3, 42, t);
        n.citation_clicked(9, 42, t + ms(150));

        // first attach due; its token is stale, nothing happens
        assert!(!n.poll(t + ms(300)));
        assert_eq!(n.state(), BadgeState::Uncreated);

        // second attach lands on the second target only
        n.poll(t + ms(450));
        assert_eq!(n.badge().unwrap().attached, Some(9));
        n.poll(t + ms(550));
        assert_eq!(n.state(), BadgeState::Visible);
        assert_eq!(n.target(), Some(9));
    }

    #[test]
    fn test_last_click_wins_recorded_offset() {
        let t = Instant::now();
        let mut n = nav();
        n.citation_clicked(3, 10, t);
        n.citation_clicked(5, 50, t + ms(50));
        assert_eq!(n.last_scroll(), 50);
        n.poll(t + ms(500));
        n.badge_clicked();
        assert_eq!(n.last_scroll(), 50);
    }

    #[test]
    fn test_badge_click_hides_and_keeps_offset() {
        let t = Instant::now();
        let mut n = shown_nav(t);
        n.badge_clicked();
        assert_eq!(n.state(), BadgeState::Hidden);
        assert_eq!(n.last_scroll(), 120);
        // still attached, just invisible
        assert_eq!(n.badge().unwrap().attached, Some(7));
    }

    #[test]
    fn test_badge_click_from_top_returns_zero() {
        let t = Instant::now();
        let mut n = nav();
        // clicked while sitting at the very top of the document
        n.citation_clicked(7, 0, t);
        n.poll(t + ms(300));
        n.poll(t + ms(400));
        n.badge_clicked();
        assert_eq!(n.last_scroll(), 0);
        assert_eq!(n.state(), BadgeState::Hidden);
    }

    #[test]
    fn test_scroll_away_hides_after_settle() {
        let t = Instant::now();
        let mut n = shown_nav(t);
        // entry occupies rows 100..103, viewport has moved to the top
        n.scrolled(Some(100..103), 0..40, t + ms(500));
        assert!(!n.poll(t + ms(1499)));
        assert_eq!(n.state(), BadgeState::Visible);
        assert!(n.poll(t + ms(1500)));
        assert_eq!(n.state(), BadgeState::Hidden);
    }

    #[test]
    fn test_scroll_back_cancels_pending_hide() {
        let t = Instant::now();
        let mut n = shown_nav(t);
        n.scrolled(Some(100..103), 0..40, t + ms(500));
        // entry comes back on screen before the settle window elapses
        n.scrolled(Some(100..103), 90..130, t + ms(900));
        assert!(!n.poll(t + ms(2000)));
        assert_eq!(n.state(), BadgeState::Visible);
    }

    #[test]
    fn test_repeated_in_view_scrolls_change_nothing() {
        let t = Instant::now();
        let mut n = shown_nav(t);
        for i in 0..20 {
            n.scrolled(Some(100..103), 95..135, t + ms(500 + i * 10));
        }
        assert!(!n.poll(t + ms(10_000)));
        assert_eq!(n.state(), BadgeState::Visible);
    }

    #[test]
    fn test_every_scroll_restarts_settle_window() {
        let t = Instant::now();
        let mut n = shown_nav(t);
        n.scrolled(Some(100..103), 0..40, t + ms(500));
        // still off screen 600ms later; the window restarts from here
        n.scrolled(Some(100..103), 10..50, t + ms(1100));
        assert!(!n.poll(t + ms(1500)));
        assert_eq!(n.state(), BadgeState::Visible);
        assert!(n.poll(t + ms(2100)));
        assert_eq!(n.state(), BadgeState::Hidden);
    }

    #[test]
    fn test_partially_visible_entry_keeps_badge() {
        let t = Instant::now();
        let mut n = shown_nav(t);
        // bottom row of the entry pokes into the viewport
        n.scrolled(Some(38..42), 40..80, t + ms(500));
        assert!(!n.poll(t + ms(5000)));
        assert_eq!(n.state(), BadgeState::Visible);
    }

    #[test]
    fn test_entry_just_off_each_edge_hides() {
        let t = Instant::now();
        let mut n = shown_nav(t);
        // ends exactly at the top edge
        n.scrolled(Some(38..40), 40..80, t + ms(500));
        n.poll(t + ms(1500));
        assert_eq!(n.state(), BadgeState::Hidden);

        let mut n = shown_nav(t);
        // starts exactly at the bottom edge
        n.scrolled(Some(80..83), 40..80, t + ms(500));
        n.poll(t + ms(1500));
        assert_eq!(n.state(), BadgeState::Hidden);
    }

    #[test]
    fn test_scroll_before_any_click_is_noop() {
        let t = Instant::now();
        let mut n = nav();
        n.scrolled(None, 0..40, t);
        assert!(!n.poll(t + ms(5000)));
        assert_eq!(n.state(), BadgeState::Uncreated);
    }

    #[test]
    fn test_scroll_between_click_and_attach_does_not_hide() {
        let t = Instant::now();
        let mut n = nav();
        n.citation_clicked(3, 42, t);
        // the jump itself lands as a scroll before the badge exists
        n.scrolled(Some(100..103), 90..130, t + ms(10));
        n.poll(t + ms(300));
        assert_eq!(n.state(), BadgeState::Hidden);
        n.poll(t + ms(400));
        assert_eq!(n.state(), BadgeState::Visible);
    }

    #[test]
    fn test_relocate_while_visible_never_flickers() {
        let t = Instant::now();
        let mut n = shown_nav(t);
        n.citation_clicked(11, 30, t + ms(1000));
        // between the new click and its attach the badge stays visible
        assert_eq!(n.state(), BadgeState::Visible);
        n.poll(t + ms(1300));
        assert_eq!(n.state(), BadgeState::Visible);
        assert_eq!(n.badge().unwrap().attached, Some(11));
        n.poll(t + ms(1400));
        assert_eq!(n.state(), BadgeState::Visible);
    }

    #[test]
    fn test_settle_hide_while_hidden_stays_hidden() {
        let t = Instant::now();
        let mut n = shown_nav(t);
        n.badge_clicked();
        assert_eq!(n.state(), BadgeState::Hidden);
        n.scrolled(Some(100..103), 0..40, t + ms(1000));
        assert!(!n.poll(t + ms(2500)));
        assert_eq!(n.state(), BadgeState::Hidden);
    }

    #[test]
    fn test_scrolling_back_in_never_reshows() {
        let t = Instant::now();
        let mut n = shown_nav(t);
        n.scrolled(Some(100..103), 0..40, t + ms(500));
        n.poll(t + ms(1500));
        assert_eq!(n.state(), BadgeState::Hidden);
        // the entry returning to the viewport is not a reveal
        n.scrolled(Some(100..103), 90..130, t + ms(1600));
        assert!(!n.poll(t + ms(5000)));
        assert_eq!(n.state(), BadgeState::Hidden);
    }

    #[test]
    fn test_badge_is_created_once_and_reused() {
        let t = Instant::now();
        let mut n = shown_nav(t);
        n.badge_clicked();
        // a later citation reuses the same badge rather than recreating it
        n.citation_clicked(2, 80, t + ms(2000));
        assert_eq!(n.state(), BadgeState::Hidden);
        n.poll(t + ms(2300));
        assert_eq!(n.badge().unwrap().attached, Some(2));
        n.poll(t + ms(2400));
        assert_eq!(n.state(), BadgeState::Visible);
    }

    #[test]
    fn test_reset_detaches_badge_and_cancels_timers() {
        let t = Instant::now();
        let mut n = shown_nav(t);
        n.citation_clicked(4, 60, t + ms(1000));
        n.scrolled(Some(100..103), 0..40, t + ms(1010));
        n.reset();
        assert_eq!(n.target(), None);
        assert_eq!(n.state(), BadgeState::Hidden);
        assert_eq!(n.badge().unwrap().attached, None);
        // nothing pending fires afterwards
        assert!(!n.poll(t + ms(60_000)));
        // the recorded offset survives a reload
        assert_eq!(n.last_scroll(), 60);
    }

    #[test]
    fn test_click_after_reset_runs_full_cycle() {
        let t = Instant::now();
        let mut n = shown_nav(t);
        n.reset();
        n.citation_clicked(1, 5, t + ms(2000));
        n.poll(t + ms(2300));
        n.poll(t + ms(2400));
        assert_eq!(n.state(), BadgeState::Visible);
        assert_eq!(n.badge().unwrap().attached, Some(1));
    }
}

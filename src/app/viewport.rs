use std::ops::Range;

/// Scroll state over the laid-out document. Jumps are instant; the return
/// ride back from a reference entry eases toward its target across ticks.
pub struct Viewport {
    offset: usize,
    height: usize,
    content: usize,
    anim: Option<ScrollAnim>,
}

struct ScrollAnim {
    pos: f32,
    target: f32,
}

impl Viewport {
    pub fn new(height: usize) -> Self {
        Viewport {
            offset: 0,
            height,
            content: 0,
            anim: None,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn max_offset(&self) -> usize {
        self.content.saturating_sub(self.height)
    }

    /// Content rows currently on screen.
    pub fn visible(&self) -> Range<usize> {
        self.offset..(self.offset + self.height).min(self.content)
    }

    pub fn percent(&self) -> u8 {
        let max = self.max_offset();
        if max == 0 {
            100
        } else {
            ((self.offset * 100) / max).min(100) as u8
        }
    }

    pub fn set_content(&mut self, lines: usize) {
        self.content = lines;
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Manual scrolling interrupts any running animation.
    pub fn scroll_by(&mut self, delta: i64) {
        self.anim = None;
        let max = self.max_offset() as i64;
        let next = (self.offset as i64 + delta).clamp(0, max);
        self.offset = next as usize;
    }

    pub fn jump_to(&mut self, line: usize) {
        self.anim = None;
        self.offset = line.min(self.max_offset());
    }

    pub fn animate_to(&mut self, line: usize) {
        let target = line.min(self.max_offset());
        if target == self.offset {
            self.anim = None;
            return;
        }
        self.anim = Some(ScrollAnim {
            pos: self.offset as f32,
            target: target as f32,
        });
    }

    pub fn animating(&self) -> bool {
        self.anim.is_some()
    }

    /// Advance the animation one tick. Returns true when the offset moved.
    pub fn tick(&mut self) -> bool {
        let Some(anim) = self.anim.as_mut() else {
            return false;
        };
        let diff = anim.target - anim.pos;
        if diff.abs() < 0.5 {
            let target = anim.target as usize;
            self.anim = None;
            let moved = self.offset != target;
            self.offset = target.min(self.max_offset());
            return moved;
        }
        anim.pos += diff * 0.15;
        let next = anim.pos.round().max(0.0) as usize;
        let moved = next != self.offset;
        self.offset = next.min(self.max_offset());
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(content: usize, height: usize) -> Viewport {
        let mut v = Viewport::new(height);
        v.set_content(content);
        v
    }

    #[test]
    fn test_scroll_clamps_to_bounds() {
        let mut v = viewport(100, 20);
        v.scroll_by(-5);
        assert_eq!(v.offset(), 0);
        v.scroll_by(1000);
        assert_eq!(v.offset(), 80);
    }

    #[test]
    fn test_jump_clamps_to_max() {
        let mut v = viewport(50, 20);
        v.jump_to(999);
        assert_eq!(v.offset(), 30);
    }

    #[test]
    fn test_short_content_never_scrolls() {
        let mut v = viewport(5, 20);
        v.scroll_by(3);
        assert_eq!(v.offset(), 0);
        assert_eq!(v.visible(), 0..5);
    }

    #[test]
    fn test_animation_converges_and_stops() {
        let mut v = viewport(500, 20);
        v.jump_to(400);
        v.animate_to(10);
        assert!(v.animating());
        for _ in 0..500 {
            if !v.animating() {
                break;
            }
            v.tick();
        }
        assert!(!v.animating());
        assert_eq!(v.offset(), 10);
    }

    #[test]
    fn test_animation_moves_toward_target_each_tick() {
        let mut v = viewport(500, 20);
        v.jump_to(0);
        v.animate_to(300);
        let mut last = v.offset();
        for _ in 0..10 {
            v.tick();
            assert!(v.offset() >= last);
            last = v.offset();
        }
        assert!(last > 0);
    }

    #[test]
    fn test_manual_scroll_cancels_animation() {
        let mut v = viewport(500, 20);
        v.animate_to(300);
        assert!(v.animating());
        v.scroll_by(1);
        assert!(!v.animating());
        assert_eq!(v.offset(), 1);
    }

    #[test]
    fn test_animate_to_current_offset_is_noop() {
        let mut v = viewport(500, 20);
        v.jump_to(42);
        v.animate_to(42);
        assert!(!v.animating());
    }

    #[test]
    fn test_resize_clamps_offset() {
        let mut v = viewport(100, 20);
        v.jump_to(80);
        v.set_height(50);
        assert_eq!(v.offset(), 50);
    }

    #[test]
    fn test_percent() {
        let mut v = viewport(120, 20);
        assert_eq!(v.percent(), 0);
        v.jump_to(50);
        assert_eq!(v.percent(), 50);
        v.jump_to(100);
        assert_eq!(v.percent(), 100);
        assert_eq!(viewport(10, 20).percent(), 100);
    }
}

use std::env;

use ratatui::style::{Color, Modifier, Style};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeMode {
    Dark,
    Light,
    Auto,
}

impl ThemeMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

/// Color palette plus the composed styles built from it.
#[derive(Clone, Debug)]
pub struct Theme {
    // ── Background colors ──
    pub bg: Color,
    pub surface: Color,
    pub border: Color,

    // ── Text colors ──
    pub text: Color,
    pub dim: Color,
    pub muted: Color,
    pub bright: Color,

    // ── Accent colors ──
    pub blue: Color,
    pub cyan: Color,
    pub green: Color,
    pub yellow: Color,
    pub red: Color,
    pub purple: Color,

    // ── Highlights ──
    pub hit_bg: Color,

    /// syntect theme used for fenced code blocks.
    pub code_theme: &'static str,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb(12, 12, 12),
            surface: Color::Rgb(20, 20, 20),
            border: Color::Rgb(42, 42, 42),
            text: Color::Rgb(200, 200, 200),
            dim: Color::Rgb(102, 102, 102),
            muted: Color::Rgb(136, 136, 136),
            bright: Color::Rgb(232, 232, 232),
            blue: Color::Rgb(96, 165, 250),
            cyan: Color::Rgb(34, 211, 238),
            green: Color::Rgb(74, 222, 128),
            yellow: Color::Rgb(250, 204, 21),
            red: Color::Rgb(248, 113, 113),
            purple: Color::Rgb(167, 139, 250),
            hit_bg: Color::Rgb(64, 58, 12),
            code_theme: "base16-ocean.dark",
        }
    }

    pub fn light() -> Self {
        Self {
            bg: Color::Rgb(250, 250, 248),
            surface: Color::Rgb(238, 238, 235),
            border: Color::Rgb(208, 208, 204),
            text: Color::Rgb(55, 55, 55),
            dim: Color::Rgb(150, 150, 150),
            muted: Color::Rgb(115, 115, 115),
            bright: Color::Rgb(20, 20, 20),
            blue: Color::Rgb(29, 78, 216),
            cyan: Color::Rgb(14, 116, 144),
            green: Color::Rgb(21, 128, 61),
            yellow: Color::Rgb(161, 98, 7),
            red: Color::Rgb(185, 28, 28),
            purple: Color::Rgb(109, 40, 217),
            hit_bg: Color::Rgb(254, 243, 184),
            code_theme: "InspiredGitHub",
        }
    }

    /// Resolves `Auto` with a one-shot look at the terminal background.
    pub fn select(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self::dark(),
            ThemeMode::Light => Self::light(),
            ThemeMode::Auto => {
                if terminal_is_light() {
                    Self::light()
                } else {
                    Self::dark()
                }
            }
        }
    }

    // ── Composed styles ──

    pub fn default_style(&self) -> Style {
        Style::default().fg(self.text).bg(self.bg)
    }

    pub fn surface_style(&self) -> Style {
        Style::default().fg(self.muted).bg(self.surface)
    }

    pub fn title_style(&self) -> Style {
        Style::default().fg(self.bright).add_modifier(Modifier::BOLD)
    }

    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub fn heading_style(&self, level: u8) -> Style {
        let fg = match level {
            1 => self.yellow,
            2 => self.blue,
            3 => self.cyan,
            _ => self.bright,
        };
        Style::default().fg(fg).add_modifier(Modifier::BOLD)
    }

    pub fn link_style(&self) -> Style {
        Style::default().fg(self.blue).add_modifier(Modifier::UNDERLINED)
    }

    /// Citation links render distinct from ordinary links.
    pub fn citation_style(&self) -> Style {
        Style::default().fg(self.cyan).add_modifier(Modifier::BOLD)
    }

    pub fn code_inline_style(&self) -> Style {
        Style::default().fg(self.yellow).bg(self.surface)
    }

    pub fn code_block_style(&self) -> Style {
        Style::default().bg(self.surface)
    }

    pub fn quote_style(&self) -> Style {
        Style::default().fg(self.muted).add_modifier(Modifier::ITALIC)
    }

    pub fn rule_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub fn ref_label_style(&self) -> Style {
        Style::default().fg(self.purple).add_modifier(Modifier::BOLD)
    }

    pub fn badge_style(&self) -> Style {
        Style::default()
            .fg(self.bg)
            .bg(self.cyan)
            .add_modifier(Modifier::BOLD)
    }

    pub fn search_hit_style(&self) -> Style {
        Style::default().bg(self.hit_bg)
    }

    pub fn key_hint_style(&self) -> Style {
        Style::default().fg(self.muted).add_modifier(Modifier::BOLD)
    }

    pub fn notice_style(&self) -> Style {
        Style::default()
            .fg(self.cyan)
            .bg(self.surface)
            .add_modifier(Modifier::BOLD)
    }

    pub fn error_style(&self) -> Style {
        Style::default()
            .fg(self.red)
            .bg(self.surface)
            .add_modifier(Modifier::BOLD)
    }
}

/// COLORFGBG is "fg;bg" (some terminals "fg;default;bg"); light backgrounds
/// report 7 or 15.
fn terminal_is_light() -> bool {
    match env::var("COLORFGBG") {
        Ok(v) => matches!(v.rsplit(';').next(), Some("7") | Some("15")),
        Err(_) => false,
    }
}

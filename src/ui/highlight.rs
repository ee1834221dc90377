use ratatui::style::Color;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;

/// One colored fragment of a highlighted code line.
pub type CodeSpan = (Option<Color>, String);

/// Cached syntax highlighting state, loaded once and reused for all documents.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl Highlighter {
    pub fn new() -> Self {
        Highlighter {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    /// Highlight a fenced code block, returning styled fragments per line.
    /// `lang` is the fence info token (e.g. "rust"); unknown or empty
    /// languages come back as single uncolored fragments per line.
    pub fn highlight_block(&self, code: &str, lang: &str, theme_name: &str) -> Vec<Vec<CodeSpan>> {
        let syntax = if lang.is_empty() {
            None
        } else {
            self.syntax_set.find_syntax_by_token(lang)
        };
        let Some(syntax) = syntax else {
            return code
                .lines()
                .map(|line| vec![(None, line.to_string())])
                .collect();
        };

        let theme = self
            .theme_set
            .themes
            .get(theme_name)
            .unwrap_or(&self.theme_set.themes["base16-ocean.dark"]);

        // One highlighter for the whole block so multi-line tokens keep state
        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut lines = Vec::new();
        for line in code.lines() {
            // syntect needs a trailing newline
            let input = format!("{}\n", line);
            match highlighter.highlight_line(&input, &self.syntax_set) {
                Ok(ranges) => {
                    let spans = ranges
                        .into_iter()
                        .map(|(syn_style, text)| {
                            let fg = Color::Rgb(
                                syn_style.foreground.r,
                                syn_style.foreground.g,
                                syn_style.foreground.b,
                            );
                            (Some(fg), text.trim_end_matches('\n').to_string())
                        })
                        .collect();
                    lines.push(spans);
                }
                Err(_) => lines.push(vec![(None, line.to_string())]),
            }
        }
        lines
    }
}

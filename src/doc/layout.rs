use std::ops::Range;

use ratatui::style::{Modifier, Style};

use crate::ui::highlight::Highlighter;
use crate::ui::styles::Theme;

use super::parse::{BlockKind, Document, Inline, LinkTarget};

/// One styled fragment on a laid-out line, addressed by start column.
#[derive(Debug, Clone)]
pub struct LaidSpan {
    pub col: u16,
    pub text: String,
    pub style: Style,
    pub link: Option<LinkTarget>,
}

impl LaidSpan {
    pub fn width(&self) -> u16 {
        width_u16(self.text.chars().count())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LaidLine {
    /// Index of the block this line belongs to.
    pub block: usize,
    pub spans: Vec<LaidSpan>,
}

impl LaidLine {
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// A document flowed at a fixed column width. Rebuilt on resize and reload;
/// keeps per-block line ranges so callers can test block visibility and
/// resolve anchors to rows.
pub struct Layout {
    pub width: u16,
    lines: Vec<LaidLine>,
    block_ranges: Vec<Range<usize>>,
}

impl Layout {
    pub fn build(doc: &Document, width: u16, theme: &Theme, hl: &Highlighter) -> Layout {
        let width = width.max(20);
        let mut lines: Vec<LaidLine> = Vec::new();
        let mut block_ranges = Vec::with_capacity(doc.blocks.len());

        for (idx, block) in doc.blocks.iter().enumerate() {
            let start = lines.len();
            match &block.kind {
                BlockKind::Code { lang, text } => {
                    layout_code(&mut lines, idx, lang, text, theme, hl);
                }
                BlockKind::Rule => {
                    lines.push(LaidLine {
                        block: idx,
                        spans: vec![LaidSpan {
                            col: 0,
                            text: "─".repeat(width as usize),
                            style: theme.rule_style(),
                            link: None,
                        }],
                    });
                }
                BlockKind::Heading { level } => {
                    let level = *level;
                    wrap_inlines(
                        &mut lines,
                        idx,
                        &block.inlines,
                        Vec::new(),
                        Vec::new(),
                        width,
                        &|inline| {
                            let mut style = theme.heading_style(level);
                            if inline.link.is_some() {
                                style = style.add_modifier(Modifier::UNDERLINED);
                            }
                            style
                        },
                    );
                }
                BlockKind::Paragraph => {
                    wrap_inlines(
                        &mut lines,
                        idx,
                        &block.inlines,
                        Vec::new(),
                        Vec::new(),
                        width,
                        &|inline| span_style(theme, inline, Style::default().fg(theme.text)),
                    );
                }
                BlockKind::Quote { depth } => {
                    let bar = LaidSpan {
                        col: 0,
                        text: "│ ".repeat(*depth),
                        style: theme.rule_style(),
                        link: None,
                    };
                    wrap_inlines(
                        &mut lines,
                        idx,
                        &block.inlines,
                        vec![bar.clone()],
                        vec![bar],
                        width,
                        &|inline| span_style(theme, inline, theme.quote_style()),
                    );
                }
                BlockKind::ListItem { indent, marker } => {
                    let lead = format!("{}{}", "  ".repeat(*indent), marker);
                    let hang = " ".repeat(lead.chars().count());
                    wrap_inlines(
                        &mut lines,
                        idx,
                        &block.inlines,
                        vec![LaidSpan {
                            col: 0,
                            text: lead,
                            style: Style::default().fg(theme.muted),
                            link: None,
                        }],
                        vec![LaidSpan {
                            col: 0,
                            text: hang,
                            style: Style::default().fg(theme.muted),
                            link: None,
                        }],
                        width,
                        &|inline| span_style(theme, inline, Style::default().fg(theme.text)),
                    );
                }
                BlockKind::RefEntry { number, .. } => {
                    let label = format!("[{}] ", number);
                    let hang = " ".repeat(label.chars().count());
                    wrap_inlines(
                        &mut lines,
                        idx,
                        &block.inlines,
                        vec![LaidSpan {
                            col: 0,
                            text: label,
                            style: theme.ref_label_style(),
                            link: None,
                        }],
                        vec![LaidSpan {
                            col: 0,
                            text: hang,
                            style: Style::default(),
                            link: None,
                        }],
                        width,
                        &|inline| span_style(theme, inline, Style::default().fg(theme.text)),
                    );
                }
            }

            // every block occupies at least one line so ranges stay addressable
            if lines.len() == start {
                lines.push(LaidLine {
                    block: idx,
                    spans: Vec::new(),
                });
            }
            block_ranges.push(start..lines.len());

            let adjacent_items = matches!(block.kind, BlockKind::ListItem { .. })
                && matches!(
                    doc.blocks.get(idx + 1).map(|b| &b.kind),
                    Some(BlockKind::ListItem { .. })
                );
            if idx + 1 < doc.blocks.len() && !adjacent_items {
                lines.push(LaidLine {
                    block: idx,
                    spans: Vec::new(),
                });
            }
        }

        Layout {
            width,
            lines,
            block_ranges,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, idx: usize) -> Option<&LaidLine> {
        self.lines.get(idx)
    }

    pub fn lines(&self) -> &[LaidLine] {
        &self.lines
    }

    /// Half-open line range occupied by a block (separators excluded).
    pub fn block_range(&self, block: usize) -> Range<usize> {
        self.block_ranges
            .get(block)
            .cloned()
            .unwrap_or(0..0)
    }

    pub fn block_start(&self, block: usize) -> usize {
        self.block_range(block).start
    }

    pub fn block_of_line(&self, line: usize) -> Option<usize> {
        self.lines.get(line).map(|l| l.block)
    }

    /// Link under a content-relative column on a given laid line.
    pub fn link_at(&self, col: u16, line: usize) -> Option<&LinkTarget> {
        let line = self.lines.get(line)?;
        line.spans
            .iter()
            .filter(|span| span.link.is_some())
            .find(|span| col >= span.col && col < span.col + span.width())
            .and_then(|span| span.link.as_ref())
    }
}

fn span_style(theme: &Theme, inline: &Inline, base: Style) -> Style {
    let mut style = if let Some(link) = &inline.link {
        if link.is_citation() {
            theme.citation_style()
        } else {
            theme.link_style()
        }
    } else if inline.style.code {
        theme.code_inline_style()
    } else {
        base
    };
    if inline.style.strong {
        style = style.add_modifier(Modifier::BOLD);
    }
    if inline.style.emphasis {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if inline.style.strikethrough {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    style
}

fn layout_code(
    out: &mut Vec<LaidLine>,
    block: usize,
    lang: &str,
    text: &str,
    theme: &Theme,
    hl: &Highlighter,
) {
    let base = theme.code_block_style();
    for code_line in hl.highlight_block(text, lang, theme.code_theme) {
        let mut spans = Vec::with_capacity(code_line.len() + 1);
        let mut col: u16 = 2;
        spans.push(LaidSpan {
            col: 0,
            text: "  ".to_string(),
            style: base,
            link: None,
        });
        for (fg, fragment) in code_line {
            if fragment.is_empty() {
                continue;
            }
            // long code lines are clipped at render time, not wrapped
            let style = match fg {
                Some(color) => base.fg(color),
                None => base.fg(theme.text),
            };
            let span = LaidSpan {
                col,
                text: fragment,
                style,
                link: None,
            };
            col = col.saturating_add(span.width());
            spans.push(span);
        }
        out.push(LaidLine { block, spans });
    }
}

enum Token<'a> {
    Word {
        text: &'a str,
        style: Style,
        link: &'a Option<LinkTarget>,
    },
    /// A space, styled like the inline it came from (so a space inside a
    /// link stays part of the link, a space before one does not).
    Space {
        style: Style,
        link: &'a Option<LinkTarget>,
    },
    Break,
}

/// Greedy word wrap. Inline boundaries never insert spaces on their own;
/// only spaces present in the text do, so adjacent styled runs stay glued.
fn wrap_inlines(
    out: &mut Vec<LaidLine>,
    block: usize,
    inlines: &[Inline],
    first_prefix: Vec<LaidSpan>,
    cont_prefix: Vec<LaidSpan>,
    width: u16,
    resolve: &dyn Fn(&Inline) -> Style,
) {
    let mut tokens: Vec<Token> = Vec::new();
    for inline in inlines {
        if inline.text == "\n" {
            tokens.push(Token::Break);
            continue;
        }
        let style = resolve(inline);
        for (i, word) in inline.text.split(' ').enumerate() {
            if i > 0 && !matches!(tokens.last(), Some(Token::Space { .. }) | None) {
                tokens.push(Token::Space {
                    style,
                    link: &inline.link,
                });
            }
            if !word.is_empty() {
                tokens.push(Token::Word {
                    text: word,
                    style,
                    link: &inline.link,
                });
            }
        }
    }

    let mut lb = LineBuilder {
        out,
        block,
        cont_prefix,
        width,
        start: prefix_width(&first_prefix),
        col: prefix_width(&first_prefix),
        cur: first_prefix,
        emitted: 0,
    };
    let mut pending: Option<(Style, &Option<LinkTarget>)> = None;
    for token in tokens {
        match token {
            Token::Break => {
                lb.break_line();
                pending = None;
            }
            Token::Space { style, link } => {
                pending = Some((style, link));
            }
            Token::Word { text, style, link } => {
                lb.push_word(text, style, link, pending.take());
            }
        }
    }
    lb.finish();
}

fn prefix_width(spans: &[LaidSpan]) -> u16 {
    spans.iter().map(|s| s.width()).sum()
}

struct LineBuilder<'a> {
    out: &'a mut Vec<LaidLine>,
    block: usize,
    cont_prefix: Vec<LaidSpan>,
    width: u16,
    start: u16,
    col: u16,
    cur: Vec<LaidSpan>,
    emitted: usize,
}

impl LineBuilder<'_> {
    fn break_line(&mut self) {
        let spans = std::mem::replace(&mut self.cur, self.cont_prefix.clone());
        self.out.push(LaidLine {
            block: self.block,
            spans,
        });
        self.emitted += 1;
        self.start = prefix_width(&self.cur);
        self.col = self.start;
    }

    fn push_word(
        &mut self,
        text: &str,
        style: Style,
        link: &Option<LinkTarget>,
        pending_space: Option<(Style, &Option<LinkTarget>)>,
    ) {
        let word_width = width_u16(text.chars().count());
        let space: u16 = if pending_space.is_some() && self.col > self.start {
            1
        } else {
            0
        };
        if self.col + space + word_width > self.width && self.col > self.start {
            self.break_line();
        } else if space == 1 {
            let (sp_style, sp_link) = pending_space.unwrap();
            self.place(" ", sp_style, sp_link);
        }
        // a word wider than the whole line hard-splits
        let mut rest = text;
        loop {
            let avail = self.width.saturating_sub(self.col).max(1) as usize;
            if rest.chars().count() <= avail {
                self.place(rest, style, link);
                break;
            }
            let split = rest
                .char_indices()
                .nth(avail)
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            let (head, tail) = rest.split_at(split);
            self.place(head, style, link);
            self.break_line();
            rest = tail;
        }
    }

    fn place(&mut self, text: &str, style: Style, link: &Option<LinkTarget>) {
        if text.is_empty() {
            return;
        }
        let w = width_u16(text.chars().count());
        if let Some(last) = self.cur.last_mut() {
            if last.style == style && last.link == *link {
                last.text.push_str(text);
                self.col += w;
                return;
            }
        }
        self.cur.push(LaidSpan {
            col: self.col,
            text: text.to_string(),
            style,
            link: link.clone(),
        });
        self.col += w;
    }

    fn finish(mut self) {
        if self.col > self.start || self.emitted == 0 {
            let spans = std::mem::take(&mut self.cur);
            self.out.push(LaidLine {
                block: self.block,
                spans,
            });
        }
    }
}

fn width_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

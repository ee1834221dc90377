use std::collections::HashMap;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Anchor prefix that marks an in-document link as a citation.
pub const CITATION_PREFIX: &str = "ref-";

#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// Anchor inside this document (without the leading '#').
    Internal(String),
    /// Anything else: http(s), mailto, relative paths.
    External(String),
}

impl LinkTarget {
    pub fn is_citation(&self) -> bool {
        matches!(self, LinkTarget::Internal(a) if a.starts_with(CITATION_PREFIX))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InlineStyle {
    pub emphasis: bool,
    pub strong: bool,
    pub strikethrough: bool,
    pub code: bool,
}

/// A run of text with one style and at most one link.
#[derive(Debug, Clone)]
pub struct Inline {
    pub text: String,
    pub style: InlineStyle,
    pub link: Option<LinkTarget>,
}

impl Inline {
    fn plain(text: impl Into<String>) -> Self {
        Inline {
            text: text.into(),
            style: InlineStyle::default(),
            link: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Heading { level: u8 },
    Paragraph,
    ListItem { indent: usize, marker: String },
    Quote { depth: usize },
    Code { lang: String, text: String },
    Rule,
    /// One bibliography entry, anchored at `ref-<label>`.
    RefEntry { label: String, number: usize },
}

#[derive(Debug, Clone)]
pub struct Block {
    pub kind: BlockKind,
    pub inlines: Vec<Inline>,
    pub anchor: Option<String>,
}

#[derive(Debug)]
pub struct Document {
    /// First H1 text, shown in the title bar.
    pub title: Option<String>,
    pub blocks: Vec<Block>,
    /// Anchor id -> block index.
    pub anchors: HashMap<String, usize>,
}

impl Document {
    pub fn block_for_anchor(&self, anchor: &str) -> Option<usize> {
        self.anchors.get(anchor).copied()
    }

    pub fn reference_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::RefEntry { .. }))
            .count()
    }
}

/// Parse markdown into a block-level document. Footnote definitions become
/// numbered reference entries appended under a synthesized "References"
/// heading; footnote references become `[n]` citation links pointing at them.
pub fn parse_document(source: &str) -> Document {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);

    let mut builder = DocBuilder::new();
    for event in Parser::new_ext(source, options) {
        match event {
            Event::Start(tag) => builder.handle_start(tag),
            Event::End(tag) => builder.handle_end(tag),
            Event::Text(text) => builder.add_text(&text),
            Event::Code(code) => builder.add_inline_code(&code),
            Event::Html(html) | Event::InlineHtml(html) => builder.add_text(&html),
            Event::FootnoteReference(label) => builder.add_footnote_reference(&label),
            Event::SoftBreak => builder.soft_break(),
            Event::HardBreak => builder.hard_break(),
            Event::Rule => builder.add_rule(),
            Event::TaskListMarker(done) => builder.add_task_marker(done),
            _ => {}
        }
    }
    builder.finish()
}

#[derive(Default)]
struct StyleState {
    emphasis: usize,
    strong: usize,
    strikethrough: usize,
}

impl StyleState {
    fn current(&self) -> InlineStyle {
        InlineStyle {
            emphasis: self.emphasis > 0,
            strong: self.strong > 0,
            strikethrough: self.strikethrough > 0,
            code: false,
        }
    }
}

struct ListLevel {
    next_index: Option<u64>,
}

struct DocBuilder {
    blocks: Vec<Block>,
    anchors: HashMap<String, usize>,
    title: Option<String>,

    inlines: Vec<Inline>,
    style: StyleState,
    link: Option<LinkTarget>,
    image: Option<(String, String)>,

    heading: Option<(u8, Option<String>)>,
    heading_text: String,
    quote_depth: usize,
    lists: Vec<ListLevel>,
    item_marker: Option<String>,

    code_lang: Option<String>,
    code_buf: String,

    definition: Option<(String, Vec<Inline>)>,
    definitions: Vec<(String, Vec<Inline>)>,
    referenced: Vec<String>,
}

impl DocBuilder {
    fn new() -> Self {
        DocBuilder {
            blocks: Vec::new(),
            anchors: HashMap::new(),
            title: None,
            inlines: Vec::new(),
            style: StyleState::default(),
            link: None,
            image: None,
            heading: None,
            heading_text: String::new(),
            quote_depth: 0,
            lists: Vec::new(),
            item_marker: None,
            code_lang: None,
            code_buf: String::new(),
            definition: None,
            definitions: Vec::new(),
            referenced: Vec::new(),
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        if inline.text.is_empty() {
            return;
        }
        if let Some((_, buf)) = self.definition.as_mut() {
            buf.push(inline);
        } else {
            self.inlines.push(inline);
        }
    }

    fn add_text(&mut self, text: &str) {
        if self.code_lang.is_some() {
            self.code_buf.push_str(text);
            return;
        }
        if let Some((_, alt)) = self.image.as_mut() {
            alt.push_str(text);
            return;
        }
        if self.heading.is_some() {
            self.heading_text.push_str(text);
        }
        self.push_inline(Inline {
            text: text.to_string(),
            style: self.style.current(),
            link: self.link.clone(),
        });
    }

    fn add_inline_code(&mut self, code: &str) {
        if self.code_lang.is_some() {
            self.code_buf.push_str(code);
            return;
        }
        if self.heading.is_some() {
            self.heading_text.push_str(code);
        }
        let mut style = self.style.current();
        style.code = true;
        self.push_inline(Inline {
            text: code.to_string(),
            style,
            link: self.link.clone(),
        });
    }

    /// A footnote reference renders as a numbered citation link. Numbers
    /// follow first-use order, shared with the reference entries.
    fn add_footnote_reference(&mut self, label: &str) {
        let number = match self.referenced.iter().position(|l| l == label) {
            Some(pos) => pos + 1,
            None => {
                self.referenced.push(label.to_string());
                self.referenced.len()
            }
        };
        self.push_inline(Inline {
            text: format!("[{}]", number),
            style: self.style.current(),
            link: Some(LinkTarget::Internal(format!("{}{}", CITATION_PREFIX, label))),
        });
    }

    fn soft_break(&mut self) {
        if self.code_lang.is_some() {
            self.code_buf.push('\n');
            return;
        }
        if self.heading.is_some() {
            self.heading_text.push(' ');
        }
        self.push_inline(Inline {
            text: " ".to_string(),
            style: self.style.current(),
            link: self.link.clone(),
        });
    }

    fn hard_break(&mut self) {
        if self.code_lang.is_some() {
            self.code_buf.push('\n');
            return;
        }
        // layout treats "\n" as a forced wrap point
        self.push_inline(Inline::plain("\n"));
    }

    fn add_rule(&mut self) {
        self.flush_plain();
        self.blocks.push(Block {
            kind: BlockKind::Rule,
            inlines: Vec::new(),
            anchor: None,
        });
    }

    fn add_task_marker(&mut self, done: bool) {
        let marker = if done { "[x] " } else { "[ ] " };
        self.push_inline(Inline::plain(marker));
    }

    fn handle_start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                // paragraphs inside a definition flatten into one entry
                if let Some((_, buf)) = self.definition.as_mut() {
                    if !buf.is_empty() {
                        buf.push(Inline::plain(" "));
                    }
                }
            }
            Tag::Heading { level, id, .. } => {
                self.flush_plain();
                self.heading = Some((heading_level_u8(level), id.map(|s| s.to_string())));
                self.heading_text.clear();
            }
            Tag::BlockQuote(_) => {
                self.flush_plain();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.flush_plain();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .unwrap_or("")
                        .to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code_lang = Some(lang);
                self.code_buf.clear();
            }
            Tag::List(start) => {
                // a nested list splits the enclosing item's text
                self.flush_item();
                self.lists.push(ListLevel { next_index: start });
            }
            Tag::Item => {
                let marker = match self.lists.last_mut() {
                    Some(level) => match level.next_index.as_mut() {
                        Some(n) => {
                            let marker = format!("{}. ", n);
                            *n += 1;
                            marker
                        }
                        None => "• ".to_string(),
                    },
                    None => "• ".to_string(),
                };
                self.item_marker = Some(marker);
            }
            Tag::FootnoteDefinition(label) => {
                self.flush_plain();
                self.definition = Some((label.to_string(), Vec::new()));
            }
            Tag::Emphasis => self.style.emphasis += 1,
            Tag::Strong => self.style.strong += 1,
            Tag::Strikethrough => self.style.strikethrough += 1,
            Tag::Link { dest_url, .. } => {
                self.link = Some(parse_link_target(&dest_url));
            }
            Tag::Image { dest_url, .. } => {
                self.image = Some((dest_url.to_string(), String::new()));
            }
            _ => {}
        }
    }

    fn handle_end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.definition.is_none() && self.item_marker.is_none() {
                    self.flush_plain();
                }
            }
            TagEnd::Heading(_) => self.flush_heading(),
            TagEnd::BlockQuote => {
                self.flush_plain();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::CodeBlock => {
                let lang = self.code_lang.take().unwrap_or_default();
                let text = std::mem::take(&mut self.code_buf);
                self.blocks.push(Block {
                    kind: BlockKind::Code { lang, text },
                    inlines: Vec::new(),
                    anchor: None,
                });
            }
            TagEnd::List(_) => {
                self.lists.pop();
            }
            TagEnd::Item => self.flush_item(),
            TagEnd::FootnoteDefinition => {
                if let Some(def) = self.definition.take() {
                    self.definitions.push(def);
                }
            }
            TagEnd::Emphasis => self.style.emphasis = self.style.emphasis.saturating_sub(1),
            TagEnd::Strong => self.style.strong = self.style.strong.saturating_sub(1),
            TagEnd::Strikethrough => {
                self.style.strikethrough = self.style.strikethrough.saturating_sub(1)
            }
            TagEnd::Link => self.link = None,
            TagEnd::Image => {
                if let Some((target, alt)) = self.image.take() {
                    let alt = if alt.trim().is_empty() {
                        "image".to_string()
                    } else {
                        alt.trim().to_string()
                    };
                    self.push_inline(Inline {
                        text: format!("[image: {}]", alt),
                        style: InlineStyle::default(),
                        link: Some(LinkTarget::External(target)),
                    });
                }
            }
            _ => {}
        }
    }

    /// Flush pending inlines as a paragraph (or quote paragraph).
    fn flush_plain(&mut self) {
        if self.inlines.is_empty() {
            return;
        }
        let kind = if self.quote_depth > 0 {
            BlockKind::Quote {
                depth: self.quote_depth,
            }
        } else {
            BlockKind::Paragraph
        };
        let inlines = std::mem::take(&mut self.inlines);
        self.blocks.push(Block {
            kind,
            inlines,
            anchor: None,
        });
    }

    fn flush_item(&mut self) {
        let Some(marker) = self.item_marker.take() else {
            return;
        };
        if self.inlines.is_empty() {
            return;
        }
        let inlines = std::mem::take(&mut self.inlines);
        self.blocks.push(Block {
            kind: BlockKind::ListItem {
                indent: self.lists.len().saturating_sub(1),
                marker,
            },
            inlines,
            anchor: None,
        });
    }

    fn flush_heading(&mut self) {
        let Some((level, explicit_id)) = self.heading.take() else {
            return;
        };
        let text = std::mem::take(&mut self.heading_text);
        if level == 1 && self.title.is_none() {
            self.title = Some(text.trim().to_string());
        }
        let anchor = match explicit_id {
            Some(id) => id,
            None => self.unique_anchor(&slugify(&text)),
        };
        let inlines = std::mem::take(&mut self.inlines);
        let index = self.blocks.len();
        self.blocks.push(Block {
            kind: BlockKind::Heading { level },
            inlines,
            anchor: Some(anchor.clone()),
        });
        self.anchors.entry(anchor).or_insert(index);
    }

    /// Deduplicates slugs the way hosted renderers do: `setup`, `setup-2`, ...
    fn unique_anchor(&self, base: &str) -> String {
        if !self.anchors.contains_key(base) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !self.anchors.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn finish(mut self) -> Document {
        self.flush_plain();

        if !self.definitions.is_empty() {
            let anchor = self.unique_anchor("references");
            let index = self.blocks.len();
            self.blocks.push(Block {
                kind: BlockKind::Heading { level: 2 },
                inlines: vec![Inline::plain("References")],
                anchor: Some(anchor.clone()),
            });
            self.anchors.entry(anchor).or_insert(index);

            // referenced entries first, in first-use order, then the rest
            let mut definitions = std::mem::take(&mut self.definitions);
            let referenced = std::mem::take(&mut self.referenced);
            let mut next_number = referenced.len();
            let mut ordered: Vec<(String, usize, Vec<Inline>)> = Vec::new();
            for (i, label) in referenced.iter().enumerate() {
                if let Some(pos) = definitions.iter().position(|(l, _)| l == label) {
                    let (label, inlines) = definitions.remove(pos);
                    ordered.push((label, i + 1, inlines));
                }
            }
            for (label, inlines) in definitions {
                next_number += 1;
                ordered.push((label, next_number, inlines));
            }

            for (label, number, inlines) in ordered {
                let anchor = format!("{}{}", CITATION_PREFIX, label);
                let index = self.blocks.len();
                self.blocks.push(Block {
                    kind: BlockKind::RefEntry {
                        label: label.clone(),
                        number,
                    },
                    inlines,
                    anchor: Some(anchor.clone()),
                });
                self.anchors.insert(anchor, index);
            }
        }

        Document {
            title: self.title,
            blocks: self.blocks,
            anchors: self.anchors,
        }
    }
}

fn heading_level_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn parse_link_target(dest: &str) -> LinkTarget {
    match dest.strip_prefix('#') {
        Some(anchor) => LinkTarget::Internal(anchor.to_string()),
        None => LinkTarget::External(dest.to_string()),
    }
}

/// GitHub-style slug: lowercase, punctuation dropped, spaces become dashes.
fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if c == ' ' {
            slug.push('-');
        } else if c == '-' || c == '_' {
            slug.push(c);
        }
    }
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_text(block: &Block) -> String {
        block.inlines.iter().map(|i| i.text.as_str()).collect()
    }

    #[test]
    fn test_parse_headings_and_anchors() {
        let doc = parse_document("# My Paper\n\nIntro text.\n\n## Methods\n\nBody.\n");
        assert_eq!(doc.title.as_deref(), Some("My Paper"));
        assert_eq!(doc.blocks.len(), 4);
        assert_eq!(doc.blocks[0].kind, BlockKind::Heading { level: 1 });
        assert_eq!(doc.block_for_anchor("my-paper"), Some(0));
        assert_eq!(doc.block_for_anchor("methods"), Some(2));
    }

    #[test]
    fn test_explicit_heading_id_wins_over_slug() {
        let doc = parse_document("## Results {#res}\n");
        assert_eq!(doc.block_for_anchor("res"), Some(0));
        assert_eq!(doc.block_for_anchor("results"), None);
    }

    #[test]
    fn test_duplicate_slugs_deduplicate() {
        let doc = parse_document("## Setup\n\n## Setup\n\n## Setup\n");
        assert_eq!(doc.block_for_anchor("setup"), Some(0));
        assert_eq!(doc.block_for_anchor("setup-2"), Some(1));
        assert_eq!(doc.block_for_anchor("setup-3"), Some(2));
    }

    #[test]
    fn test_footnote_becomes_reference_entry() {
        let doc = parse_document("Shown in prior work[^smith].\n\n[^smith]: Smith, 2020. A Study.\n");
        // paragraph + synthesized References heading + entry
        assert_eq!(doc.blocks.len(), 3);
        let entry = doc.block_for_anchor("ref-smith").unwrap();
        assert_eq!(
            doc.blocks[entry].kind,
            BlockKind::RefEntry {
                label: "smith".to_string(),
                number: 1,
            }
        );
        assert!(plain_text(&doc.blocks[entry]).contains("Smith, 2020"));

        // the inline reference is a [1] citation link
        let citation = doc.blocks[0]
            .inlines
            .iter()
            .find(|i| i.link.is_some())
            .unwrap();
        assert_eq!(citation.text, "[1]");
        let link = citation.link.as_ref().unwrap();
        assert!(link.is_citation());
        assert_eq!(*link, LinkTarget::Internal("ref-smith".to_string()));
    }

    #[test]
    fn test_reference_numbering_follows_first_use() {
        let src = "B first[^b], then A[^a], then B again[^b].\n\n[^a]: Entry A.\n[^b]: Entry B.\n";
        let doc = parse_document(src);
        let texts: Vec<String> = doc.blocks[0]
            .inlines
            .iter()
            .filter(|i| i.link.is_some())
            .map(|i| i.text.clone())
            .collect();
        assert_eq!(texts, vec!["[1]", "[2]", "[1]"]);

        // entries come out in first-use order with matching numbers
        let b = doc.block_for_anchor("ref-b").unwrap();
        let a = doc.block_for_anchor("ref-a").unwrap();
        assert!(b < a);
        assert_eq!(
            doc.blocks[b].kind,
            BlockKind::RefEntry {
                label: "b".to_string(),
                number: 1,
            }
        );
        assert_eq!(
            doc.blocks[a].kind,
            BlockKind::RefEntry {
                label: "a".to_string(),
                number: 2,
            }
        );
    }

    #[test]
    fn test_unreferenced_definition_listed_after_referenced() {
        let src = "Cited[^used].\n\n[^extra]: Never cited.\n[^used]: Cited entry.\n";
        let doc = parse_document(src);
        let used = doc.block_for_anchor("ref-used").unwrap();
        let extra = doc.block_for_anchor("ref-extra").unwrap();
        assert!(used < extra);
        assert_eq!(
            doc.blocks[extra].kind,
            BlockKind::RefEntry {
                label: "extra".to_string(),
                number: 2,
            }
        );
    }

    #[test]
    fn test_undefined_footnote_reference_resolves_nowhere() {
        let doc = parse_document("Dangling[^ghost].\n");
        assert_eq!(doc.block_for_anchor("ref-ghost"), None);
        assert_eq!(doc.reference_count(), 0);
        // the inline still renders as a citation
        let citation = doc.blocks[0]
            .inlines
            .iter()
            .find(|i| i.link.is_some())
            .unwrap();
        assert!(citation.link.as_ref().unwrap().is_citation());
    }

    #[test]
    fn test_explicit_citation_link() {
        let doc = parse_document("See [Smith 2020](#ref-smith2020) for details.\n");
        let link = doc.blocks[0]
            .inlines
            .iter()
            .find_map(|i| i.link.as_ref())
            .unwrap();
        assert!(link.is_citation());
        assert_eq!(*link, LinkTarget::Internal("ref-smith2020".to_string()));
    }

    #[test]
    fn test_plain_internal_link_is_not_citation() {
        let doc = parse_document("Back to [methods](#methods).\n");
        let link = doc.blocks[0]
            .inlines
            .iter()
            .find_map(|i| i.link.as_ref())
            .unwrap();
        assert!(!link.is_citation());
    }

    #[test]
    fn test_code_block_keeps_lang_and_text() {
        let doc = parse_document("```rust\nfn main() {}\n```\n");
        assert_eq!(
            doc.blocks[0].kind,
            BlockKind::Code {
                lang: "rust".to_string(),
                text: "fn main() {}\n".to_string(),
            }
        );
    }

    #[test]
    fn test_ordered_list_markers_count_up() {
        let doc = parse_document("1. one\n2. two\n3. three\n");
        let markers: Vec<String> = doc
            .blocks
            .iter()
            .filter_map(|b| match &b.kind {
                BlockKind::ListItem { marker, .. } => Some(marker.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec!["1. ", "2. ", "3. "]);
    }

    #[test]
    fn test_nested_list_indents() {
        let doc = parse_document("- outer\n  - inner\n");
        let indents: Vec<usize> = doc
            .blocks
            .iter()
            .filter_map(|b| match &b.kind {
                BlockKind::ListItem { indent, .. } => Some(*indent),
                _ => None,
            })
            .collect();
        assert_eq!(indents, vec![0, 1]);
    }

    #[test]
    fn test_blockquote_depth() {
        let doc = parse_document("> quoted text\n");
        assert_eq!(doc.blocks[0].kind, BlockKind::Quote { depth: 1 });
    }

    #[test]
    fn test_rule_block() {
        let doc = parse_document("above\n\n---\n\nbelow\n");
        assert_eq!(doc.blocks[1].kind, BlockKind::Rule);
    }

    #[test]
    fn test_strong_and_emphasis_styles() {
        let doc = parse_document("plain **bold** and *italic*\n");
        let bold = doc.blocks[0]
            .inlines
            .iter()
            .find(|i| i.text == "bold")
            .unwrap();
        assert!(bold.style.strong);
        let italic = doc.blocks[0]
            .inlines
            .iter()
            .find(|i| i.text == "italic")
            .unwrap();
        assert!(italic.style.emphasis);
    }
}

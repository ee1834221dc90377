mod layout;
mod parse;

pub use layout::Layout;
pub use parse::{parse_document, BlockKind, Document, LinkTarget, CITATION_PREFIX};

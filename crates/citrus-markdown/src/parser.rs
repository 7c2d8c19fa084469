//! Page source parser.

use pulldown_cmark::Options;

use crate::frontmatter::{extract_frontmatter, Frontmatter, FrontmatterError};

/// A parsed page source.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Parsed frontmatter (if present)
    pub frontmatter: Option<Frontmatter>,

    /// Markdown content (without frontmatter)
    pub content: String,
}

impl ParsedPage {
    /// Frontmatter, or the empty default.
    pub fn frontmatter(&self) -> Frontmatter {
        self.frontmatter.clone().unwrap_or_default()
    }
}

/// Errors that can occur when parsing a page.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),
}

/// CommonMark extensions enabled for every page.
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Parse a page source into its frontmatter and markdown body.
///
/// Directive code blocks stay in the body; the renderer resolves them.
pub fn parse_page(source: &str) -> Result<ParsedPage, ParseError> {
    let (frontmatter, content) = extract_frontmatter(source)?;

    Ok(ParsedPage {
        frontmatter,
        content: content.to_string(),
    })
}

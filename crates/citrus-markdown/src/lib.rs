//! Markdown page sources for citrus sites.
//!
//! A page is YAML frontmatter followed by CommonMark. Fenced code blocks can carry
//! directives (`live`, `style`, `scoped`) that a renderer turns into registrations.

pub mod codeblock;
pub mod frontmatter;
pub mod parser;

pub use codeblock::{extract_attribute, BlockMode, CodeBlock, Language};
pub use frontmatter::{Frontmatter, FrontmatterError};
pub use parser::{markdown_options, parse_page, ParseError, ParsedPage};

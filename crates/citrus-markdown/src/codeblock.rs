//! Code block directives.

/// Programming language of a code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    Tsx,
    Jsx,
    TypeScript,
    JavaScript,
    Css,
    Html,
    Json,
    #[default]
    Unknown,
}

impl Language {
    /// Parse language from code fence info string.
    pub fn from_info(info: &str) -> Self {
        let lang = info.split_whitespace().next().unwrap_or("");
        match lang.to_lowercase().as_str() {
            "tsx" => Self::Tsx,
            "jsx" => Self::Jsx,
            "ts" | "typescript" => Self::TypeScript,
            "js" | "javascript" => Self::JavaScript,
            "css" => Self::Css,
            "html" => Self::Html,
            "json" => Self::Json,
            _ => Self::Unknown,
        }
    }
}

/// What a code block does on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockMode {
    /// Mount point for a live component; the body holds JSON props
    Live,
    /// Stylesheet registered as a page asset
    Style,
    /// Stylesheet emitted by a scoped-style child
    Scoped,
    /// Plain highlighted source (default)
    #[default]
    Source,
}

impl BlockMode {
    /// Parse mode from the flags after the language in an info string.
    pub fn from_info(info: &str) -> Self {
        for flag in info.split_whitespace().skip(1) {
            match flag.to_lowercase().as_str() {
                "live" => return Self::Live,
                "style" => return Self::Style,
                "scoped" => return Self::Scoped,
                _ => {}
            }
        }
        Self::Source
    }
}

/// A fenced code block and its directive.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    /// Programming language
    pub language: Language,

    /// Directive
    pub mode: BlockMode,

    /// Block body
    pub source: String,

    /// Component module path from `src=...`
    pub src: Option<String>,
}

impl CodeBlock {
    /// Build a block from its fence info string and body.
    pub fn from_fence(info: &str, source: String) -> Self {
        Self {
            language: Language::from_info(info),
            mode: BlockMode::from_info(info),
            source,
            src: extract_attribute(info, "src"),
        }
    }

    /// Check if this block mounts a live component.
    pub fn is_live(&self) -> bool {
        self.mode == BlockMode::Live && self.src.is_some()
    }

    /// Check if this block is a registered stylesheet.
    pub fn is_style(&self) -> bool {
        self.mode == BlockMode::Style && self.language == Language::Css
    }

    /// Check if this block is a scoped stylesheet.
    pub fn is_scoped_style(&self) -> bool {
        self.mode == BlockMode::Scoped && self.language == Language::Css
    }
}

/// Extract `name="value"` or `name=value` from a code fence info string.
///
/// Only whole tokens match, so `xsrc=a.jsx` is not `src`. Quoted values may contain spaces.
pub fn extract_attribute(info: &str, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    let mut rest = info.trim_start();

    while !rest.is_empty() {
        if let Some(value) = rest.strip_prefix(&prefix) {
            let value = match value.strip_prefix('"') {
                Some(quoted) => quoted.split('"').next().unwrap_or_default(),
                None => value.split_whitespace().next().unwrap_or_default(),
            };
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
        rest = skip_token(rest).trim_start();
    }

    None
}

/// The remainder of `info` after its first token. Whitespace inside quotes does not end a token.
fn skip_token(info: &str) -> &str {
    let mut quoted = false;
    for (i, c) in info.char_indices() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => return &info[i..],
            _ => {}
        }
    }
    ""
}

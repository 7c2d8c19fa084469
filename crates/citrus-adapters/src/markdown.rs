//! Markdown page renderer.

use async_trait::async_trait;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Parser, Tag, TagEnd};

use citrus_core::{AssetId, Location, PageContext, RenderError, Rendered, Renderer};
use citrus_markdown::{markdown_options, CodeBlock, Frontmatter, ParsedPage};

/// Renders [`ParsedPage`]s to HTML.
///
/// Frontmatter goes to the head. Directive code blocks become registrations:
/// `live src=...` mounts a component, `css style` registers a stylesheet and
/// `css scoped` emits a style tag for extraction. Other blocks render as code.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Renderer for MarkdownRenderer {
    type Element = ParsedPage;

    fn is_reentrant(&self) -> bool {
        true
    }

    async fn render(
        &self,
        page: &ParsedPage,
        location: &Location,
        ctx: &mut PageContext,
    ) -> Result<Rendered, RenderError> {
        register_head(&page.frontmatter(), ctx);

        let events: Vec<Event<'_>> = Parser::new_ext(&page.content, markdown_options()).collect();
        let mut output: Vec<Event<'_>> = Vec::with_capacity(events.len());
        let mut style_tags = String::new();
        let mut directive: Option<(String, String)> = None; // (info, body)

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref info)))
                    if is_directive(info) =>
                {
                    directive = Some((info.to_string(), String::new()));
                }

                Event::Text(ref text) if directive.is_some() => {
                    if let Some((_, body)) = directive.as_mut() {
                        body.push_str(text);
                    }
                }

                Event::End(TagEnd::CodeBlock) if directive.is_some() => {
                    let Some((info, body)) = directive.take() else {
                        continue;
                    };
                    let block = CodeBlock::from_fence(&info, body);

                    if block.is_live() {
                        let src = block.src.as_deref().unwrap_or_default();
                        let id = ctx.register_live_component(src).await?;
                        let props = parse_props(src, &block.source)?;
                        output.push(Event::Html(CowStr::from(mount_point(&id, props.as_deref()))));
                    } else if block.is_style() {
                        ctx.register_styles(block.source);
                    } else if block.is_scoped_style() {
                        style_tags.push_str(&format!("<style>{}</style>", block.source));
                    }
                }

                other => output.push(other),
            }
        }

        let mut markup = String::new();
        html::push_html(&mut markup, output.into_iter());

        tracing::debug!("Rendered markdown page {}", location.url_path);
        Ok(Rendered::new(markup).with_style_tags(style_tags))
    }
}

fn is_directive(info: &str) -> bool {
    let block = CodeBlock::from_fence(info, String::new());
    block.is_live() || block.is_style() || block.is_scoped_style()
}

fn register_head(frontmatter: &Frontmatter, ctx: &mut PageContext) {
    if let Some(title) = &frontmatter.title {
        ctx.register_to_head(format!("<title>{}</title>", escape_html(title)));
    }
    if let Some(description) = &frontmatter.description {
        ctx.register_to_head(format!(
            "<meta name=\"description\" content=\"{}\">",
            escape_html(description)
        ));
    }
    for fragment in &frontmatter.head {
        ctx.register_to_head(fragment.clone());
    }
}

/// Validate a live block body and return compact props, or `None` when there are none.
fn parse_props(src: &str, body: &str) -> Result<Option<String>, RenderError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| RenderError::Element(format!("Invalid props for {}: {}", src, e)))?;

    match value {
        serde_json::Value::Object(map) if map.is_empty() => Ok(None),
        serde_json::Value::Object(_) => Ok(Some(value.to_string())),
        _ => Err(RenderError::Element(format!(
            "Props for {} must be a JSON object",
            src
        ))),
    }
}

fn mount_point(id: &AssetId, props: Option<&str>) -> String {
    match props {
        Some(props) => format!(
            "<div data-component-id=\"{}\" data-props=\"{}\"></div>",
            id,
            escape_html(props)
        ),
        None => format!("<div data-component-id=\"{}\"></div>", id),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

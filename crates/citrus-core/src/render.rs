//! Render port and the per-page registration context.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;

use async_trait::async_trait;

use crate::digest::{digest, AssetId};
use crate::fs::FileSystem;
use crate::path::Path;

/// Where the page being rendered lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Rooted URL path, e.g. `/docs/intro`
    pub url_path: String,
    /// URL segments, e.g. `["docs", "intro"]`
    pub segments: Vec<String>,
}

impl Location {
    /// Location of a page registered at `url`.
    pub fn new(url: &Path) -> Self {
        Self {
            url_path: format!("/{}", url.segments().join("/")),
            segments: url.segments().to_vec(),
        }
    }
}

/// Output of one render call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Body markup
    pub markup: String,
    /// `<style>` tags emitted by scoped-style children during the call
    pub style_tags: String,
}

impl Rendered {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            style_tags: String::new(),
        }
    }

    pub fn with_style_tags(mut self, style_tags: impl Into<String>) -> Self {
        self.style_tags = style_tags.into();
        self
    }
}

/// Errors raised while rendering a page.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to read live component {path}: {source}")]
    Component {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Render error: {0}")]
    Element(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Turns elements into markup.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Root element type of a page
    type Element: Send + Sync;

    /// Whether independent render calls may run at the same time.
    ///
    /// Non-reentrant renderers get one call at a time, in page registration order.
    fn is_reentrant(&self) -> bool {
        false
    }

    /// Render `element`, registering head fragments, live components and styles on `page`.
    async fn render(
        &self,
        element: &Self::Element,
        location: &Location,
        page: &mut PageContext,
    ) -> Result<Rendered, RenderError>;
}

/// Registration sink for a single render call.
///
/// A fresh context is created for every page and handed down through the render. Nothing
/// here is shared between pages; the orchestrator merges [`Registrations`] afterwards.
pub struct PageContext {
    fs: Arc<dyn FileSystem>,
    head: Vec<String>,
    assets: Vec<AssetId>,
    seen_assets: HashSet<AssetId>,
    component_ids: HashMap<String, AssetId>,
    components: Vec<(AssetId, Path)>,
    styles: Vec<(AssetId, String)>,
}

/// Everything a page registered during its render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registrations {
    /// Head fragments, concatenated in call order
    pub head: String,
    /// Asset ids in first-registration order, without duplicates
    pub assets: Vec<AssetId>,
    /// Live components, first source path per id
    pub components: Vec<(AssetId, Path)>,
    /// Stylesheets, one entry per id
    pub styles: Vec<(AssetId, String)>,
}

impl PageContext {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            head: Vec::new(),
            assets: Vec::new(),
            seen_assets: HashSet::new(),
            component_ids: HashMap::new(),
            components: Vec::new(),
            styles: Vec::new(),
        }
    }

    /// Append a markup fragment to the page head.
    pub fn register_to_head(&mut self, fragment: impl Into<String>) {
        self.head.push(fragment.into());
    }

    /// Register the component module at `source_path` and return its asset id.
    ///
    /// The id is the digest of the module's bytes, so equal sources on different pages
    /// share one asset. A path already registered on this page is not read again.
    pub async fn register_live_component(
        &mut self,
        source_path: &str,
    ) -> Result<AssetId, RenderError> {
        if let Some(id) = self.component_ids.get(source_path) {
            return Ok(id.clone());
        }

        let path = Path::from_native(source_path);
        let bytes = self
            .fs
            .read_file(&path)
            .await
            .map_err(|source| RenderError::Component {
                path: source_path.to_string(),
                source,
            })?;
        let id = digest(&bytes);

        if !self.components.iter().any(|(existing, _)| existing == &id) {
            self.components.push((id.clone(), path));
        }
        self.add_asset(&id);
        self.component_ids
            .insert(source_path.to_string(), id.clone());

        tracing::debug!("Registered live component {} as {}", source_path, id);
        Ok(id)
    }

    /// Register a stylesheet and return its asset id.
    pub fn register_styles(&mut self, css: impl Into<String>) -> AssetId {
        let css = css.into();
        let id = digest(&css);

        if !self.styles.iter().any(|(existing, _)| existing == &id) {
            self.styles.push((id.clone(), css));
        }
        self.add_asset(&id);

        id
    }

    /// Consume the context, returning what was registered.
    pub fn finish(self) -> Registrations {
        Registrations {
            head: self.head.concat(),
            assets: self.assets,
            components: self.components,
            styles: self.styles,
        }
    }

    fn add_asset(&mut self, id: &AssetId) {
        if self.seen_assets.insert(id.clone()) {
            self.assets.push(id.clone());
        }
    }
}

//! Build orchestrator.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::task::JoinSet;

use citrus_adapters::EsbuildBundler;
use citrus_core::{
    digest, AssetId, BundleError, Bundler, Bundles, Entrypoints, FileSystem, LocalFileSystem,
    Location, PageContext, Path, Registrations, RenderError, Renderer,
};

use crate::assets::{extract_style_fragments, hydration_wrapper, stylesheet_path, wrapper_path};
use crate::document::{asset_tags, render_document};

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildReport {
    /// Number of pages generated
    pub pages: usize,

    /// Number of distinct live components materialized
    pub components: usize,

    /// Number of distinct stylesheets materialized
    pub styles: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to render page {url}: {source}")]
    Render {
        url: String,
        #[source]
        source: RenderError,
    },

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Build task failed: {0}")]
    Task(String),
}

/// A rendered page waiting for its bundles.
#[derive(Debug, Clone)]
struct Page {
    id: AssetId,
    output_path: Path,
    head: String,
    assets: Vec<AssetId>,
    body: String,
}

/// Registered pages and raw files, built into a static output tree.
///
/// Pages render through `R`. Registered assets are deduplicated by content, bundled once
/// for the whole build, and linked from every page that registered them.
pub struct Application<R: Renderer> {
    renderer: Arc<R>,
    bundler: Arc<dyn Bundler>,
    fs: Arc<dyn FileSystem>,
    pages: Vec<(Path, Arc<R::Element>)>,
    files: Vec<(Path, Arc<Vec<u8>>)>,
}

impl<R> Application<R>
where
    R: Renderer + 'static,
{
    /// Create an application using the local file system and esbuild.
    pub fn new(renderer: R) -> Self {
        Self {
            renderer: Arc::new(renderer),
            bundler: Arc::new(EsbuildBundler::default()),
            fs: Arc::new(LocalFileSystem::new()),
            pages: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn with_bundler(mut self, bundler: Arc<dyn Bundler>) -> Self {
        self.bundler = bundler;
        self
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Register a page at `url`. Registering the same URL again replaces the element.
    pub fn page(&mut self, url: &str, element: R::Element) -> &mut Self {
        let path = Path::from_url(url);
        let element = Arc::new(element);

        match self.pages.iter_mut().find(|(existing, _)| *existing == path) {
            Some(entry) => entry.1 = element,
            None => self.pages.push((path, element)),
        }
        self
    }

    /// Register a raw file copied verbatim to `url`. The same URL again replaces the body.
    pub fn file(&mut self, url: &str, body: impl Into<Vec<u8>>) -> &mut Self {
        let path = Path::from_url(url);
        let body = Arc::new(body.into());

        match self.files.iter_mut().find(|(existing, _)| *existing == path) {
            Some(entry) => entry.1 = body,
            None => self.files.push((path, body)),
        }
        self
    }

    /// Register `value` as a compact JSON file.
    pub fn json<T: Serialize + ?Sized>(
        &mut self,
        url: &str,
        value: &T,
    ) -> Result<&mut Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(self.file(url, body))
    }

    /// Register `value` as a pretty-printed JSON file.
    pub fn json_pretty<T: Serialize + ?Sized>(
        &mut self,
        url: &str,
        value: &T,
    ) -> Result<&mut Self, serde_json::Error> {
        let body = serde_json::to_vec_pretty(value)?;
        Ok(self.file(url, body))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Build every registered page and file into `output_dir`.
    ///
    /// Stages run strictly one after another: prepare the output directory, write raw
    /// files, render pages, materialize assets, bundle once, write documents. The first
    /// failure aborts the build; files already written stay on disk.
    pub async fn build(
        &self,
        output_dir: impl AsRef<std::path::Path>,
    ) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let out = Path::from_native(output_dir.as_ref());

        self.fs.ensure_directory(&out).await?;

        self.write_files(&out).await?;

        let (pages, components, styles) = self.render_pages(&out).await?;
        tracing::info!(
            "Rendered {} pages ({} components, {} styles)",
            pages.len(),
            components.len(),
            styles.len()
        );

        let modules = self.materialize_assets(&out, &components, &styles).await?;

        let entrypoints = compute_entrypoints(&pages, &modules);
        let bundles = self.bundler.output_bundles(&entrypoints, &out).await?;

        self.write_documents(&pages, &bundles).await?;

        let duration = start.elapsed();
        tracing::info!("Built {} in {}ms", out, duration.as_millis());

        Ok(BuildReport {
            pages: pages.len(),
            components: components.len(),
            styles: styles.len(),
            duration_ms: duration.as_millis() as u64,
            output_dir: out.to_native(),
        })
    }

    /// Write raw files concurrently.
    async fn write_files(&self, out: &Path) -> Result<(), BuildError> {
        let mut tasks = JoinSet::new();

        for (url, body) in &self.files {
            let fs = Arc::clone(&self.fs);
            let target = out.join(url);
            let body = Arc::clone(body);

            tasks.spawn(async move {
                let mut reader: &[u8] = &body;
                fs.pipe_to_file(&target, &mut reader).await?;
                tracing::debug!("Wrote file {}", target);
                Ok::<_, io::Error>(())
            });
        }

        settle(tasks).await.map(|_| ())
    }

    /// Render every page and merge registrations into the asset tables.
    ///
    /// Registrations are merged in page registration order, so the first page to register
    /// an id owns its table entry no matter which render finished first.
    async fn render_pages(
        &self,
        out: &Path,
    ) -> Result<
        (
            Vec<Page>,
            BTreeMap<AssetId, Path>,
            BTreeMap<AssetId, String>,
        ),
        BuildError,
    > {
        let rendered = if self.renderer.is_reentrant() {
            self.render_concurrently(out).await?
        } else {
            let mut rendered = Vec::with_capacity(self.pages.len());
            for (url, element) in &self.pages {
                let fs = Arc::clone(&self.fs);
                rendered.push(render_page(&*self.renderer, fs, url, &**element, out).await?);
            }
            rendered
        };

        let mut pages = Vec::with_capacity(rendered.len());
        let mut components: BTreeMap<AssetId, Path> = BTreeMap::new();
        let mut styles: BTreeMap<AssetId, String> = BTreeMap::new();

        for (page, registrations) in rendered {
            for (id, source) in registrations.components {
                components.entry(id).or_insert(source);
            }
            for (id, css) in registrations.styles {
                styles.entry(id).or_insert(css);
            }
            pages.push(page);
        }

        Ok((pages, components, styles))
    }

    async fn render_concurrently(
        &self,
        out: &Path,
    ) -> Result<Vec<(Page, Registrations)>, BuildError> {
        let mut tasks = JoinSet::new();

        for (index, (url, element)) in self.pages.iter().enumerate() {
            let renderer = Arc::clone(&self.renderer);
            let fs = Arc::clone(&self.fs);
            let url = url.clone();
            let element = Arc::clone(element);
            let out = out.clone();

            tasks.spawn(async move {
                let rendered = render_page(&*renderer, fs, &url, &*element, &out).await?;
                Ok::<_, BuildError>((index, rendered))
            });
        }

        let mut rendered = settle(tasks).await?;
        rendered.sort_by_key(|(index, _)| *index);
        Ok(rendered.into_iter().map(|(_, page)| page).collect())
    }

    /// Write hydration wrappers and stylesheets concurrently.
    async fn materialize_assets(
        &self,
        out: &Path,
        components: &BTreeMap<AssetId, Path>,
        styles: &BTreeMap<AssetId, String>,
    ) -> Result<HashMap<AssetId, Path>, BuildError> {
        let mut tasks = JoinSet::new();

        for (id, source) in components {
            let module = source.to_absolute_native()?;
            let wrapper = hydration_wrapper(id, &module.to_string_lossy());
            let target = wrapper_path(out, id);
            let fs = Arc::clone(&self.fs);
            let id = id.clone();

            tasks.spawn(async move {
                fs.write_file(&target, wrapper.as_bytes()).await?;
                tracing::debug!("Materialized live component {} at {}", id, target);
                Ok::<_, io::Error>((id, target))
            });
        }

        for (id, css) in styles {
            let target = stylesheet_path(out, id);
            let css = css.clone();
            let fs = Arc::clone(&self.fs);
            let id = id.clone();

            tasks.spawn(async move {
                fs.write_file(&target, css.as_bytes()).await?;
                tracing::debug!("Materialized stylesheet {} at {}", id, target);
                Ok::<_, io::Error>((id, target))
            });
        }

        Ok(settle(tasks).await?.into_iter().collect())
    }

    /// Assemble and write every page document concurrently.
    async fn write_documents(&self, pages: &[Page], bundles: &Bundles) -> Result<(), BuildError> {
        let mut tasks = JoinSet::new();

        for page in pages {
            let assets = bundles.get(&page.id).map(Vec::as_slice).unwrap_or_default();
            let document = render_document(&page.head, &asset_tags(assets), &page.body);
            let target = page.output_path.clone();
            let fs = Arc::clone(&self.fs);

            tasks.spawn(async move {
                fs.write_file(&target, document.as_bytes()).await?;
                tracing::debug!("Wrote page {}", target);
                Ok::<_, io::Error>(())
            });
        }

        settle(tasks).await.map(|_| ())
    }
}

/// Render one page with a fresh registration context.
async fn render_page<R: Renderer>(
    renderer: &R,
    fs: Arc<dyn FileSystem>,
    url: &Path,
    element: &R::Element,
    out: &Path,
) -> Result<(Page, Registrations), BuildError> {
    let location = Location::new(url);
    let mut ctx = PageContext::new(fs);

    let rendered = renderer
        .render(element, &location, &mut ctx)
        .await
        .map_err(|source| BuildError::Render {
            url: location.url_path.clone(),
            source,
        })?;

    for css in extract_style_fragments(&rendered.style_tags) {
        ctx.register_styles(css);
    }

    let registrations = ctx.finish();
    let page = Page {
        id: digest(url.to_url_string()),
        output_path: out.join(url).join_segment("index.html"),
        head: registrations.head.clone(),
        assets: registrations.assets.clone(),
        body: rendered.markup,
    };

    tracing::debug!(
        "Rendered {} with {} assets",
        location.url_path,
        page.assets.len()
    );
    Ok((page, registrations))
}

/// Per page, the materialized modules of its assets in registration order.
fn compute_entrypoints(pages: &[Page], modules: &HashMap<AssetId, Path>) -> Entrypoints {
    pages
        .iter()
        .map(|page| {
            let paths = page
                .assets
                .iter()
                .filter_map(|id| modules.get(id).cloned())
                .collect();
            (page.id.clone(), paths)
        })
        .collect()
}

/// Wait for every task, then return all results or the first error.
async fn settle<T, E>(mut tasks: JoinSet<Result<T, E>>) -> Result<Vec<T>, BuildError>
where
    T: Send + 'static,
    E: Send + 'static,
    BuildError: From<E>,
{
    let mut results = Vec::with_capacity(tasks.len());
    let mut first_error: Option<BuildError> = None;

    while let Some(joined) = tasks.join_next().await {
        let error = match joined {
            Ok(Ok(value)) => {
                results.push(value);
                continue;
            }
            Ok(Err(e)) => BuildError::from(e),
            Err(e) => BuildError::Task(e.to_string()),
        };
        if first_error.is_none() {
            first_error = Some(error);
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use citrus_core::{MemoryFileSystem, Rendered};
    use tempfile::tempdir;

    /// Minimal element tree for exercising the registration protocol.
    #[derive(Debug, Clone)]
    enum Node {
        Element(&'static str, Vec<Node>),
        Text(&'static str),
        Head(Vec<Node>),
        Live(&'static str),
        Style(&'static str),
        Scoped(&'static str),
        Delayed(u64, Box<Node>),
    }

    fn div(children: Vec<Node>) -> Node {
        Node::Element("div", children)
    }

    #[derive(Default)]
    struct TestRenderer {
        reentrant: bool,
        finished: Arc<Mutex<Vec<String>>>,
    }

    fn render_node<'a>(
        node: &'a Node,
        ctx: &'a mut PageContext,
        sheet: &'a mut String,
    ) -> Pin<Box<dyn Future<Output = Result<String, RenderError>> + Send + 'a>> {
        Box::pin(async move {
            match node {
                Node::Element(tag, children) => {
                    let mut inner = String::new();
                    for child in children {
                        inner.push_str(&render_node(child, ctx, sheet).await?);
                    }
                    Ok(format!("<{tag}>{inner}</{tag}>"))
                }
                Node::Text(text) => Ok(text.to_string()),
                Node::Head(children) => {
                    let mut inner = String::new();
                    for child in children {
                        inner.push_str(&render_node(child, ctx, sheet).await?);
                    }
                    ctx.register_to_head(inner);
                    Ok(String::new())
                }
                Node::Live(source) => {
                    let id = ctx.register_live_component(source).await?;
                    Ok(format!("<div data-component-id=\"{id}\"></div>"))
                }
                Node::Style(css) => {
                    ctx.register_styles(*css);
                    Ok(String::new())
                }
                Node::Scoped(css) => {
                    sheet.push_str(&format!("<style data-styled=\"true\">{css}</style>"));
                    Ok(String::new())
                }
                Node::Delayed(millis, child) => {
                    tokio::time::sleep(Duration::from_millis(*millis)).await;
                    render_node(child, ctx, sheet).await
                }
            }
        })
    }

    #[async_trait]
    impl Renderer for TestRenderer {
        type Element = Node;

        fn is_reentrant(&self) -> bool {
            self.reentrant
        }

        async fn render(
            &self,
            element: &Node,
            location: &Location,
            page: &mut PageContext,
        ) -> Result<Rendered, RenderError> {
            let mut sheet = String::new();
            let markup = render_node(element, page, &mut sheet).await?;
            self.finished.lock().unwrap().push(location.url_path.clone());
            Ok(Rendered::new(markup).with_style_tags(sheet))
        }
    }

    #[derive(Default)]
    struct RecordingBundler {
        calls: Mutex<Vec<Entrypoints>>,
        outputs: Bundles,
        errors: Vec<String>,
    }

    impl RecordingBundler {
        fn calls(&self) -> Vec<Entrypoints> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Bundler for RecordingBundler {
        async fn output_bundles(
            &self,
            entrypoints: &Entrypoints,
            _output_dir: &Path,
        ) -> Result<Bundles, BundleError> {
            self.calls.lock().unwrap().push(entrypoints.clone());
            if self.errors.is_empty() {
                Ok(self.outputs.clone())
            } else {
                Err(BundleError::new(self.errors.clone()))
            }
        }
    }

    fn app(
        fs: &Arc<MemoryFileSystem>,
        bundler: &Arc<RecordingBundler>,
        reentrant: bool,
    ) -> Application<TestRenderer> {
        Application::new(TestRenderer {
            reentrant,
            ..Default::default()
        })
            .with_file_system(fs.clone())
            .with_bundler(bundler.clone())
    }

    fn out(path: &str) -> Path {
        Path::from_native(path)
    }

    #[tokio::test]
    async fn creates_an_empty_output_directory() {
        let fs = Arc::new(MemoryFileSystem::new());
        let bundler = Arc::new(RecordingBundler::default());

        let report = app(&fs, &bundler, false).build("build").await.unwrap();

        assert!(fs.has_directory(&out("build")));
        assert!(fs.written_paths().is_empty());
        assert_eq!(bundler.calls(), vec![Entrypoints::new()]);
        assert_eq!(report.pages, 0);
    }

    #[tokio::test]
    async fn creates_an_html_file_for_a_page() {
        let fs = Arc::new(MemoryFileSystem::new());
        let bundler = Arc::new(RecordingBundler::default());
        let mut app = app(&fs, &bundler, false);
        app.page("/my-page", div(vec![]));

        app.build("build").await.unwrap();

        assert_eq!(
            fs.file_string(&out("build/my-page/index.html")).as_deref(),
            Some("<!DOCTYPE html><html><head></head><body><div></div></body></html>")
        );
    }

    #[tokio::test]
    async fn can_add_elements_to_head() {
        let fs = Arc::new(MemoryFileSystem::new());
        let bundler = Arc::new(RecordingBundler::default());
        let mut app = app(&fs, &bundler, false);
        app.page(
            "/with-head",
            div(vec![
                Node::Head(vec![Node::Element("title", vec![Node::Text("Title")])]),
                Node::Text("body"),
            ]),
        );

        app.build("build").await.unwrap();

        assert_eq!(
            fs.file_string(&out("build/with-head/index.html")).as_deref(),
            Some(
                "<!DOCTYPE html><html><head><title>Title</title></head>\
                 <body><div>body</div></body></html>"
            )
        );
    }

    #[tokio::test]
    async fn bundles_live_components_once_across_pages() {
        let fs = Arc::new(
            MemoryFileSystem::new()
                .with_file(out("components/Counter.jsx"), "x")
                .with_file(out("copies/Counter.jsx"), "x"),
        );
        let bundler = Arc::new(RecordingBundler::default());
        let mut app = app(&fs, &bundler, false);
        app.page("/one", div(vec![Node::Live("components/Counter.jsx")]));
        app.page(
            "/two",
            div(vec![
                Node::Live("components/Counter.jsx"),
                Node::Live("components/Counter.jsx"),
            ]),
        );
        app.page("/three", div(vec![Node::Live("copies/Counter.jsx")]));

        let report = app.build("build").await.unwrap();

        let id = digest("x");
        let wrapper = out(&format!("build/.cache/{}.js", id));
        let wrappers: Vec<_> = fs
            .written_paths()
            .into_iter()
            .filter(|p| p.is_javascript())
            .collect();
        assert_eq!(wrappers, vec![wrapper.clone()]);
        assert_eq!(report.components, 1);

        // Only the first page to register the id decides the module source
        let source = fs.file_string(&wrapper).unwrap();
        assert!(source.contains("components/Counter.jsx"));
        assert!(!source.contains("copies"));

        let calls = bundler.calls();
        assert_eq!(calls.len(), 1);
        let entrypoints = &calls[0];
        assert_eq!(entrypoints.len(), 3);
        for page in ["one", "two", "three"] {
            assert_eq!(entrypoints[&digest(page)], vec![wrapper.clone()]);
        }
        assert_eq!(fs.reads(&out("components/Counter.jsx")), 2);
    }

    #[tokio::test]
    async fn materializes_registered_and_extracted_styles() {
        let fs = Arc::new(MemoryFileSystem::new());
        let bundler = Arc::new(RecordingBundler::default());
        let mut app = app(&fs, &bundler, false);
        app.page(
            "/styled",
            div(vec![Node::Style(".a { color: red; }"), Node::Scoped(".b { color: blue; }")]),
        );
        app.page("/also-styled", div(vec![Node::Scoped(".a { color: red; }")]));

        let report = app.build("build").await.unwrap();

        let red = digest(".a { color: red; }");
        let blue = digest(".b { color: blue; }");
        let red_path = out(&format!("build/.cache/{}.css", red));
        let blue_path = out(&format!("build/.cache/{}.css", blue));

        assert_eq!(report.styles, 2);
        assert_eq!(fs.file_string(&red_path).as_deref(), Some(".a { color: red; }"));
        assert_eq!(fs.file_string(&blue_path).as_deref(), Some(".b { color: blue; }"));

        let entrypoints = &bundler.calls()[0];
        let mut styled = entrypoints[&digest("styled")].clone();
        styled.sort();
        let mut expected = vec![red_path.clone(), blue_path];
        expected.sort();
        assert_eq!(styled, expected);
        assert_eq!(entrypoints[&digest("also-styled")], vec![red_path]);
    }

    #[tokio::test]
    async fn links_bundles_in_a_stable_order() {
        let fs = Arc::new(MemoryFileSystem::new());
        let mut outputs = Bundles::new();
        outputs.insert(
            digest("page"),
            vec![Path::from_url("b.css"), Path::from_url("a.js"), Path::from_url("a.js.map")],
        );
        let bundler = Arc::new(RecordingBundler {
            outputs,
            ..Default::default()
        });
        let mut app = app(&fs, &bundler, false);
        app.page("/page", div(vec![Node::Text("hi")]));
        app.page("/plain", div(vec![]));

        app.build("build").await.unwrap();

        assert_eq!(
            fs.file_string(&out("build/page/index.html")).as_deref(),
            Some(
                "<!DOCTYPE html><html><head>\
                 <script defer src=\"a.js\"></script><link rel=\"stylesheet\" href=\"b.css\">\
                 </head><body><div>hi</div></body></html>"
            )
        );
        let plain = fs.file_string(&out("build/plain/index.html")).unwrap();
        assert!(!plain.contains("<script"));
        assert!(!plain.contains("<link"));
    }

    #[tokio::test]
    async fn surfaces_every_bundle_error() {
        let fs = Arc::new(MemoryFileSystem::new());
        let bundler = Arc::new(RecordingBundler {
            errors: vec!["Module not found: react".to_string(), "Unexpected token".to_string()],
            ..Default::default()
        });
        let mut app = app(&fs, &bundler, false);
        app.page("/page", div(vec![]));

        let err = app.build("build").await.unwrap_err();

        match &err {
            BuildError::Bundle(bundle) => assert_eq!(bundle.errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        let message = err.to_string();
        assert!(message.contains("Module not found: react"));
        assert!(message.contains("Unexpected token"));
        assert!(fs.file(&out("build/page/index.html")).is_none());
    }

    #[tokio::test]
    async fn missing_component_aborts_the_build() {
        let fs = Arc::new(MemoryFileSystem::new());
        let bundler = Arc::new(RecordingBundler::default());
        let mut app = app(&fs, &bundler, false);
        app.file("/robots.txt", "User-agent: *");
        app.page("/broken", div(vec![Node::Live("components/Missing.jsx")]));

        let err = app.build("build").await.unwrap_err();

        match err {
            BuildError::Render { url, source } => {
                assert_eq!(url, "/broken");
                assert!(matches!(source, RenderError::Component { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(bundler.calls().is_empty());
        // Earlier stages are not rolled back
        assert!(fs.file(&out("build/robots.txt")).is_some());
    }

    #[tokio::test]
    async fn writes_raw_files_verbatim() {
        let fs = Arc::new(MemoryFileSystem::new());
        let bundler = Arc::new(RecordingBundler::default());
        let mut app = app(&fs, &bundler, false);
        app.file("/robots.txt", "User-agent: *");
        app.json("/api/site.json", &serde_json::json!({ "name": "citrus" }))
            .unwrap();
        app.file("/robots.txt", "User-agent: citrus");

        app.build("build").await.unwrap();

        assert_eq!(app.file_count(), 2);
        assert_eq!(
            fs.file_string(&out("build/robots.txt")).as_deref(),
            Some("User-agent: citrus")
        );
        assert_eq!(
            fs.file_string(&out("build/api/site.json")).as_deref(),
            Some("{\"name\":\"citrus\"}")
        );
    }

    #[tokio::test]
    async fn reregistering_a_page_replaces_it() {
        let fs = Arc::new(MemoryFileSystem::new());
        let bundler = Arc::new(RecordingBundler::default());
        let mut app = app(&fs, &bundler, false);
        app.page("/page", div(vec![Node::Text("old")]));
        app.page("page/", div(vec![Node::Text("new")]));

        app.build("build").await.unwrap();

        assert_eq!(app.page_count(), 1);
        let document = fs.file_string(&out("build/page/index.html")).unwrap();
        assert!(document.contains("<div>new</div>"));
    }

    #[tokio::test]
    async fn render_order_does_not_change_output() {
        type Site = (Vec<(Path, Option<String>)>, Vec<Entrypoints>, Vec<String>);

        async fn build_site(reentrant: bool) -> Site {
            let fs = Arc::new(
                MemoryFileSystem::new()
                    .with_file(out("components/A.jsx"), "a")
                    .with_file(out("components/B.jsx"), "b")
                    .with_file(out("copies/A.jsx"), "a"),
            );
            let bundler = Arc::new(RecordingBundler::default());
            let renderer = TestRenderer {
                reentrant,
                ..Default::default()
            };
            let finished = Arc::clone(&renderer.finished);
            let mut app = Application::new(renderer)
                .with_file_system(fs.clone())
                .with_bundler(bundler.clone());

            // Later pages render faster, so concurrent renders settle in reverse order
            for (url, delay, first, second) in [
                ("/x", 40, "components/A.jsx", "components/B.jsx"),
                ("/y", 20, "components/B.jsx", "components/A.jsx"),
                ("/z", 0, "copies/A.jsx", "copies/A.jsx"),
            ] {
                app.page(
                    url,
                    Node::Delayed(
                        delay,
                        Box::new(div(vec![
                            Node::Live(first),
                            Node::Scoped(".shared {}"),
                            Node::Live(second),
                        ])),
                    ),
                );
            }

            app.build("build").await.unwrap();

            let mut written = fs.written_paths();
            written.sort();
            written.dedup();
            let files = written
                .into_iter()
                .map(|p| {
                    let contents = fs.file_string(&p);
                    (p, contents)
                })
                .collect();
            let order = finished.lock().unwrap().clone();
            (files, bundler.calls(), order)
        }

        let (sequential, sequential_calls, sequential_order) = build_site(false).await;
        let (concurrent, concurrent_calls, concurrent_order) = build_site(true).await;

        assert_eq!(sequential_order, vec!["/x", "/y", "/z"]);
        assert_eq!(concurrent_order, vec!["/z", "/y", "/x"]);
        assert_eq!(sequential, concurrent);
        assert_eq!(sequential_calls, concurrent_calls);

        // The first registered page decides the module source, not the first to finish
        let wrapper = out(&format!("build/.cache/{}.js", digest("a")));
        let source = concurrent
            .iter()
            .find(|(path, _)| *path == wrapper)
            .and_then(|(_, contents)| contents.clone())
            .unwrap();
        assert!(source.contains("components/A.jsx"));
        assert!(!source.contains("copies"));
    }

    #[tokio::test]
    async fn builds_onto_the_local_file_system() {
        let temp = tempdir().unwrap();
        let dist = temp.path().join("dist");
        let bundler = Arc::new(RecordingBundler::default());

        let mut app = Application::new(TestRenderer::default()).with_bundler(bundler.clone());
        app.page("/", div(vec![Node::Text("home")]));
        app.page("/docs/intro", div(vec![Node::Style("p { margin: 0; }")]));
        app.file("/favicon.ico", vec![0u8, 1, 2]);

        let report = app.build(&dist).await.unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(report.output_dir, dist);
        assert_eq!(
            std::fs::read_to_string(dist.join("index.html")).unwrap(),
            "<!DOCTYPE html><html><head></head><body><div>home</div></body></html>"
        );
        assert!(dist.join("docs/intro/index.html").exists());
        assert_eq!(std::fs::read(dist.join("favicon.ico")).unwrap(), vec![0u8, 1, 2]);
        assert_eq!(
            std::fs::read_to_string(
                dist.join(".cache")
                    .join(format!("{}.css", digest("p { margin: 0; }")))
            )
            .unwrap(),
            "p { margin: 0; }"
        );
    }
}

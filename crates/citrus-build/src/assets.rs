//! Materialized asset sources.

use std::sync::LazyLock;

use regex::Regex;

use citrus_core::{AssetId, Path};

/// Directory under the output directory holding materialized assets.
pub const CACHE_DIR: &str = ".cache";

/// Where the hydration wrapper for a live component is written.
pub fn wrapper_path(output_dir: &Path, id: &AssetId) -> Path {
    output_dir
        .join_segment(CACHE_DIR)
        .join_segment(format!("{}.js", id))
}

/// Where a registered stylesheet is written.
pub fn stylesheet_path(output_dir: &Path, id: &AssetId) -> Path {
    output_dir
        .join_segment(CACHE_DIR)
        .join_segment(format!("{}.css", id))
}

/// Generate the client module that re-activates every mount of a live component.
///
/// Mount points are elements carrying `data-component-id="<id>"`. Props come from the
/// JSON in `data-props`, or `{}` when the attribute is absent. Mount points with server
/// markup are hydrated, empty ones are rendered into.
pub fn hydration_wrapper(id: &AssetId, component_module: &str) -> String {
    // serde_json gives a correctly escaped JS string literal
    let specifier = serde_json::Value::from(component_module).to_string();

    format!(
        r#"import React from 'react';
import {{ createRoot, hydrateRoot }} from 'react-dom/client';
import Component from {specifier};

const roots = document.querySelectorAll('[data-component-id="{id}"]');
for (const root of roots) {{
  const props = JSON.parse(root.getAttribute('data-props') || '{{}}');
  const element = React.createElement(Component, props);
  if (root.hasChildNodes()) {{
    hydrateRoot(root, element);
  }} else {{
    createRoot(root).render(element);
  }}
}}
"#
    )
}

static STYLE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style[^>]*>(.*?)</style>").expect("valid style tag pattern")
});

/// CSS bodies of every `<style>` tag in `markup`, in order.
pub fn extract_style_fragments(markup: &str) -> Vec<String> {
    STYLE_TAG
        .captures_iter(markup)
        .map(|c| c[1].to_string())
        .collect()
}

//! Final HTML document assembly.

use citrus_core::Path;

/// Tag that includes a bundled file, or `None` for files a page does not reference.
pub fn asset_tag(path: &Path) -> Option<String> {
    if path.is_javascript() {
        Some(format!(
            "<script defer src=\"{}\"></script>",
            path.to_url_string()
        ))
    } else if path.is_css() {
        Some(format!(
            "<link rel=\"stylesheet\" href=\"{}\">",
            path.to_url_string()
        ))
    } else {
        None
    }
}

/// Include tags for `paths`, independent of input order.
///
/// Scripts come before stylesheets; tags of the same kind are sorted lexicographically.
pub fn asset_tags(paths: &[Path]) -> String {
    let mut scripts: Vec<String> = Vec::new();
    let mut stylesheets: Vec<String> = Vec::new();

    for path in paths {
        if let Some(tag) = asset_tag(path) {
            if path.is_javascript() {
                scripts.push(tag);
            } else {
                stylesheets.push(tag);
            }
        }
    }

    scripts.sort();
    stylesheets.sort();
    scripts.concat() + &stylesheets.concat()
}

/// Assemble a complete HTML document.
pub fn render_document(head: &str, asset_tags: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head>{}{}</head><body>{}</body></html>",
        head, asset_tags, body
    )
}

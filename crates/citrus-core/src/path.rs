//! Immutable, value-equal paths.
//!
//! A [`Path`] is a list of segments plus an absolute flag. The same value is used for
//! URL paths (page routes, bundle hrefs) and native file system paths; only the factory
//! differs. Two paths built from the same text are always equal.

use std::fmt;
use std::io;
use std::path::{Component, PathBuf, MAIN_SEPARATOR_STR};

/// A path made of string segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
    absolute: bool,
}

impl Path {
    /// Build a path from native file system text.
    ///
    /// Absoluteness follows the host platform's rules. `.` components are dropped and
    /// `..` components are kept as segments.
    pub fn from_native(path: impl AsRef<std::path::Path>) -> Self {
        let path = path.as_ref();
        let mut segments = Vec::new();

        for component in path.components() {
            match component {
                Component::Prefix(prefix) => {
                    segments.push(prefix.as_os_str().to_string_lossy().into_owned())
                }
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir => segments.push("..".to_string()),
                Component::Normal(segment) => {
                    segments.push(segment.to_string_lossy().into_owned())
                }
            }
        }

        Self {
            segments,
            absolute: path.is_absolute(),
        }
    }

    /// Build a relative path from URL text, dropping empty segments.
    ///
    /// `"/my-page/"`, `"my-page"` and `"//my-page"` all produce the same value.
    pub fn from_url(url: &str) -> Self {
        Self {
            segments: url
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            absolute: false,
        }
    }

    /// The same segments, marked absolute.
    ///
    /// For URL paths this means site-root-relative: `to_url_string` gains a leading `/`.
    pub fn rooted(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            absolute: true,
        }
    }

    /// Append `other` to this path. An absolute `other` is returned unchanged.
    pub fn join(&self, other: &Path) -> Self {
        if other.absolute {
            return other.clone();
        }

        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());

        Self {
            segments,
            absolute: self.absolute,
        }
    }

    /// Append a single segment.
    pub fn join_segment(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());

        Self {
            segments,
            absolute: self.absolute,
        }
    }

    /// The parent path. The parent of an empty path is itself.
    pub fn dirname(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();

        Self {
            segments,
            absolute: self.absolute,
        }
    }

    /// Last segment, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Whether the last segment ends with `suffix`. Empty paths never match.
    pub fn extension_is(&self, suffix: &str) -> bool {
        self.file_name()
            .map(|name| name.ends_with(suffix))
            .unwrap_or(false)
    }

    pub fn is_javascript(&self) -> bool {
        self.extension_is(".js")
    }

    pub fn is_css(&self) -> bool {
        self.extension_is(".css")
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Segments joined with `/`; absolute paths get a leading `/`.
    pub fn to_url_string(&self) -> String {
        let joined = self.segments.join("/");
        if self.absolute {
            format!("/{}", joined)
        } else {
            joined
        }
    }

    /// Native form, using the platform separator.
    ///
    /// A leading drive or UNC prefix segment is placed before the root.
    pub fn to_native(&self) -> PathBuf {
        let mut segments = self.segments.iter().peekable();
        let mut native = PathBuf::new();

        if let Some(prefix) = segments.next_if(|s| is_prefix(s)) {
            native.push(prefix);
        }
        if self.absolute {
            native.push(MAIN_SEPARATOR_STR);
        }
        for segment in segments {
            native.push(segment);
        }

        native
    }

    /// Native form resolved against the current working directory.
    pub fn to_absolute_native(&self) -> io::Result<PathBuf> {
        std::path::absolute(self.to_native())
    }
}

fn is_prefix(segment: &str) -> bool {
    matches!(
        std::path::Path::new(segment).components().next(),
        Some(Component::Prefix(_))
    )
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_native().display())
    }
}

//! Content types of served files, by file extension.

use mime::Mime;
use std::collections::HashMap;
use std::path::Path;

/// Decides the `Content-Type` of a file from its name.
pub trait ContentTypeResolver: Send + Sync {
    fn resolve(&self, path: &Path) -> Mime;
}

const DEFAULT_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("mjs", "text/javascript"),
    ("json", "application/json"),
    ("jsonld", "application/ld+json"),
    ("map", "application/json"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("xml", "application/xml"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("toml", "application/toml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("webp", "image/webp"),
    ("avif", "image/avif"),
    ("mp3", "audio/mpeg"),
    ("ogg", "audio/ogg"),
    ("wav", "audio/wav"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("otf", "font/otf"),
    ("eot", "application/vnd.ms-fontobject"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("tar", "application/x-tar"),
    ("7z", "application/x-7z-compressed"),
    ("rar", "application/x-rar-compressed"),
    ("wasm", "application/wasm"),
    ("manifest", "application/manifest+json"),
    ("webmanifest", "application/manifest+json"),
    ("rs", "text/rust"),
    ("py", "text/python"),
];

/// A lookup table from lower-case extension to media type.
///
/// Unknown extensions, and files without one, resolve to `application/octet-stream`.
#[derive(Debug, Clone)]
pub struct ExtensionTable {
    types: HashMap<String, Mime>,
}

impl Default for ExtensionTable {
    fn default() -> Self {
        let types = DEFAULT_TYPES
            .iter()
            .filter_map(|(extension, media_type)| media_type.parse().ok().map(|mime| ((*extension).to_owned(), mime)))
            .collect();
        Self { types }
    }
}

impl ExtensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the media type of `extension`.
    #[must_use]
    pub fn with(mut self, extension: &str, media_type: Mime) -> Self {
        self.types.insert(extension.to_ascii_lowercase(), media_type);
        self
    }
}

impl ContentTypeResolver for ExtensionTable {
    fn resolve(&self, path: &Path) -> Mime {
        extension(path)
            .and_then(|extension| self.types.get(&extension.to_ascii_lowercase()))
            .cloned()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
    }
}

/// Unlike [`Path::extension`], a dot file such as `.html` has extension `html`.
fn extension(path: &Path) -> Option<&str> {
    let (_, extension) = path.file_name()?.to_str()?.rsplit_once('.')?;
    Some(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        let table = ExtensionTable::new();
        assert_eq!(table.resolve(Path::new("pages/index.html")), mime::TEXT_HTML);
        assert_eq!(table.resolve(Path::new("pages/app/.js")), mime::TEXT_JAVASCRIPT);
        assert_eq!(table.resolve(Path::new("logo.PNG")), mime::IMAGE_PNG);
        assert_eq!(table.resolve(Path::new("module.wasm")).essence_str(), "application/wasm");
    }

    #[test]
    fn unknown_falls_back_to_octet_stream() {
        let table = ExtensionTable::new();
        assert_eq!(table.resolve(Path::new("archive.xyz")), mime::APPLICATION_OCTET_STREAM);
        assert_eq!(table.resolve(Path::new("Makefile")), mime::APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn overrides() {
        let table = ExtensionTable::new().with("JS", mime::APPLICATION_JAVASCRIPT).with("csv", mime::TEXT_CSV);
        assert_eq!(table.resolve(Path::new("app.js")), mime::APPLICATION_JAVASCRIPT);
        assert_eq!(table.resolve(Path::new("data.csv")), mime::TEXT_CSV);
    }
}

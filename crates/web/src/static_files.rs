//! Pages served from the page root.
//!
//! A `GET` for URL path `P` whose last segment has extension `E` (`html` when it has none)
//! is looked up, in order, as
//!
//! 1. `<root>P/.E`, the directory form: `/about` is served from `pages/about/.html`
//! 2. `<root>P.E`, the flat form: `/about` is served from `pages/about.html`
//! 3. `<root>/index.E`, unless the index fallback is disabled
//!
//! Paths with `.` or `..` segments never resolve to a file.

use crate::content_type::ContentTypeResolver;
use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Where pages and error pages are read from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageStore: Send + Sync {
    async fn is_file(&self, path: &Path) -> bool;

    async fn read(&self, path: &Path) -> io::Result<Bytes>;
}

/// The local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsPageStore;

#[async_trait]
impl PageStore for FsPageStore {
    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok_and(|metadata| metadata.is_file())
    }

    async fn read(&self, path: &Path) -> io::Result<Bytes> {
        tokio::fs::read(path).await.map(Bytes::from)
    }
}

fn is_plain_segment(segment: &str) -> bool {
    segment != "." && segment != ".." && !segment.contains(['\\', '\0'])
}

/// The files that may serve `url_path`, most specific first.
pub fn page_candidates(root: &Path, url_path: &str, index_fallback: bool) -> Vec<PathBuf> {
    let segments = url_path.split('/').filter(|segment| !segment.is_empty()).collect::<Vec<_>>();
    if !segments.iter().all(|segment| is_plain_segment(segment)) {
        return Vec::new();
    }

    let (parents, stem, extension) = match segments.split_last() {
        Some((last, parents)) => match last.rsplit_once('.') {
            Some((stem, extension)) => (parents, stem, extension.to_ascii_lowercase()),
            None => (parents, *last, "html".to_owned()),
        },
        None => (&[][..], "", "html".to_owned()),
    };

    let parent = parents.iter().fold(root.to_path_buf(), |path, segment| path.join(segment));
    let mut candidates = vec![parent.join(stem).join(format!(".{extension}"))];

    if !stem.is_empty() {
        candidates.push(parent.join(format!("{stem}.{extension}")));
    }
    if index_fallback {
        let index = root.join(format!("index.{extension}"));
        if !candidates.contains(&index) {
            candidates.push(index);
        }
    }
    candidates
}

/// `relative` placed under `root`; `None` when it would leave the root.
pub fn resolve_under(root: &Path, relative: &Path) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

/// Page lookup and loading, bound to one page root.
#[derive(Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index_fallback: bool,
    store: Arc<dyn PageStore>,
    content_types: Arc<dyn ContentTypeResolver>,
}

impl std::fmt::Debug for StaticFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticFiles").field("root", &self.root).field("index_fallback", &self.index_fallback).finish_non_exhaustive()
    }
}

impl StaticFiles {
    pub fn new(
        root: impl Into<PathBuf>,
        index_fallback: bool,
        store: Arc<dyn PageStore>,
        content_types: Arc<dyn ContentTypeResolver>,
    ) -> Self {
        Self { root: root.into(), index_fallback, store, content_types }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &Arc<dyn PageStore> {
        &self.store
    }

    /// The page serving `url_path`, following the lookup order above.
    pub async fn find_page(&self, url_path: &str) -> Option<PathBuf> {
        self.first_file(page_candidates(&self.root, url_path, self.index_fallback)).await
    }

    /// The file behind a static route target or a served file: the target itself, or for a
    /// directory its `.html` or `index.html`.
    pub async fn find_target(&self, target: &Path) -> Option<PathBuf> {
        let resolved = resolve_under(&self.root, target)?;
        let candidates = vec![resolved.join(".html"), resolved.join("index.html")];
        self.first_file(std::iter::once(resolved).chain(candidates)).await
    }

    /// Reads `path` and resolves its content type.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the file can't be read.
    pub async fn load(&self, path: &Path) -> io::Result<(Bytes, Mime)> {
        let content = self.store.read(path).await?;
        Ok((content, self.content_types.resolve(path)))
    }

    async fn first_file(&self, candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
        for candidate in candidates {
            if self.store.is_file(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }
}

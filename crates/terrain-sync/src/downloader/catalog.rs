//! Target catalog
//!
//! The catalog is built once per asset set from the server's directory
//! listing and is read-only afterwards. `enumerate` is pure.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

use crate::downloader::core::{AssetKind, DownloadError, DownloadTarget, HttpClient, Result};

static HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r#"href="([^"]+)""#).expect("static regex"));

/// One family of assets: where it is listed and where it lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSet {
    pub kind: AssetKind,
    pub base_url: Url,
    pub destination: PathBuf,
}

impl AssetSet {
    pub fn new<P: Into<PathBuf>>(kind: AssetKind, base_url: Url, destination: P) -> Self {
        Self {
            kind,
            base_url,
            destination: destination.into(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }
}

/// Ordered, duplicate-free set of download targets
#[derive(Debug, Clone, Default)]
pub struct TargetCatalog {
    targets: Vec<DownloadTarget>,
}

impl TargetCatalog {
    /// Build a catalog, rejecting two targets that share a local path
    pub fn new(targets: Vec<DownloadTarget>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(targets.len());
        for target in &targets {
            if !seen.insert(target.local_path.as_path()) {
                return Err(DownloadError::DuplicateTarget {
                    path: target.local_path.clone(),
                });
            }
        }
        Ok(Self { targets })
    }

    /// Map listing file names onto the set's base URL and destination
    pub fn from_listing<I, S>(set: &AssetSet, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut targets = Vec::new();
        for name in names {
            let name = name.as_ref();
            if !is_plain_file_name(name) {
                warn!("[{}] ignoring listing entry outside the destination: {}", set.label(), name);
                continue;
            }
            let remote = set.base_url.join(name).map_err(|source| DownloadError::InvalidUrl {
                url: format!("{}{}", set.base_url, name),
                source,
            })?;
            targets.push(DownloadTarget::new(remote.to_string(), set.destination.join(name), set.kind));
        }
        Self::new(targets)
    }

    pub fn enumerate(&self) -> &[DownloadTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Fetch the set's directory listing and build its catalog
///
/// A listing that cannot be fetched is an error for the whole set.
pub async fn fetch_catalog(client: &HttpClient, set: &AssetSet) -> Result<TargetCatalog> {
    let html = client.fetch_text(set.base_url.as_str()).await?;
    let names = parse_filenames(&html, Some(&[set.kind.extension()]));
    debug!("[{}] listing has {} matching entries", set.label(), names.len());
    TargetCatalog::from_listing(set, names)
}

/// Extract linked file names from an HTML directory listing
///
/// Parent/current directory links, sub-directories and sort links (`?C=N`)
/// are dropped. With `extensions`, only names ending in one of them
/// (case-insensitively) are kept. The result is sorted and de-duplicated.
pub fn parse_filenames(html: &str, extensions: Option<&[&str]>) -> Vec<String> {
    let files: BTreeSet<String> = HREF
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|name| !matches!(*name, "../" | "./"))
        .filter(|name| !name.ends_with('/') && !name.starts_with('?'))
        .filter(|name| {
            extensions.is_none_or(|exts| {
                let lower = name.to_lowercase();
                exts.iter().any(|ext| lower.ends_with(&ext.to_lowercase()))
            })
        })
        .map(str::to_string)
        .collect();

    files.into_iter().collect()
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['?', '#'])
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body><h1>Index of /Tacview_Textures</h1>
        <a href="?C=N;O=D">Name</a>
        <a href="../">Parent Directory</a>
        <a href="./">.</a>
        <a href="old/">old/</a>
        <a href="tile_b.webp">tile_b.webp</a>
        <a href="tile_a.WEBP">tile_a.WEBP</a>
        <a href="tile_b.webp">tile_b.webp</a>
        <a href="readme.txt">readme.txt</a>
        <a href="N45E006.srtm">N45E006.srtm</a>
        </body></html>
    "#;

    fn texture_set() -> AssetSet {
        AssetSet::new(
            AssetKind::Texture,
            Url::parse("http://localhost/Tacview_Textures/").unwrap(),
            "/data/textures",
        )
    }

    #[test]
    fn parse_filenames_filters_and_sorts() {
        let names = parse_filenames(LISTING, Some(&[".webp"]));
        assert_eq!(names, vec!["tile_a.WEBP", "tile_b.webp"]);
    }

    #[test]
    fn parse_filenames_without_filter_keeps_all_files() {
        let names = parse_filenames(LISTING, None);
        assert_eq!(names, vec!["N45E006.srtm", "readme.txt", "tile_a.WEBP", "tile_b.webp"]);
    }

    #[test]
    fn parse_filenames_on_empty_listing() {
        assert!(parse_filenames("<html></html>", Some(&[".srtm"])).is_empty());
    }

    #[test]
    fn from_listing_joins_urls_and_paths() {
        let catalog = TargetCatalog::from_listing(&texture_set(), ["a.webp", "b.webp"]).unwrap();
        let targets = catalog.enumerate();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].remote_identifier, "http://localhost/Tacview_Textures/a.webp");
        assert_eq!(targets[0].local_path, PathBuf::from("/data/textures/a.webp"));
        assert_eq!(targets[1].kind, AssetKind::Texture);
    }

    #[test]
    fn from_listing_skips_entries_that_escape_the_destination() {
        let catalog =
            TargetCatalog::from_listing(&texture_set(), ["../evil.webp", "/etc/passwd.webp", "ok.webp"]).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.enumerate()[0].file_name(), "ok.webp");
    }

    #[test]
    fn duplicate_local_paths_are_rejected() {
        let targets = vec![
            DownloadTarget::new("http://a/x.webp", "/data/x.webp", AssetKind::Texture),
            DownloadTarget::new("http://b/x.webp", "/data/x.webp", AssetKind::Texture),
        ];
        match TargetCatalog::new(targets) {
            Err(DownloadError::DuplicateTarget { path }) => assert_eq!(path, PathBuf::from("/data/x.webp")),
            other => panic!("Expected DuplicateTarget, got {other:?}"),
        }
    }

    #[test]
    fn enumerate_is_repeatable() {
        let catalog = TargetCatalog::from_listing(&texture_set(), ["a.webp", "b.webp"]).unwrap();
        assert_eq!(catalog.enumerate(), catalog.enumerate());
    }
}

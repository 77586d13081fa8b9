//! Manga catalog: authored series metadata reconciled with the content tree.

mod builder;
mod model;

pub use builder::{
    PAGE_EXTENSIONS, build_chapters, chapter_number, compare_pages, default_title, first_number,
    is_chapter_dir_name, is_page_file, merge_chapter, page_url,
};
pub use model::{
    Catalog, Chapter, ChapterList, ChapterMeta, MangaIndex, ScannedChapter, Series, SeriesMeta,
};

use crate::config::Config;
use crate::error::Result;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Read the base metadata file.
pub fn load_index(path: &Path) -> Result<MangaIndex> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Chapter list for one authored series.
///
/// A series without an id has no content directory and keeps its declared
/// chapters.
pub fn series_chapters(
    meta: &SeriesMeta,
    content_root: &Path,
    url_prefix: &str,
) -> Result<ChapterList> {
    match meta.id.as_deref() {
        Some(id) if !id.is_empty() => build_chapters(content_root, id, url_prefix, &meta.chapters),
        _ => Ok(ChapterList::Declared(meta.chapters.clone())),
    }
}

/// Build a single series.
pub fn build_series(meta: SeriesMeta, content_root: &Path, url_prefix: &str) -> Result<Series> {
    let chapters = series_chapters(&meta, content_root, url_prefix)?;
    Ok(Series::from_meta(meta, chapters))
}

/// Build every series in the index, preserving index order.
///
/// Series are built in parallel. The first series that fails fails the
/// whole catalog.
pub fn build_catalog(index: MangaIndex, content_root: &Path, url_prefix: &str) -> Result<Catalog> {
    let series = index
        .series
        .into_par_iter()
        .map(|meta| {
            let chapters = series_chapters(&meta, content_root, url_prefix).inspect_err(|e| {
                tracing::error!(
                    series = meta.id.as_deref().unwrap_or_default(),
                    error = %e,
                    "Failed to build chapters"
                );
            })?;
            Ok(Series::from_meta(meta, chapters))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Catalog {
        series,
        extra: index.extra,
    })
}

/// Where the catalog comes from.
#[derive(Debug, Clone)]
pub struct CatalogSource {
    /// Base metadata file (`manga.json`).
    pub index_path: PathBuf,
    /// Directory holding one subdirectory per series.
    pub content_root: PathBuf,
    /// URL prefix the content root is served under.
    pub url_prefix: String,
}

impl CatalogSource {
    /// Catalog locations from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            index_path: config.storage.index_path(),
            content_root: config.storage.content_dir.clone(),
            url_prefix: config.storage.content_mount(),
        }
    }

    /// Load the index and build the full catalog.
    pub fn load(&self) -> Result<Catalog> {
        let start = std::time::Instant::now();
        let index = load_index(&self.index_path)?;
        let catalog = build_catalog(index, &self.content_root, &self.url_prefix)?;

        tracing::debug!(
            series = catalog.series.len(),
            elapsed = ?start.elapsed(),
            "Catalog built"
        );
        Ok(catalog)
    }

    /// Load the index and build one series, if it is listed.
    pub fn load_series(&self, series_id: &str) -> Result<Option<Series>> {
        let index = load_index(&self.index_path)?;
        index
            .series
            .into_iter()
            .find(|s| s.id.as_deref() == Some(series_id))
            .map(|meta| build_series(meta, &self.content_root, &self.url_prefix))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_index(dir: &Path, value: serde_json::Value) -> PathBuf {
        let path = dir.join("manga.json");
        std::fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_catalog_merges_and_keeps_unknown_fields() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        std::fs::create_dir_all(content.join("alpha/ch2")).unwrap();
        std::fs::create_dir_all(content.join("alpha/ch1")).unwrap();
        std::fs::write(content.join("alpha/ch1/1.png"), b"x").unwrap();

        let index_path = write_index(
            tmp.path(),
            json!({
                "site": "Shelf",
                "series": [
                    {
                        "id": "alpha",
                        "name": "Alpha",
                        "genres": ["action"],
                        "chapters": [{ "id": "ch2", "title": "The Second" }]
                    },
                    {
                        "id": "remote",
                        "name": "Remote",
                        "chapters": [{ "id": "ch1", "pages": ["https://cdn/1.png"] }]
                    },
                    { "name": "No Id" }
                ]
            }),
        );

        let source = CatalogSource {
            index_path,
            content_root: content,
            url_prefix: "/content/manga".to_string(),
        };
        let value = serde_json::to_value(source.load().unwrap()).unwrap();

        assert_eq!(value["site"], "Shelf");
        assert_eq!(value["series"][0]["genres"], json!(["action"]));
        assert_eq!(
            value["series"][0]["chapters"],
            json!([
                { "id": "ch1", "title": "Chapter 1", "pages": ["/content/manga/alpha/ch1/1.png"] },
                { "id": "ch2", "title": "The Second", "pages": [] }
            ])
        );
        assert_eq!(
            value["series"][1]["chapters"],
            json!([{ "id": "ch1", "pages": ["https://cdn/1.png"] }])
        );
        assert_eq!(value["series"][2]["chapters"], json!([]));
    }

    #[test]
    fn test_load_single_series() {
        let tmp = TempDir::new().unwrap();
        let index_path = write_index(
            tmp.path(),
            json!({ "series": [{ "id": "a", "chapters": [] }, { "id": "b", "chapters": [] }] }),
        );
        let source = CatalogSource {
            index_path,
            content_root: tmp.path().join("content"),
            url_prefix: "/content/manga".to_string(),
        };

        let series = source.load_series("b").unwrap().unwrap();
        assert_eq!(series.id.as_deref(), Some("b"));
        assert!(series.chapters.is_empty());
        assert!(source.load_series("zzz").unwrap().is_none());
    }

    #[test]
    fn test_missing_index_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let source = CatalogSource {
            index_path: tmp.path().join("missing.json"),
            content_root: tmp.path().to_path_buf(),
            url_prefix: "/content/manga".to_string(),
        };
        assert!(source.load().is_err());
    }
}

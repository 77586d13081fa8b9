//! Series and chapter records.
//!
//! `*Meta` types are the hand-authored base metadata read from `manga.json`.
//! Their counterparts without the suffix are what the catalog endpoint serves.
//! Fields this crate does not know about are carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Hand-authored chapter entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterMeta {
    /// Chapter id, matching the chapter directory name.
    pub id: String,

    /// Custom title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Externally hosted page URLs, for series without on-disk content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<String>>,

    /// Any other authored fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChapterMeta {
    /// Minimal entry with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            pages: None,
            extra: Map::new(),
        }
    }

    /// Set the custom title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Chapter discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedChapter {
    /// Directory name.
    pub id: String,
    /// Ordered page URLs.
    pub pages: Vec<String>,
}

/// Chapter as served: scanned pages merged with authored metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Chapter id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Ordered page URLs.
    pub pages: Vec<String>,
    /// Authored fields carried over from the base entry.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Chapter list of a series.
///
/// `Declared` is the authored list returned untouched when the series has no
/// content directory. `Scanned` is the merged list built from disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChapterList {
    /// Authored chapters, unchanged.
    Declared(Vec<ChapterMeta>),
    /// Chapters built from the content directory.
    Scanned(Vec<Chapter>),
}

impl ChapterList {
    /// Number of chapters.
    pub fn len(&self) -> usize {
        match self {
            ChapterList::Declared(c) => c.len(),
            ChapterList::Scanned(c) => c.len(),
        }
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Chapter ids in order.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            ChapterList::Declared(c) => c.iter().map(|c| c.id.as_str()).collect(),
            ChapterList::Scanned(c) => c.iter().map(|c| c.id.as_str()).collect(),
        }
    }
}

/// Hand-authored series entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMeta {
    /// Series id, also the content directory name. May be absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Synopsis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Cover image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,

    /// Authored chapters.
    #[serde(default)]
    pub chapters: Vec<ChapterMeta>,

    /// Any other authored fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Series as served.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    /// Series id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Synopsis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cover image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    /// Chapter list.
    pub chapters: ChapterList,
    /// Authored fields carried over.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Series {
    /// Attach a chapter list to authored series metadata.
    pub fn from_meta(meta: SeriesMeta, chapters: ChapterList) -> Self {
        Self {
            id: meta.id,
            name: meta.name,
            author: meta.author,
            description: meta.description,
            cover: meta.cover,
            chapters,
            extra: meta.extra,
        }
    }
}

/// Contents of the base metadata file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MangaIndex {
    /// Authored series.
    #[serde(default)]
    pub series: Vec<SeriesMeta>,

    /// Other top-level fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MangaIndex {
    /// Find a series by id.
    pub fn find(&self, series_id: &str) -> Option<&SeriesMeta> {
        self.series
            .iter()
            .find(|s| s.id.as_deref() == Some(series_id))
    }
}

/// Full catalog payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    /// Series with their chapter lists.
    pub series: Vec<Series>,
    /// Other top-level fields from the index.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

//! Filesystem-to-catalog reconciliation.
//!
//! Content lives under `<content_root>/<series_id>/<chapter_dir>/<page>`.
//! A chapter directory is any immediate subdirectory whose name starts with
//! `ch` (any case) followed by a digit. Pages are the image files directly
//! inside it, excluding `cover.*`. Nothing is cached: every call walks the
//! tree again.

use super::model::{Chapter, ChapterList, ChapterMeta, ScannedChapter};
use crate::error::Result;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

/// Extensions accepted as pages, compared case-insensitively.
pub const PAGE_EXTENSIONS: [&str; 5] = [".png", ".jpg", ".jpeg", ".webp", ".gif"];

/// Build the chapter list for one series.
///
/// Returns the authored list unchanged when `<content_root>/<series_id>` is
/// missing or not a directory. Once the directory is known to exist, any
/// error while listing it or its chapters is returned to the caller.
pub fn build_chapters(
    content_root: &Path,
    series_id: &str,
    url_prefix: &str,
    base: &[ChapterMeta],
) -> Result<ChapterList> {
    let series_dir = content_root.join(series_id);
    match std::fs::metadata(&series_dir) {
        Ok(meta) if meta.is_dir() => {}
        _ => {
            tracing::debug!(series = series_id, "No content directory, using declared chapters");
            return Ok(ChapterList::Declared(base.to_vec()));
        }
    }

    let mut base_by_id: HashMap<&str, &ChapterMeta> =
        base.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut chapters = Vec::new();
    for chapter_id in chapter_dirs(&series_dir)? {
        let pages = page_files(&series_dir.join(&chapter_id))?
            .into_iter()
            .map(|file| page_url(url_prefix, series_id, &chapter_id, &file))
            .collect();

        let base_entry = base_by_id.remove(chapter_id.as_str());
        chapters.push(merge_chapter(
            ScannedChapter {
                id: chapter_id,
                pages,
            },
            base_entry,
        ));
    }

    // Stable sort: equal numbers keep discovery (name) order
    chapters.sort_by_key(|c| chapter_number(&c.id).unwrap_or(0));

    tracing::debug!(
        series = series_id,
        chapters = chapters.len(),
        dropped = base_by_id.len(),
        "Built chapter list"
    );

    Ok(ChapterList::Scanned(chapters))
}

/// Merge a scanned chapter with its authored entry.
///
/// `id` and `pages` always come from the scan. `title` comes from the
/// authored entry when present and non-empty, otherwise `Chapter <N>`.
/// Every other authored field is kept.
pub fn merge_chapter(scanned: ScannedChapter, base: Option<&ChapterMeta>) -> Chapter {
    let title = base
        .and_then(|b| b.title.as_deref())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_title(&scanned.id));

    Chapter {
        id: scanned.id,
        title,
        pages: scanned.pages,
        extra: base.map(|b| b.extra.clone()).unwrap_or_default(),
    }
}

/// `Chapter <N>`, or the raw id when it has no digits.
pub fn default_title(chapter_id: &str) -> String {
    match chapter_number(chapter_id) {
        Some(n) => format!("Chapter {}", n),
        None => chapter_id.to_string(),
    }
}

/// Numeric value of a chapter id: all of its digits, read as one number.
///
/// `ch02` is 2, `Ch10-extra` is 10. Values past `u64::MAX` saturate.
pub fn chapter_number(chapter_id: &str) -> Option<u64> {
    let digits: String = chapter_id.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse().unwrap_or(u64::MAX))
}

/// First run of digits in a filename.
pub fn first_number(name: &str) -> Option<u64> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let rest = &name[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(rest[..end].parse().unwrap_or(u64::MAX))
}

/// Page order: first number ascending, names without digits last, then name.
pub fn compare_pages(a: &str, b: &str) -> Ordering {
    let key = |name: &str| match first_number(name) {
        Some(n) => (0u8, n),
        None => (1u8, 0),
    };
    key(a).cmp(&key(b)).then_with(|| a.cmp(b))
}

/// `ch` followed by at least one digit, case-insensitive.
pub fn is_chapter_dir_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 3 && bytes[..2].eq_ignore_ascii_case(b"ch") && bytes[2].is_ascii_digit()
}

/// Image file that is not the chapter cover.
pub fn is_page_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    !lower.starts_with("cover.") && PAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Public URL of a page.
pub fn page_url(url_prefix: &str, series_id: &str, chapter_id: &str, file: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        url_prefix.trim_end_matches('/'),
        series_id,
        chapter_id,
        file
    )
}

/// Chapter directory names inside a series directory, in name order.
fn chapter_dirs(series_dir: &Path) -> Result<Vec<String>> {
    let mut ids = Vec::new();

    for entry in WalkDir::new(series_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            tracing::warn!(path = %entry.path().display(), "Skipping non UTF-8 directory name");
            continue;
        };

        if is_chapter_dir_name(name) {
            ids.push(name.to_string());
        }
    }

    Ok(ids)
}

/// Page filenames inside a chapter directory, in page order.
fn page_files(chapter_dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(chapter_dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        match entry.file_name().to_str() {
            Some(name) if is_page_file(name) => files.push(name.to_string()),
            Some(_) => {}
            None => {
                tracing::warn!(path = %entry.path().display(), "Skipping non UTF-8 file name");
            }
        }
    }

    files.sort_by(|a, b| compare_pages(a, b));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PREFIX: &str = "/content/manga";

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"img").unwrap();
    }

    fn scanned(list: ChapterList) -> Vec<Chapter> {
        match list {
            ChapterList::Scanned(c) => c,
            ChapterList::Declared(_) => panic!("expected scanned chapters"),
        }
    }

    #[test]
    fn test_missing_series_returns_declared() {
        let root = TempDir::new().unwrap();
        let base = vec![
            ChapterMeta::new("ch1").with_title("Remote"),
            ChapterMeta::new("ch2"),
        ];

        let list = build_chapters(root.path(), "absent", PREFIX, &base).unwrap();
        assert_eq!(list, ChapterList::Declared(base));
    }

    #[test]
    fn test_series_path_is_a_file() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "solo");
        let base = vec![ChapterMeta::new("ch1")];

        let list = build_chapters(root.path(), "solo", PREFIX, &base).unwrap();
        assert_eq!(list, ChapterList::Declared(base));
    }

    #[test]
    fn test_pages_sorted_and_cover_excluded() {
        let root = TempDir::new().unwrap();
        for f in ["page2.png", "page10.png", "page1.png", "cover.jpg"] {
            touch(root.path(), &format!("demo/ch1/{}", f));
        }

        let chapters = scanned(build_chapters(root.path(), "demo", PREFIX, &[]).unwrap());
        assert_eq!(chapters.len(), 1);
        assert_eq!(
            chapters[0].pages,
            vec![
                "/content/manga/demo/ch1/page1.png",
                "/content/manga/demo/ch1/page2.png",
                "/content/manga/demo/ch1/page10.png",
            ]
        );
    }

    #[test]
    fn test_non_image_and_nested_entries_ignored() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "demo/ch1/01.JPG");
        touch(root.path(), "demo/ch1/notes.txt");
        touch(root.path(), "demo/ch1/COVER.png");
        touch(root.path(), "demo/ch1/extras/02.png");
        touch(root.path(), "demo/readme.md");
        touch(root.path(), "demo/specials/01.png");

        let chapters = scanned(build_chapters(root.path(), "demo", PREFIX, &[]).unwrap());
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].pages, vec!["/content/manga/demo/ch1/01.JPG"]);
    }

    #[test]
    fn test_files_without_digits_sort_last() {
        let root = TempDir::new().unwrap();
        for f in ["bonus_extra.png", "p3.webp", "a.gif", "p20.jpeg"] {
            touch(root.path(), &format!("demo/ch1/{}", f));
        }

        let chapters = scanned(build_chapters(root.path(), "demo", PREFIX, &[]).unwrap());
        let names: Vec<&str> = chapters[0]
            .pages
            .iter()
            .map(|p| p.rsplit('/').next().unwrap())
            .collect();
        assert_eq!(names, vec!["p3.webp", "p20.jpeg", "a.gif", "bonus_extra.png"]);
    }

    #[test]
    fn test_chapters_sorted_numerically() {
        let root = TempDir::new().unwrap();
        for dir in ["ch10", "ch2", "Ch1-intro", "ch03", "chapter1", "extras"] {
            fs::create_dir_all(root.path().join("demo").join(dir)).unwrap();
        }

        let list = build_chapters(root.path(), "demo", PREFIX, &[]).unwrap();
        assert_eq!(list.ids(), vec!["Ch1-intro", "ch2", "ch03", "ch10"]);

        let chapters = scanned(list);
        assert!(chapters.iter().all(|c| c.pages.is_empty()));
        assert_eq!(chapters[2].title, "Chapter 3");
    }

    #[test]
    fn test_custom_title_preserved() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "demo/ch3/1.png");
        touch(root.path(), "demo/ch3/2.png");

        let mut base = ChapterMeta::new("ch3").with_title("Custom Title");
        base.pages = Some(vec!["https://cdn.example/old.png".to_string()]);
        base.extra
            .insert("releaseDate".to_string(), serde_json::json!("2024-05-01"));

        let chapters = scanned(build_chapters(root.path(), "demo", PREFIX, &[base]).unwrap());
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].id, "ch3");
        assert_eq!(chapters[0].title, "Custom Title");
        assert_eq!(
            chapters[0].pages,
            vec!["/content/manga/demo/ch3/1.png", "/content/manga/demo/ch3/2.png"]
        );
        assert_eq!(chapters[0].extra["releaseDate"], "2024-05-01");
    }

    #[test]
    fn test_default_title_and_dropped_base_entries() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "demo/ch5/1.png");
        touch(root.path(), "demo/ch6/1.png");
        let base = vec![ChapterMeta::new("ch6").with_title(""), ChapterMeta::new("ch9")];

        let chapters = scanned(build_chapters(root.path(), "demo", PREFIX, &base).unwrap());
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].id, "ch5");
        assert_eq!(chapters[0].title, "Chapter 5");
        assert_eq!(chapters[0].pages, vec!["/content/manga/demo/ch5/1.png"]);
        assert_eq!(chapters[1].title, "Chapter 6");
    }

    #[test]
    fn test_build_is_deterministic() {
        let root = TempDir::new().unwrap();
        for ch in ["ch1", "ch2", "ch11"] {
            for f in ["010.png", "9.png", "x.png", "img1.jpg", "img01.jpg"] {
                touch(root.path(), &format!("demo/{}/{}", ch, f));
            }
        }

        let first = build_chapters(root.path(), "demo", PREFIX, &[]).unwrap();
        for _ in 0..5 {
            assert_eq!(build_chapters(root.path(), "demo", PREFIX, &[]).unwrap(), first);
        }

        let pages = &scanned(first)[0].pages;
        let names: Vec<&str> = pages.iter().map(|p| p.rsplit('/').next().unwrap()).collect();
        assert_eq!(names, vec!["img01.jpg", "img1.jpg", "9.png", "010.png", "x.png"]);
    }

    #[test]
    fn test_chapter_number() {
        assert_eq!(chapter_number("ch1"), Some(1));
        assert_eq!(chapter_number("ch02"), Some(2));
        assert_eq!(chapter_number("Ch10-extra"), Some(10));
        assert_eq!(chapter_number("special"), None);
        assert_eq!(default_title("special"), "special");
        assert_eq!(default_title("ch007"), "Chapter 7");
    }

    #[test]
    fn test_name_predicates() {
        assert!(is_chapter_dir_name("ch1"));
        assert!(is_chapter_dir_name("CH12b"));
        assert!(!is_chapter_dir_name("ch"));
        assert!(!is_chapter_dir_name("chapter1"));
        assert!(!is_chapter_dir_name("xch1"));

        assert!(is_page_file("01.PNG"));
        assert!(is_page_file("page.jpeg"));
        assert!(!is_page_file("cover.webp"));
        assert!(!is_page_file("Cover.PNG"));
        assert!(is_page_file("covers.png"));
        assert!(!is_page_file("page.bmp"));
    }

    #[test]
    fn test_compare_pages() {
        assert_eq!(compare_pages("page2.png", "page10.png"), Ordering::Less);
        assert_eq!(compare_pages("zzz.png", "page999.png"), Ordering::Greater);
        assert_eq!(compare_pages("a1.png", "b1.png"), Ordering::Less);
        assert_eq!(first_number("vol2_page15.png"), Some(2));
        assert_eq!(first_number("none.png"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_chapter_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "alpha/ch1/1.png");
        touch(tmp.path(), "alpha/ch2/1.png");
        let chapter = tmp.path().join("alpha/ch1");
        fs::set_permissions(&chapter, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not stop root
        let readable = fs::read_dir(&chapter).is_ok();
        let result = build_chapters(
            tmp.path(),
            "alpha",
            PREFIX,
            &[ChapterMeta::new("ch2").with_title("Declared")],
        );
        fs::set_permissions(&chapter, fs::Permissions::from_mode(0o755)).unwrap();

        if !readable {
            assert!(matches!(result, Err(crate::error::AppError::Walk(_))));
        }
    }
}

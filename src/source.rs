use crate::logging;
use crate::normalize::normalize_text;
use crate::position::PositionStore;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Shown in place of the novel text when the file cannot be read.
pub const READ_FAILURE_NOTICE: &str = "（读取失败：请确认小说文件存在且为 UTF-8 文本）";

/// One entry of the novel catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Novel {
    /// Stable context key; also the position-record suffix.
    pub key: String,
    pub name: String,
    pub file: PathBuf,
}

impl Novel {
    /// Catalog entry for a file given on the command line.
    pub fn from_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            key: stem.clone(),
            name: stem,
            file: path.to_path_buf(),
        }
    }
}

/// Configured novels first, then command-line files whose key is not taken.
pub fn catalog_from(configured: &[Novel], files: &[PathBuf]) -> Vec<Novel> {
    let mut catalog = configured.to_vec();
    for path in files {
        let novel = Novel::from_path(path);
        if catalog.iter().any(|n| n.key == novel.key) {
            logging::warn(format!(
                "skipping {}: novel key {:?} already in the catalog",
                path.display(),
                novel.key
            ));
            continue;
        }
        catalog.push(novel);
    }
    catalog
}

/// Pick the novel to open: the explicit request, else the last active one,
/// else the first catalog entry. Unknown keys fall through. The choice is
/// recorded as the last active novel.
pub fn resolve_novel<'a>(
    requested: Option<&str>,
    store: &PositionStore,
    catalog: &'a [Novel],
) -> Option<&'a Novel> {
    let find = |key: &str| catalog.iter().find(|n| n.key == key);

    let resolved = requested
        .and_then(|key| {
            let found = find(key);
            if found.is_none() {
                logging::warn(format!("unknown novel {:?}", key));
            }
            found
        })
        .or_else(|| store.last_active().as_deref().and_then(find))
        .or_else(|| catalog.first())?;

    store.set_last_active(&resolved.key);
    Some(resolved)
}

/// Read a novel file. A read failure yields the failure notice as content.
pub fn load_novel_text(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            logging::warn(format!("could not read {}: {}", path.display(), err));
            READ_FAILURE_NOTICE.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// Ids of the `*.txt` files in a chapter directory, sorted. A missing
/// directory has no chapters.
pub fn list_chapter_ids(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir).wrap_err_with(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "txt")
            && let Some(stem) = path.file_stem()
        {
            ids.push(stem.to_string_lossy().into_owned());
        }
    }
    ids.sort();
    Ok(ids)
}

/// Load one chapter. The first line is the title; the rest is the body.
pub fn read_chapter(dir: &Path, id: &str) -> Result<Chapter> {
    let path = dir.join(format!("{}.txt", id));
    let raw = fs::read_to_string(&path).wrap_err_with(|| format!("reading {}", path.display()))?;
    Ok(parse_chapter(id, &raw))
}

pub fn parse_chapter(id: &str, raw: &str) -> Chapter {
    let text = normalize_text(raw);
    let (first, rest) = text.split_once('\n').unwrap_or((&text, ""));
    let title = match first.trim() {
        "" => format!("第 {} 章", id),
        title => title.to_string(),
    };
    Chapter {
        id: id.to_string(),
        title,
        content: rest.trim().to_string(),
    }
}

/// Previous and next chapter ids around `id`.
pub fn neighbours<'a>(ids: &'a [String], id: &str) -> (Option<&'a str>, Option<&'a str>) {
    let Some(index) = ids.iter().position(|i| i == id) else {
        return (None, None);
    };
    let prev = index.checked_sub(1).map(|i| ids[i].as_str());
    let next = ids.get(index + 1).map(String::as_str);
    (prev, next)
}

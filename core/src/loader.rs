use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Extensions read as UTF-8 text.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];
/// Extensions accepted in the data directory but without a text extractor here.
pub const SKIPPED_EXTENSIONS: &[&str] = &["pdf", "docx"];

pub fn is_supported(file_name: &str) -> bool {
    extension(Path::new(file_name))
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()) || SKIPPED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|s| s.to_str()).map(str::to_lowercase)
}

fn read_document(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path.display()))
}

/// Read the documents at the top level of `dir`, keyed by file name.
///
/// Files that cannot be read are skipped with a warning and the rest still load.
/// A missing directory yields no documents.
pub fn load_dir<P: AsRef<Path>>(dir: P) -> BTreeMap<String, String> {
    let dir = dir.as_ref();
    let mut documents = BTreeMap::new();
    if !dir.is_dir() {
        tracing::info!(dir = %dir.display(), "no data directory found");
        return documents;
    }

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(%err, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|s| s.to_str()).map(str::to_string) else { continue };

        match extension(path).as_deref() {
            Some(ext) if TEXT_EXTENSIONS.contains(&ext) => match read_document(path) {
                Ok(text) => {
                    tracing::debug!(%name, bytes = text.len(), "loaded text document");
                    documents.insert(name, text);
                }
                Err(err) => {
                    let reason = format!("{err:#}");
                    tracing::warn!(%name, %reason, "skipping document");
                }
            },
            Some(ext) if SKIPPED_EXTENSIONS.contains(&ext) => {
                tracing::warn!(%name, "skipping document: no text extractor for this format");
            }
            _ => {}
        }
    }

    tracing::info!(dir = %dir.display(), documents = documents.len(), "loaded documents");
    documents
}

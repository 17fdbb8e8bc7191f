//! Loading the lyrics corpus and relevance judgments from disk.
//!
//! Layout: `<root>/<artist>/<title>.txt`, labelled `"artist/title"`. Artist
//! directories and files are visited in file-name order so document ids are
//! reproducible.

use crate::eval::Judgments;
use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use walkdir::WalkDir;

/// Read every `<artist>/<title>.txt` under `root` as `(label, text)`.
pub fn load_corpus<P: AsRef<Path>>(root: P) -> Result<Vec<(String, String)>> {
    let root = root.as_ref();
    if !root.is_dir() {
        bail!("corpus root {} is not a directory", root.display());
    }

    let mut docs = Vec::new();
    for entry in WalkDir::new(root).min_depth(2).max_depth(2).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|s| s.to_str()) != Some("txt") {
            continue;
        }
        let (Some(artist), Some(title)) = (
            path.parent().and_then(|p| p.file_name()).and_then(|s| s.to_str()),
            path.file_stem().and_then(|s| s.to_str()),
        ) else {
            tracing::warn!(path = %path.display(), "skipping file with non UTF-8 name");
            continue;
        };
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        docs.push((format!("{artist}/{title}"), text));
    }
    tracing::info!(root = %root.display(), num_docs = docs.len(), "corpus loaded");
    Ok(docs)
}

/// Parse a JSON object mapping query text to relevant document labels.
pub fn load_judgments<P: AsRef<Path>>(path: P) -> Result<Judgments> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let judgments: Judgments =
        serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parsing {}", path.display()))?;
    Ok(judgments)
}

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::run_exiftool;

/// An immutable snapshot of one photo's metadata: group-qualified tag name
/// (e.g. `MakerNotes:TimeZone`) mapped to its string rendering.
///
/// Records are produced once per batch by [`read_metadata`]; fixes only ever
/// read from them and propose new values as patches.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    tags: BTreeMap<String, String>,
}

impl Metadata {
    /// Build a record from `(tag, value)` pairs.
    pub fn from_tags<I, K, V>(tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a tag value. Returns `None` for absent and empty values alike,
    /// so callers never have to distinguish "missing" from "blank".
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Iterate over all tags in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Read all metadata for a batch of photos in one exiftool call.
///
/// Returns exactly one [`Metadata`] record per input path, in input order
/// (`exiftool -G -json` emits one JSON object per argument, in argument
/// order). A count mismatch means the engine contract was broken and is
/// reported as an error rather than silently zipped short.
pub fn read_metadata(photos: &[PathBuf]) -> Result<Vec<Metadata>> {
    if photos.is_empty() {
        return Ok(Vec::new());
    }

    let mut args: Vec<&Path> = vec![Path::new("-G"), Path::new("-json")];
    args.extend(photos.iter().map(PathBuf::as_path));

    let output = run_exiftool(args)?;
    parse_metadata_output(&output, photos.len())
}

/// Parse `exiftool -G -json` output into per-photo records.
fn parse_metadata_output(json: &str, expected: usize) -> Result<Vec<Metadata>> {
    let documents: Vec<serde_json::Map<String, Value>> =
        serde_json::from_str(json).context("Failed to parse exiftool JSON output")?;

    if documents.len() != expected {
        bail!(
            "exiftool returned {} record(s) for {expected} photo(s)",
            documents.len()
        );
    }

    let records = documents
        .into_iter()
        .map(|doc| {
            Metadata::from_tags(
                doc.into_iter()
                    .filter(|(key, _)| key != "SourceFile")
                    .map(|(key, value)| (key, value_to_string(&value))),
            )
        })
        .collect();

    Ok(records)
}

/// Render an exiftool JSON value as the string form fixes operate on.
/// exiftool emits numbers and arrays for some tags even though the tag
/// model here is string-valued.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

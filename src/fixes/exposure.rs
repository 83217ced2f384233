use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::path::Path;

use super::{Fix, Patch};
use crate::exif::Metadata;

/// Exposure targets below this distance from the current value are treated
/// as already applied, so re-runs don't produce no-op writes.
const EXPOSURE_TOLERANCE: f64 = 1e-5;

/// Bare filename → target exposure-compensation value (in stops), loaded
/// from a two-column CSV record file. Read-only for the duration of one run.
#[derive(Debug, Clone, Default)]
pub struct ExposureMap {
    entries: BTreeMap<String, f64>,
}

impl ExposureMap {
    /// Load the map from a `filename,value` record file. A missing file is
    /// a fatal configuration error, as is any malformed record.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!(
                "Exposure compensation configuration file not found: {}",
                path.display()
            );
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut entries = BTreeMap::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((filename, value)) = line.split_once(',') else {
                bail!("Malformed exposure record on line {}: {line:?}", index + 1);
            };
            let value: f64 = value.trim().parse().with_context(|| {
                format!("Invalid exposure value on line {}: {line:?}", index + 1)
            })?;
            entries.insert(filename.trim().to_string(), value);
        }

        Ok(Self { entries })
    }

    /// Build a map directly from entries (primarily for tests).
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Target value for a bare filename.
    pub fn get(&self, filename: &str) -> Option<f64> {
        self.entries.get(filename).copied()
    }

    /// All filenames in the map, in name order.
    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Apply an externally supplied exposure-compensation correction, keyed by
/// bare filename. Post-processing can deliberately alter effective exposure;
/// the record file states what the compensation field should end up as.
pub struct ExposureCompensationFix {
    map: ExposureMap,
}

impl ExposureCompensationFix {
    pub fn new(map: ExposureMap) -> Self {
        Self { map }
    }
}

impl Fix for ExposureCompensationFix {
    fn description(&self) -> &'static str {
        "Set exposure compensation based on the postprocessing done"
    }

    fn apply(&self, photo: &Path, metadata: &Metadata) -> Result<Patch> {
        let Some(target) = photo
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| self.map.get(name))
        else {
            return Ok(Patch::new());
        };

        let current = metadata
            .get("EXIF:ExposureCompensation")
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0);

        if (target - current).abs() < EXPOSURE_TOLERANCE {
            return Ok(Patch::new());
        }

        log::info!(
            "Setting exposure compensation for {} to {target}",
            photo.display()
        );

        Ok(Patch::from([(
            "EXIF:ExposureCompensation".to_string(),
            target.to_string(),
        )]))
    }
}

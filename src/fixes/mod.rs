//! The correction rules ("fixes") and their catalog.
//!
//! A fix inspects one photo's [`Metadata`] record and proposes tag
//! assignments as a [`Patch`]; it never writes anything itself. The
//! pipeline merges the patches of all fixes for a photo and issues at most
//! one write. Catalog order matters: when two fixes propose different
//! values for the same tag, the later fix wins.

mod exposure;
mod hardware;
mod timezone;

pub use exposure::{ExposureCompensationFix, ExposureMap};
pub use hardware::{BodyNameFix, Lens35mmEquivalentFix, LensModelFix};
pub use timezone::TimezoneFix;

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::Config;
use crate::exif::Metadata;

/// Tag assignments proposed by a fix for one photo, not yet persisted.
pub type Patch = BTreeMap<String, String>;

/// A single correction rule.
///
/// Implementations are stateless per run apart from their own configuration
/// (e.g. the exposure map) and must not touch the filesystem: `apply` reads
/// the record, optionally logs what it decided, and returns a patch. An
/// empty patch means "nothing to correct for this photo". An `Err` is a
/// fatal input problem that aborts the batch (e.g. a daylight-saving flag
/// that is not a recognizable boolean).
pub trait Fix {
    /// Short human-readable explanation of what this fix corrects.
    fn description(&self) -> &'static str;

    /// Compute the tag assignments this fix proposes for one photo.
    fn apply(&self, photo: &Path, metadata: &Metadata) -> Result<Patch>;
}

/// Instantiate the fix catalog for one run, honoring the config toggles.
///
/// The order here is part of the contract (last fix wins on tag conflicts):
/// timezone, body name, lens model, lens 35mm equivalent, exposure
/// compensation. The exposure fix only joins the catalog when a map was
/// loaded for this run.
pub fn build_fix_catalog(config: &Config, exposure: Option<ExposureMap>) -> Vec<Box<dyn Fix>> {
    let mut fixes: Vec<Box<dyn Fix>> = Vec::new();

    if config.fixes.timezone {
        fixes.push(Box::new(TimezoneFix));
    }
    if config.fixes.body_name {
        fixes.push(Box::new(BodyNameFix));
    }
    if config.fixes.lens_model {
        fixes.push(Box::new(LensModelFix));
    }
    if config.fixes.lens_35mm {
        fixes.push(Box::new(Lens35mmEquivalentFix));
    }
    if config.fixes.exposure {
        if let Some(map) = exposure {
            fixes.push(Box::new(ExposureCompensationFix::new(map)));
        }
    }

    for fix in &fixes {
        log::debug!("Fix enabled: {}", fix.description());
    }

    fixes
}

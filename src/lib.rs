//! # exif-maker-notes
//!
//! Corrects gaps and inconsistencies in photo EXIF metadata using the
//! vendor maker notes: timezone offsets, lens make/model, 35mm-equivalent
//! focal lengths, camera body names, and post-processing exposure
//! compensation. Metadata I/O is delegated to `exiftool`, which must be on
//! the PATH.
//!
//! ## Quick Start
//!
//! The pipeline module drives the whole flow — one bulk metadata read,
//! per-photo patch assembly from the fix catalog, and at most one write per
//! photo:
//!
//! ```rust,no_run
//! use exif_maker_notes::config::Config;
//! use exif_maker_notes::pipeline::{apply_fixes, collect_photos, FixOptions};
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let photos = collect_photos(&[PathBuf::from("./photos")]);
//!
//!     let options = FixOptions {
//!         dry_run: true,
//!         exposure: Some(PathBuf::from("exposure.csv")),
//!         strict: false,
//!     };
//!
//!     for outcome in apply_fixes(&photos, &config, &options)? {
//!         if !outcome.patch.is_empty() {
//!             println!("{}: {} tag(s) to fix", outcome.path.display(), outcome.patch.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Idempotence
//!
//! The first write to a photo leaves exiftool's `<name>_original` backup
//! next to it. Photos carrying that marker are excluded from later runs, so
//! re-running `fix` over a corrected batch issues no writes, and `restore`
//! can always revert to the untouched file.
//!
//! ## Modules
//!
//! - [`config`] — persisted per-fix toggles and the strict boolean parser
//! - [`exif`] — the exiftool boundary: bulk read, write, restore
//! - [`fixes`] — the [`fixes::Fix`] trait and the five correction rules
//! - [`pipeline`] — photo collection, eligibility, orchestration

pub mod config;
pub mod exif;
pub mod fixes;
pub mod pipeline;

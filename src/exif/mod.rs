//! The metadata engine boundary — everything that talks to `exiftool`.
//!
//! This module provides three operations:
//!
//! - [`read_metadata`] — Bulk-read all tags for a batch of photos in one
//!   `exiftool` call (one [`Metadata`] record per photo, order-preserving)
//! - [`set_metadata`] — Write a set of tag assignments to one photo
//! - [`restore_original`] — Revert a photo from its `_original` backup
//!
//! The first write to a photo leaves a `<name>_original` sibling behind;
//! that file is both the undo copy used by [`restore_original`] and the
//! marker the pipeline uses to skip already-corrected photos.

mod reader;
mod writer;

pub use reader::{Metadata, read_metadata};
pub use writer::{restore_original, set_metadata};

use anyhow::{Context, Result, bail};
use std::ffi::OsStr;
use std::process::Command;

/// Run `exiftool` with the given arguments and return its stdout.
///
/// A non-zero exit status is an error carrying exiftool's stderr; a failure
/// to spawn usually means exiftool is not installed.
pub(crate) fn run_exiftool<I, S>(args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new("exiftool")
        .args(args)
        .output()
        .context("Failed to run exiftool — is it installed and on PATH?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("exiftool failed ({}): {}", output.status, stderr.trim());
    }

    String::from_utf8(output.stdout).context("exiftool produced non-UTF-8 output")
}

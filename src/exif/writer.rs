use anyhow::Result;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;

use super::run_exiftool;

/// Write a set of tag assignments to one photo.
///
/// The accepted patch is always reported; in dry-run mode nothing is
/// executed. exiftool keeps the untouched file as a `<name>_original`
/// sibling the first time it modifies a photo (`-P` preserves the file's
/// modification time so corrections don't reshuffle sort-by-date views).
pub fn set_metadata(photo: &Path, tags: &BTreeMap<String, String>, dry_run: bool) -> Result<()> {
    log::info!("Setting metadata for {}:", photo.display());
    for (tag, value) in tags {
        log::info!("  {tag}: {value}");
    }

    if dry_run {
        return Ok(());
    }

    let mut args: Vec<OsString> = vec!["-P".into()];
    for (tag, value) in tags {
        args.push(format!("-{tag}={value}").into());
    }
    args.push(photo.as_os_str().to_os_string());

    run_exiftool(args)?;
    Ok(())
}

/// Revert a photo to its pre-correction state from the `_original` backup.
pub fn restore_original(photo: &Path) -> Result<()> {
    log::info!("Restoring {}", photo.display());
    run_exiftool([Path::new("-restore_original"), photo])?;
    Ok(())
}

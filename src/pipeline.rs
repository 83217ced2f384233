use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::exif;
use crate::fixes::{self, ExposureMap, Fix, Patch};

/// Photo extensions exiftool can write tags into.
const PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "tif", "tiff", "png",
    // RAW formats
    "cr2", "cr3", "dng", "nef", "arw", "raf", "orf", "rw2", "pef",
];

/// Options for one `fix` run.
#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    /// Compute and report patches, but never write.
    pub dry_run: bool,
    /// Path to the exposure-compensation record file. When absent, the
    /// exposure fix is left out of the catalog.
    pub exposure: Option<PathBuf>,
    /// Require exact one-to-one correspondence between the exposure map
    /// and the photo batch.
    pub strict: bool,
}

/// What the pipeline decided for one photo.
#[derive(Debug)]
pub struct PhotoOutcome {
    pub path: PathBuf,
    /// Merged patch from all fixes. Empty means nothing to correct.
    pub patch: Patch,
    /// The patch was persisted (false in dry-run and for empty patches).
    pub written: bool,
    /// Excluded by the backup marker — a `_original` sibling exists, or the
    /// photo itself is a backup artifact.
    pub skipped: bool,
}

/// Collect photos from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Only files with extensions exiftool
/// can write are included.
pub fn collect_photos(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut photos = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_photo(path) {
                photos.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_photo(p) {
                    photos.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    photos
}

/// Check if a file has a supported photo extension.
fn is_supported_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| PHOTO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// A photo is eligible for correction unless it carries the backup marker:
/// a `<name>_original` sibling on disk (exiftool's undo copy from an earlier
/// run), or a name that itself ends in `_original`.
///
/// Computed once at batch start and not re-checked mid-run, so the engine
/// creating backups during the batch cannot change eligibility under us.
pub fn is_eligible(photo: &Path) -> bool {
    let Some(name) = photo.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.ends_with("_original") {
        return false;
    }
    !photo.with_file_name(format!("{name}_original")).exists()
}

/// Bare filename of a photo, for exposure-map correlation.
fn bare_name(photo: &Path) -> &str {
    photo
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
}

/// Verify the exposure map and the eligible batch correspond one-to-one.
///
/// Every map entry must match exactly one photo, and every photo must have
/// a map entry. Runs before any engine call, so a mismatch aborts with no
/// side effects.
fn check_strict(map: &ExposureMap, photos: &[&Path]) -> Result<()> {
    let names: Vec<&str> = photos.iter().map(|p| bare_name(p)).collect();
    let mut mismatches = Vec::new();

    for filename in map.filenames() {
        match names.iter().filter(|n| **n == filename).count() {
            0 => mismatches.push(format!("{filename}: in exposure map but not in batch")),
            1 => {}
            n => mismatches.push(format!("{filename}: matches {n} photos in batch")),
        }
    }

    for name in &names {
        if map.get(name).is_none() {
            mismatches.push(format!("{name}: in batch but not in exposure map"));
        }
    }

    if !mismatches.is_empty() {
        bail!(
            "Strict mode: exposure map does not match the photo batch:\n  {}",
            mismatches.join("\n  ")
        );
    }

    Ok(())
}

/// Merge per-fix patches for one photo, later fixes winning on conflicts.
fn merge_patches(patches: impl IntoIterator<Item = Patch>) -> Patch {
    let mut merged = Patch::new();
    for patch in patches {
        merged.extend(patch);
    }
    merged
}

/// Run the fix pipeline over a batch of photos.
///
/// Loads the exposure map (when configured), verifies strict-mode
/// correspondence, bulk-reads metadata for the whole batch in one engine
/// call, then processes photos strictly in input order: each enabled fix is
/// consulted in catalog order, the patches are merged, and a non-empty
/// merged patch triggers one write (suppressed in dry-run). The engine's
/// first write to a photo leaves the `_original` backup behind, which makes
/// a second run over the same batch a no-op.
///
/// Fatal errors (missing exposure file, strict mismatch, malformed
/// daylight-saving flag, engine I/O failures) abort remaining processing;
/// writes already issued are not rolled back.
pub fn apply_fixes(
    photos: &[PathBuf],
    config: &Config,
    options: &FixOptions,
) -> Result<Vec<PhotoOutcome>> {
    if options.strict && !config.fixes.exposure {
        bail!("Strict mode requires the exposure fix to be enabled (fixes.exposure)");
    }

    let exposure_map = match &options.exposure {
        Some(path) if !config.fixes.exposure => {
            log::warn!(
                "Exposure fix is disabled in config; ignoring {}",
                path.display()
            );
            None
        }
        Some(path) => Some(ExposureMap::load(path)?),
        None => None,
    };

    if options.strict {
        let Some(map) = &exposure_map else {
            bail!("Strict mode requires an exposure map (--exposure)");
        };
        let eligible: Vec<&Path> = photos
            .iter()
            .map(PathBuf::as_path)
            .filter(|p| is_eligible(p))
            .collect();
        check_strict(map, &eligible)?;
    }

    let fixes = fixes::build_fix_catalog(config, exposure_map);

    // Eligibility snapshot before the engine gets a chance to create backups.
    let eligible: Vec<bool> = photos.iter().map(|p| is_eligible(p)).collect();

    let records = exif::read_metadata(photos)?;

    let mut outcomes = Vec::with_capacity(photos.len());
    for ((photo, record), eligible) in photos.iter().zip(&records).zip(eligible) {
        if !eligible {
            log::debug!("Skipping already-corrected photo {}", photo.display());
            outcomes.push(PhotoOutcome {
                path: photo.clone(),
                patch: Patch::new(),
                written: false,
                skipped: true,
            });
            continue;
        }

        outcomes.push(process_photo(photo, record, &fixes, options.dry_run)?);
    }

    Ok(outcomes)
}

/// Run the catalog over one eligible photo and issue the write when the
/// merged patch is non-empty. In dry-run the patch is still computed and
/// reported, but nothing reaches the engine.
fn process_photo(
    photo: &Path,
    record: &exif::Metadata,
    fixes: &[Box<dyn Fix>],
    dry_run: bool,
) -> Result<PhotoOutcome> {
    let mut fix_patches = Vec::with_capacity(fixes.len());
    for fix in fixes {
        fix_patches.push(fix.apply(photo, record)?);
    }
    let patch = merge_patches(fix_patches);

    let mut written = false;
    if !patch.is_empty() {
        exif::set_metadata(photo, &patch, dry_run)?;
        written = !dry_run;
    }

    Ok(PhotoOutcome {
        path: photo.to_path_buf(),
        patch,
        written,
        skipped: false,
    })
}

/// Restore photos from their `_original` backups.
///
/// Backup artifacts themselves are skipped, as are photos that were never
/// corrected (no backup exists). Returns the number of photos restored.
pub fn restore(photos: &[PathBuf]) -> Result<usize> {
    let mut restored = 0;

    for photo in photos {
        let name = bare_name(photo);
        if name.ends_with("_original") {
            log::debug!("Skipping backup artifact {}", photo.display());
            continue;
        }
        if is_eligible(photo) {
            log::warn!("No backup to restore for {}", photo.display());
            continue;
        }
        exif::restore_original(photo)?;
        restored += 1;
    }

    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // ── collect_photos / is_supported_photo ──────────────────────────

    #[test]
    fn supported_photo_extensions() {
        assert!(is_supported_photo(Path::new("photo.jpg")));
        assert!(is_supported_photo(Path::new("photo.JPEG")));
        assert!(is_supported_photo(Path::new("photo.nef")));
        assert!(is_supported_photo(Path::new("photo.tiff")));
    }

    #[test]
    fn unsupported_photo_extensions() {
        assert!(!is_supported_photo(Path::new("doc.pdf")));
        assert!(!is_supported_photo(Path::new("notes.txt")));
        assert!(!is_supported_photo(Path::new("noext")));
        // exiftool backup artifacts never look like photos
        assert!(!is_supported_photo(Path::new("photo.jpg_original")));
    }

    #[test]
    fn collect_photos_single_file() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("test.jpg");
        fs::write(&jpg, b"fake").unwrap();

        let photos = collect_photos(&[jpg.clone()]);
        assert_eq!(photos, vec![jpg]);
    }

    #[test]
    fn collect_photos_directory_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        fs::write(dir.path().join("a.jpg"), b"fake").unwrap();
        fs::write(sub.join("b.nef"), b"fake").unwrap();
        fs::write(sub.join("c.txt"), b"fake").unwrap();

        let photos = collect_photos(&[dir.path().to_path_buf()]);
        assert_eq!(photos.len(), 2);
    }

    #[test]
    fn collect_photos_nonexistent_path() {
        assert!(collect_photos(&[PathBuf::from("/nonexistent/path")]).is_empty());
    }

    // ── is_eligible ──────────────────────────────────────────────────

    #[test]
    fn fresh_photo_is_eligible() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("a.jpg");
        fs::write(&jpg, b"fake").unwrap();
        assert!(is_eligible(&jpg));
    }

    #[test]
    fn backup_sibling_excludes_photo() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("a.jpg");
        fs::write(&jpg, b"fake").unwrap();
        fs::write(dir.path().join("a.jpg_original"), b"fake").unwrap();
        assert!(!is_eligible(&jpg));
    }

    #[test]
    fn backup_artifact_is_never_eligible() {
        assert!(!is_eligible(Path::new("a.jpg_original")));
    }

    // ── merge_patches ────────────────────────────────────────────────

    #[test]
    fn merge_is_union() {
        let a = Patch::from([("EXIF:LensMake".to_string(), "Nikon".to_string())]);
        let b = Patch::from([("EXIF:OffsetTime".to_string(), "+01:00".to_string())]);

        let merged = merge_patches([a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_later_patch_wins_on_conflict() {
        let a = Patch::from([("EXIF:LensModel".to_string(), "first".to_string())]);
        let b = Patch::from([("EXIF:LensModel".to_string(), "second".to_string())]);

        let merged = merge_patches([a, b]);
        assert_eq!(merged.get("EXIF:LensModel").map(String::as_str), Some("second"));
    }

    // ── check_strict ─────────────────────────────────────────────────

    #[test]
    fn strict_accepts_exact_correspondence() {
        let map = ExposureMap::from_entries([
            ("a.jpg".to_string(), 0.7),
            ("b.jpg".to_string(), -0.3),
        ]);
        let photos = [Path::new("x/a.jpg"), Path::new("y/b.jpg")];
        assert!(check_strict(&map, &photos).is_ok());
    }

    #[test]
    fn strict_rejects_photo_missing_from_map() {
        let map = ExposureMap::from_entries([("a.jpg".to_string(), 0.7)]);
        let photos = [Path::new("a.jpg"), Path::new("b.jpg")];

        let err = check_strict(&map, &photos).unwrap_err();
        assert!(err.to_string().contains("b.jpg"));
    }

    #[test]
    fn strict_rejects_map_entry_missing_from_batch() {
        let map = ExposureMap::from_entries([
            ("a.jpg".to_string(), 0.7),
            ("c.jpg".to_string(), 1.0),
        ]);
        let photos = [Path::new("a.jpg")];

        let err = check_strict(&map, &photos).unwrap_err();
        assert!(err.to_string().contains("c.jpg"));
    }

    #[test]
    fn strict_rejects_duplicate_filenames() {
        let map = ExposureMap::from_entries([("a.jpg".to_string(), 0.7)]);
        let photos = [Path::new("x/a.jpg"), Path::new("y/a.jpg")];

        let err = check_strict(&map, &photos).unwrap_err();
        assert!(err.to_string().contains("matches 2 photos"));
    }

    // ── process_photo: dry-run ───────────────────────────────────────

    #[test]
    fn dry_run_computes_patch_but_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("a.jpg");
        fs::write(&jpg, b"fake").unwrap();

        let fixes = fixes::build_fix_catalog(&Config::default(), None);
        let record = exif::Metadata::from_tags([("MakerNotes:TimeZone", "+01:00")]);

        let outcome = process_photo(&jpg, &record, &fixes, true).unwrap();
        assert_eq!(
            outcome.patch.get("EXIF:OffsetTime").map(String::as_str),
            Some("+01:00")
        );
        assert!(!outcome.written);
        assert!(!outcome.skipped);

        // file untouched, no backup created
        assert_eq!(fs::read(&jpg).unwrap(), b"fake");
        assert!(!dir.path().join("a.jpg_original").exists());
        assert!(is_eligible(&jpg));
    }

    // ── restore ──────────────────────────────────────────────────────

    #[test]
    fn restore_skips_artifacts_and_unbacked_photos() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("a.jpg");
        fs::write(&jpg, b"fake").unwrap();

        // no backup for a.jpg, and b.jpg_original is itself an artifact
        let restored = restore(&[jpg, dir.path().join("b.jpg_original")]).unwrap();
        assert_eq!(restored, 0);
    }

    // ── apply_fixes: fatal pre-engine exits ──────────────────────────
    // (paths that would reach exiftool are covered by the fix unit tests)

    #[test]
    fn missing_exposure_file_aborts_before_processing() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("a.jpg");
        fs::write(&jpg, b"fake").unwrap();

        let options = FixOptions {
            exposure: Some(dir.path().join("nope.csv")),
            ..FixOptions::default()
        };
        let err = apply_fixes(&[jpg], &Config::default(), &options).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn strict_without_exposure_map_is_fatal() {
        let options = FixOptions {
            strict: true,
            ..FixOptions::default()
        };
        let err = apply_fixes(&[], &Config::default(), &options).unwrap_err();
        assert!(err.to_string().contains("Strict mode"));
    }

    #[test]
    fn strict_with_disabled_exposure_fix_is_fatal() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("a.jpg");
        fs::write(&jpg, b"fake").unwrap();
        let csv = dir.path().join("exposure.csv");
        fs::write(&csv, "a.jpg,0.7\n").unwrap();

        let mut config = Config::default();
        config.fixes.exposure = false;

        let options = FixOptions {
            exposure: Some(csv),
            strict: true,
            ..FixOptions::default()
        };
        let err = apply_fixes(&[jpg], &config, &options).unwrap_err();
        assert!(err.to_string().contains("fixes.exposure"));
    }

    #[test]
    fn disabled_exposure_fix_skips_map_loading() {
        let mut config = Config::default();
        config.fixes.exposure = false;

        // map file doesn't exist, but the fix won't run anyway
        let options = FixOptions {
            exposure: Some(PathBuf::from("/nonexistent/exposure.csv")),
            ..FixOptions::default()
        };
        let outcomes = apply_fixes(&[], &config, &options).unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn strict_mismatch_aborts_before_any_write() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.jpg"] {
            fs::write(dir.path().join(name), b"fake").unwrap();
        }
        let csv = dir.path().join("exposure.csv");
        fs::write(&csv, "a.jpg,0.7\n").unwrap();

        let options = FixOptions {
            exposure: Some(csv),
            strict: true,
            ..FixOptions::default()
        };
        let photos = vec![dir.path().join("a.jpg"), dir.path().join("b.jpg")];
        let err = apply_fixes(&photos, &Config::default(), &options).unwrap_err();
        assert!(err.to_string().contains("does not match"));

        // nothing was touched
        assert!(is_eligible(&photos[0]));
        assert!(is_eligible(&photos[1]));
    }
}

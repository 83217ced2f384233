use anyhow::Result;
use std::path::Path;

use super::{Fix, Patch};
use crate::exif::Metadata;

/// Normalize the shouty vendor strings in the camera make/model fields.
///
/// Bodies tend to report themselves in all caps (`NIKON CORPORATION`,
/// `NIKON D5200`). Long all-letter words are rewritten in title case; words
/// carrying digits (model numbers like `D5200`) and short acronyms are kept
/// verbatim.
pub struct BodyNameFix;

impl Fix for BodyNameFix {
    fn description(&self) -> &'static str {
        "Normalize the camera make and model names reported by the body"
    }

    fn apply(&self, photo: &Path, metadata: &Metadata) -> Result<Patch> {
        let mut patch = Patch::new();

        for tag in ["EXIF:Make", "EXIF:Model"] {
            let Some(value) = metadata.get(tag) else {
                continue;
            };
            let normalized = normalize_name(value);
            if normalized != value {
                log::info!(
                    "Setting {tag} for {} to {normalized}",
                    photo.display()
                );
                patch.insert(tag.to_string(), normalized);
            }
        }

        Ok(patch)
    }
}

/// Title-case the all-uppercase words of a hardware name.
fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(normalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_word(word: &str) -> String {
    let all_caps_letters =
        word.len() >= 4 && word.chars().all(|c| c.is_ascii_uppercase());
    if !all_caps_letters {
        return word.to_string();
    }

    let mut chars = word.chars();
    let first = chars.next().unwrap_or_default();
    format!("{first}{}", chars.as_str().to_ascii_lowercase())
}

/// Fill in the standard lens make/model fields from the maker notes.
///
/// The raw lens string and the lens-type code live in the maker notes; the
/// composite lens identifier tells us whether this is Nikkor glass, which
/// fixes both the make and the model prefix.
pub struct LensModelFix;

impl Fix for LensModelFix {
    fn description(&self) -> &'static str {
        "Copy lens model information from the maker notes to the main EXIF"
    }

    fn apply(&self, photo: &Path, metadata: &Metadata) -> Result<Patch> {
        if metadata.get("EXIF:LensMake").is_some() && metadata.get("EXIF:LensModel").is_some() {
            return Ok(Patch::new());
        }

        let lens = metadata.get("MakerNotes:Lens").unwrap_or("");
        let lens_type = metadata.get("MakerNotes:LensType").unwrap_or("");
        let lens_id = metadata.get("Composite:LensID").unwrap_or("");

        // G-type codes attach directly to the lens string ("...f/1.8G"),
        // other codes are separate words.
        let mut lens_full = if lens_type.starts_with('G') {
            format!("{lens}{lens_type}")
        } else {
            format!("{lens} {lens_type}")
        };

        let lens_make = if lens_id.contains("Nikkor") {
            lens_full = format!("Nikkor {lens_full}");
            "Nikon Corporation"
        } else {
            ""
        };

        log::info!(
            "Setting lens for {} to {lens_full} ({lens_make})",
            photo.display()
        );

        Ok(Patch::from([
            ("EXIF:LensMake".to_string(), lens_make.to_string()),
            ("EXIF:LensModel".to_string(), lens_full),
        ]))
    }
}

/// Recompute the 35mm-equivalent focal length for DX (cropped-sensor) glass.
///
/// Applies only when the camera failed to convert: the equivalent field is
/// missing, or equals the raw focal length. An equivalent that already
/// differs from the raw value is assumed to be correct.
pub struct Lens35mmEquivalentFix;

impl Fix for Lens35mmEquivalentFix {
    fn description(&self) -> &'static str {
        "Recompute the 35mm-equivalent focal length for DX lenses"
    }

    fn apply(&self, photo: &Path, metadata: &Metadata) -> Result<Patch> {
        let lens_id = metadata.get("Composite:LensID").unwrap_or("");
        if !lens_id.contains("DX") {
            return Ok(Patch::new());
        }

        let Some(focal_length) = metadata.get("EXIF:FocalLength").and_then(leading_number)
        else {
            return Ok(Patch::new());
        };

        if let Some(current) = metadata
            .get("EXIF:FocalLengthIn35mmFormat")
            .and_then(leading_number)
        {
            if current != focal_length {
                return Ok(Patch::new());
            }
        }

        let equivalent = (focal_length * 1.5).ceil() as u32;
        let equivalent = format!("{equivalent} mm");

        log::info!(
            "Setting lens 35mm equivalent for {} to {equivalent} ({focal_length} mm raw)",
            photo.display()
        );

        Ok(Patch::from([(
            "EXIF:FocalLengthIn35mmFormat".to_string(),
            equivalent,
        )]))
    }
}

/// Parse the leading numeric component of a `"<number> mm"`-style value.
fn leading_number(value: &str) -> Option<f64> {
    value.split(' ').next()?.parse().ok()
}

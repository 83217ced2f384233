use anyhow::{Context, Result};
use std::path::Path;

use super::{Fix, Patch};
use crate::config::parse_bool;
use crate::exif::Metadata;

/// Promote the maker-note timezone to the standard `EXIF:OffsetTime` field.
///
/// Many bodies record the timezone (and whether daylight saving was active)
/// only in their maker notes, leaving the standard offset field empty. When
/// daylight saving was on, the maker-note offset is the base zone and has to
/// be shifted forward one hour.
pub struct TimezoneFix;

impl Fix for TimezoneFix {
    fn description(&self) -> &'static str {
        "Copy timezone information from the maker notes to the standard EXIF offset"
    }

    fn apply(&self, photo: &Path, metadata: &Metadata) -> Result<Patch> {
        // An existing offset is authoritative, never overwritten.
        if metadata.get("EXIF:OffsetTime").is_some() {
            return Ok(Patch::new());
        }

        let Some(timezone) = metadata.get("MakerNotes:TimeZone") else {
            return Ok(Patch::new());
        };

        let dst = parse_bool(metadata.get("MakerNotes:DaylightSavings").unwrap_or("0"))
            .with_context(|| {
                format!(
                    "Malformed daylight-saving flag in maker notes of {}",
                    photo.display()
                )
            })?;

        let timezone = if dst {
            match shift_one_hour(timezone) {
                Some(shifted) => shifted,
                None => {
                    log::debug!(
                        "Unrecognized timezone offset {timezone:?} in {}; skipping",
                        photo.display()
                    );
                    return Ok(Patch::new());
                }
            }
        } else {
            timezone.to_string()
        };

        log::info!("Setting timezone for {} to {timezone}", photo.display());

        Ok(Patch::from([("EXIF:OffsetTime".to_string(), timezone)]))
    }
}

/// Shift a `±HH:MM` offset string forward one hour for daylight saving.
///
/// `Z` becomes `+01:00`. Otherwise the two-digit hour after the sign is
/// adjusted (incremented for `+` offsets, decremented for `-` offsets, i.e.
/// one hour closer to/past UTC going east) and the minutes are kept as-is.
/// Returns `None` when the string doesn't look like a signed offset.
fn shift_one_hour(offset: &str) -> Option<String> {
    if offset == "Z" {
        return Some("+01:00".to_string());
    }

    let sign = offset.chars().next()?;
    if sign != '+' && sign != '-' {
        return None;
    }

    let hours: u32 = offset.get(1..3)?.parse().ok()?;
    let rest = offset.get(3..)?;
    let hours = match sign {
        '+' => hours + 1,
        _ => hours.checked_sub(1)?,
    };

    Some(format!("{sign}{hours:02}{rest}"))
}

//! Line parser: `device_type \t device_id \t lat \t lon \t app,app,...` -> [`InstallRecord`].

use log::info;

use crate::error::ParseError;
use crate::{AppsFallback, InstallRecord};

/// Parse one raw line. Pure; safe to call from any thread.
///
/// Coordinates that do not parse to a finite number leave both `lat` and `lon` at `0.0`; the line
/// still counts as parsed. App ids that do not parse are handled per `fallback`.
pub fn parse_line(line: &[u8], fallback: AppsFallback) -> Result<InstallRecord, ParseError> {
    let line = std::str::from_utf8(line)
        .map_err(|_| ParseError::Encoding)?
        .trim();
    let parts: Vec<&str> = line.split('\t').collect();
    let [device_type, device_id, lat, lon, raw_apps] = parts[..] else {
        return Err(ParseError::MalformedLine { found: parts.len() });
    };
    if device_type.is_empty() || device_id.is_empty() {
        return Err(ParseError::MissingIdentity);
    }

    let apps = parse_apps(raw_apps, fallback).unwrap_or_else(|kept| {
        info!("Not all user apps are digits: `{}`", line);
        kept
    });

    let (lat, lon) = match (parse_coord(lat), parse_coord(lon)) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            info!("Invalid geo coords: `{}`", line);
            (0.0, 0.0)
        }
    };

    Ok(InstallRecord {
        device_type: device_type.to_string(),
        device_id: device_id.to_string(),
        lat,
        lon,
        apps,
    })
}

/// `nan` and `inf` parse as floats but are not coordinates.
fn parse_coord(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `Ok` when every entry parsed; `Err(kept)` when some did not, with what `fallback` keeps.
fn parse_apps(raw: &str, fallback: AppsFallback) -> Result<Vec<u32>, Vec<u32>> {
    let mut apps = Vec::new();
    let mut clean = true;
    for entry in raw.split(',') {
        match entry.trim().parse::<u32>() {
            Ok(id) => apps.push(id),
            Err(_) => clean = false,
        }
    }
    if clean {
        return Ok(apps);
    }
    match fallback {
        AppsFallback::KeepNumeric => Err(apps),
        AppsFallback::DropAll => Err(Vec::new()),
    }
}

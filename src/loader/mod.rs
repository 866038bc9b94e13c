//! Text model formats
//!
//! - `obj`: geometry records, face triangulation, the per-model load job
//! - `mtl`: material libraries
//!
//! The parsers are pure; the `load_*` jobs connect them to the caches.

pub mod mtl;
pub mod obj;

use glam::Vec3;

/// Parse up to three whitespace separated floats; missing components are 0
pub(crate) fn parse_vec3(rest: &str) -> Result<Vec3, String> {
    let mut values = [0.0f32; 3];
    for (slot, token) in values.iter_mut().zip(rest.split_whitespace()) {
        *slot = token
            .parse()
            .map_err(|_| format!("'{}' is not a number", token))?;
    }
    Ok(Vec3::from_array(values))
}

/// Split a record into its keyword and the rest of the line
pub(crate) fn split_record(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => Some((keyword, rest.trim())),
        None => Some((line, "")),
    }
}

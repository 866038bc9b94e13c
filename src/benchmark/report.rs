//! Plain-text benchmark report

use super::{SampleSet, SceneCounts};
use crate::error::{AssetError, Result};
use std::fmt::Write as _;
use std::path::Path;

const TITLE: &str = "______________ Benchmark loading scenes logs ______________";
const SEPARATOR: &str = "___________________________________________________________";

/// `s.mmm s` below a minute, `m min s.mmm s` from one minute up
pub fn format_seconds(seconds: f32) -> String {
    if seconds < 60.0 {
        return format!("{:.3} s", seconds);
    }
    let minutes = (seconds / 60.0).floor();
    format!("{} min {:.3} s", minutes as u64, seconds - minutes * 60.0)
}

fn write_samples(out: &mut String, heading: &str, samples: &SampleSet) {
    let _ = writeln!(out, "{}\n", heading);
    for (index, seconds) in samples.samples().iter().enumerate() {
        let _ = writeln!(out, "Time {} -> {}", index + 1, format_seconds(*seconds));
    }
    let _ = writeln!(out, "\nAverage time -> {}", format_seconds(samples.average()));
    let _ = writeln!(out, "{}\n", SEPARATOR);
}

/// Render the report text
///
/// The ratio line, when present, is the last line and has no trailing
/// newline.
pub fn render_report(
    counts: &SceneCounts,
    multi: &SampleSet,
    mono: &SampleSet,
    ratio: Option<f32>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n\n", TITLE);
    let _ = writeln!(
        out,
        "Scene objects count : {} (for {} models loaded)",
        counts.objects, counts.models
    );
    let _ = writeln!(out, "Scene triangles count : {}", counts.triangles);
    let _ = writeln!(out, "Scene textures count : {}", counts.textures);
    let _ = writeln!(out, "{}\n", SEPARATOR);

    write_samples(&mut out, "Multithread loading times :", multi);
    write_samples(&mut out, "Monothread loading times :", mono);

    match ratio {
        Some(ratio) if ratio >= 1.0 => {
            let _ = write!(out, "Ratio -> Multithread is {:.6} faster than monothread", ratio);
        }
        Some(ratio) => {
            let _ = write!(
                out,
                "Ratio -> Monothread is {:.6} faster than multithread",
                1.0 / ratio
            );
        }
        None => {}
    }
    out
}

/// Write `text` to `path`, creating parent directories
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AssetError::io(parent, e))?;
    }
    std::fs::write(path, text).map_err(|e| AssetError::io(path, e))?;
    log::info!("[Benchmark] Report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "0.000 s");
        assert_eq!(format_seconds(1.25), "1.250 s");
        assert_eq!(format_seconds(61.5), "1 min 1.500 s");
        assert_eq!(format_seconds(125.0), "2 min 5.000 s");
    }

    #[test]
    fn test_report_layout() {
        let mut multi = SampleSet::default();
        multi.push(1.0);
        multi.push(2.0);
        let mut mono = SampleSet::default();
        mono.push(3.0);

        let counts = SceneCounts {
            objects: 4,
            models: 2,
            triangles: 100,
            textures: 7,
        };
        let report = render_report(&counts, &multi, &mono, Some(2.0));

        let expected = format!(
            "{TITLE}\n\n\n\
             Scene objects count : 4 (for 2 models loaded)\n\
             Scene triangles count : 100\n\
             Scene textures count : 7\n\
             {SEPARATOR}\n\n\
             Multithread loading times :\n\n\
             Time 1 -> 1.000 s\n\
             Time 2 -> 2.000 s\n\
             \nAverage time -> 1.500 s\n\
             {SEPARATOR}\n\n\
             Monothread loading times :\n\n\
             Time 1 -> 3.000 s\n\
             \nAverage time -> 3.000 s\n\
             {SEPARATOR}\n\n\
             Ratio -> Multithread is 2.000000 faster than monothread"
        );
        assert_eq!(report, expected);
    }

    #[test]
    fn test_report_slower_multi_and_no_ratio() {
        let counts = SceneCounts::default();
        let empty = SampleSet::default();

        let slower = render_report(&counts, &empty, &empty, Some(0.5));
        assert!(slower.ends_with("Ratio -> Monothread is 2.000000 faster than multithread"));

        let none = render_report(&counts, &empty, &empty, None);
        assert!(!none.contains("Ratio ->"));
        assert!(none.ends_with(&format!("{}\n\n", SEPARATOR)));
    }

    #[test]
    fn test_write_text_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/benchmark/run.txt");
        write_text(&path, "hello").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }
}

//! Logging utilities
//!
//! Standardized log lines for table builds, exports and skipped data.

use std::path::Path;

/// Log the start of an operation on a file or directory
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{} {}", operation, path.display());
}

/// Log the completion of an operation
///
/// # Arguments
/// * `operation` - Past-tense description, e.g. "wrote"
/// * `path` - File or directory operated on
/// * `rows` - Number of rows handled
/// * `elapsed` - Optional elapsed time
pub fn log_operation_complete(
    operation: &str,
    path: &Path,
    rows: usize,
    elapsed: Option<std::time::Duration>,
) {
    if let Some(duration) = elapsed {
        log::info!(
            "Successfully {} {} rows to {} in {:?}",
            operation,
            rows,
            path.display(),
            duration
        );
    } else {
        log::info!("Successfully {} {} rows to {}", operation, rows, path.display());
    }
}

/// Log a warning, optionally tied to a path
pub fn log_warning(message: &str, path: Option<&Path>) {
    if let Some(path) = path {
        log::warn!("{}: {}", message, path.display());
    } else {
        log::warn!("{message}");
    }
}

/// Log data that was skipped under a skip policy
///
/// # Arguments
/// * `table` - CDM table being built
/// * `chunk` - Chunk index, if the table is chunked
/// * `what` - What was skipped and why
pub fn log_skip(table: &str, chunk: Option<usize>, what: &str) {
    match chunk {
        Some(chunk) => log::warn!("{table} chunk {chunk}: {what}"),
        None => log::warn!("{table}: {what}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Capture(Mutex<Vec<(log::Level, String)>>);

    impl log::Log for Capture {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));

    #[test]
    fn test_skips_are_visible_at_default_level() {
        // Only this test installs a logger in the library test binary.
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Info);

        log_skip("MEASUREMENT", Some(4), "variable 'lactate' not found");
        log_skip("DRUG_EXPOSURE", None, "no input files");

        let lines = CAPTURE.0.lock().unwrap();
        for expected in [
            "MEASUREMENT chunk 4: variable 'lactate' not found",
            "DRUG_EXPOSURE: no input files",
        ] {
            let level = lines
                .iter()
                .find(|(_, line)| line == expected)
                .map(|(level, _)| *level);
            assert_eq!(level, Some(log::Level::Warn), "{expected}");
        }
    }
}

//! Progress reporting for chunked table builds, using the indicatif crate.

use indicatif::{ProgressBar, ProgressStyle};

/// Template of the chunk progress bar
pub const CHUNK_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} chunks {msg}";

/// Create a progress bar over the chunks of a table
///
/// # Arguments
/// * `chunks` - Number of chunks to process
/// * `table` - Table name shown as the message
#[must_use]
pub fn create_chunk_progress_bar(chunks: u64, table: &str) -> ProgressBar {
    let pb = ProgressBar::new(chunks);
    let style = ProgressStyle::default_bar()
        .template(CHUNK_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(table.to_string());
    pb
}

/// Finish a progress bar with an optional completion message
pub fn finish_progress_bar(pb: &ProgressBar, message: Option<&str>) {
    if let Some(msg) = message {
        pb.finish_with_message(msg.to_string());
    } else {
        pb.finish();
    }
}

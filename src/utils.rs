//! String truncation and file system helpers.
//!
//! - Excerpt truncation for model output attached to parsing errors
//! - Log-friendly truncation for long strings
//! - Write probing for the directory that holds the article store

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Byte offset of the `max`-th character, or `None` if `s` is not longer.
fn char_boundary(s: &str, max: usize) -> Option<usize> {
    s.char_indices().nth(max).map(|(idx, _)| idx)
}

/// Keep the first `max` characters of `s`, appending `"..."` if anything
/// was cut.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_excerpt("abcdef", 3), "abc...");
/// assert_eq!(truncate_excerpt("abc", 3), "abc");
/// ```
pub fn truncate_excerpt(s: &str, max: usize) -> String {
    match char_boundary(s, max) {
        Some(idx) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters and suffixed with the number of
/// bytes that were dropped.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match char_boundary(s, max) {
        Some(idx) => format!("{}…(+{} bytes)", &s[..idx], s.len() - idx),
        None => s.to_string(),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Store directory is writable");
    Ok(())
}

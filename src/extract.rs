//! Tag-delimited field extraction from free-form model output.
//!
//! The model is asked to wrap each field in a tag pair such as
//! `<insights>...</insights>`. Models frequently mention those tags while
//! reasoning before they produce the answer, so extraction always anchors on
//! the *last* closing marker and the nearest opening marker before it.

use thiserror::Error;

/// A tag pair was not present in the text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagNotFound {
    #[error("Closing tag '</{0}>' not found.")]
    Closing(String),
    #[error("Opening tag '<{0}>' not found.")]
    Opening(String),
}

impl TagNotFound {
    /// Name of the tag that could not be extracted.
    pub fn tag(&self) -> &str {
        match self {
            TagNotFound::Closing(tag) | TagNotFound::Opening(tag) => tag,
        }
    }
}

/// Return the trimmed text between the last `<tag>`/`</tag>` pair.
///
/// The last `</tag>` in `text` is located first; the opening `<tag>` must
/// appear before it. An opening marker that only occurs after the final
/// closing marker does not count.
///
/// # Errors
///
/// [`TagNotFound`] when the closing marker is absent, or when no opening
/// marker precedes it.
///
/// # Examples
///
/// ```ignore
/// let out = "I will use <title> tags.\n<title> Real Title </title>";
/// assert_eq!(extract_last_tag_pair(out, "title").unwrap(), "Real Title");
/// ```
pub fn extract_last_tag_pair<'a>(text: &'a str, tag: &str) -> Result<&'a str, TagNotFound> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let end = text
        .rfind(&close)
        .ok_or_else(|| TagNotFound::Closing(tag.to_string()))?;
    let start = text[..end]
        .rfind(&open)
        .ok_or_else(|| TagNotFound::Opening(tag.to_string()))?;

    Ok(text[start + open.len()..end].trim())
}

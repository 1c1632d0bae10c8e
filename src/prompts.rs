//! Prompt template for the insights view.

/// System prompt sent to both backends. `{content}` is replaced with the
/// fetched article text.
pub const INSIGHTS_VIEW: &str = r#"News articles are often long while the information they carry is short. Some of them also lean towards an agenda, making claims without much evidence behind them.
Readers of our site get a concise, neutral "insights view" of each story instead. It is not another summary: it covers every crucial aspect of the story, sticks to what the evidence supports, and leaves out the outlet's or author's framing, so a reader understands the topic fully in little time.

Convert the following article into that insights view.

Article:
{content}

## Output format
Before writing, think about which aspects of the story the reader needs, how to keep it short, and how to avoid carrying over anyone's agenda. Pure news, no fluff.

When ready, put your version of the article inside insights tags, e.g. <insights>your version here</insights>.
Also write a headline inside title tags, e.g. <title>headline here</title>, and a one or two line thumbnail snippet, shown beneath the article's picture, inside thumbnail_snippet tags, e.g. <thumbnail_snippet>snippet here</thumbnail_snippet>.
All three tag pairs must always be present; they are parsed automatically.
"#;

/// Fill the article text into [`INSIGHTS_VIEW`].
pub fn render_insights_prompt(content: &str) -> String {
    INSIGHTS_VIEW.replace("{content}", content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_inserts_content_once() {
        let prompt = render_insights_prompt("The council voted 7-2.");
        assert!(prompt.contains("Article:\nThe council voted 7-2.\n"));
        assert!(!prompt.contains("{content}"));
    }

    #[test]
    fn test_prompt_names_all_three_tags() {
        for tag in ["<insights>", "<title>", "<thumbnail_snippet>"] {
            assert!(INSIGHTS_VIEW.contains(tag), "missing {tag}");
        }
    }
}

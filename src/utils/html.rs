use std::collections::HashSet;

/// Reduce rich-text excerpt HTML to plain text using the ammonia library.
///
/// No tag is whitelisted, so markup is dropped while its text content is
/// kept; `<script>` and `<style>` bodies are removed entirely.
pub fn plain_text(input: &str) -> String {
    ammonia::Builder::default()
        .tags(HashSet::new())
        .clean(input)
        .to_string()
}

/// Plain-text excerpt of at most `max_chars` characters, ending in `…` when cut.
pub fn excerpt(input: &str, max_chars: usize) -> String {
    let text = plain_text(input);
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

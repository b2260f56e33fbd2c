/// Embedding input: title, then a `#tag` line when tags exist, then the
/// summary. Deterministic given (title, tags, summary) — the same page always
/// embeds the same text.
pub fn build_combined(title: &str, tags: &[String], summary: &str) -> String {
    let mut combined = format!("Title: {title}");
    if !tags.is_empty() {
        let tag_line = tags
            .iter()
            .map(|t| format!("#{t}"))
            .collect::<Vec<_>>()
            .join(" ");
        combined.push('\n');
        combined.push_str(&tag_line);
    }
    combined.push_str("\n\nContent: ");
    combined.push_str(summary);
    combined
}

use llm_client::CompletionRequest;

const SUMMARY_SYSTEM: &str = "You are an expert post summariser.";

/// Free-form paragraph summary of a crawled page.
pub fn summary_request(url: &str, content: &str) -> CompletionRequest {
    let prompt = format!(
        "Within the block below is the full content of a page I am interested in. \
         The url is {url}.\n\n\
         ```\n{content}\n```\n\n\
         Summarise the contents of the provided page. The page may be an article \
         or a user submitted post. Include a summary of discussions and comments \
         if applicable. Focus on the main content and ignore sidebars, footers \
         and similar chrome. Do not open with \"The page\" or similar phrasing, \
         write the summary directly."
    );
    CompletionRequest::new(prompt).system(SUMMARY_SYSTEM)
}

/// Headline-style title for a crawled page. Output bounded to one line.
pub fn title_request(content: &str) -> CompletionRequest {
    let prompt = format!(
        "Write a short headline-style title, at most ten words, for the \
         following page content. Reply with the title only.\n\n{content}"
    );
    CompletionRequest::new(prompt).max_tokens(32)
}

/// Models like wrapping headlines in quotes. Strip a single leading and
/// trailing quotation character if present.
pub fn strip_title_quotes(title: &str) -> String {
    const QUOTES: [char; 6] = ['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

    let mut out = title.trim();
    if let Some(rest) = out.strip_prefix(&QUOTES[..]) {
        out = rest;
    }
    if let Some(rest) = out.strip_suffix(&QUOTES[..]) {
        out = rest;
    }
    out.trim().to_string()
}

/// Truncate to at most `max_bytes` bytes at a character boundary, so an
/// oversized page never blows the prompt budget.
pub fn truncate_content(content: &str, max_bytes: usize) -> &str {
    if content.len() <= max_bytes {
        return content;
    }
    let mut end = max_bytes;
    while !content.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &content[..end]
}

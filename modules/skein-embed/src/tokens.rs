/// Deterministic token estimate used for the embedding budget.
///
/// Not a real BPE tokenizer: one token per whitespace-separated word, plus
/// one per started 8-char chunk beyond the first for long words (BPE splits
/// those). What the budget check needs is consistency across runs, which
/// this gives, while tracking real token counts closely enough for an 8000
/// token ceiling.
pub fn estimate_tokens(text: &str) -> usize {
    text.split_whitespace()
        .map(|word| 1 + word.chars().count().saturating_sub(1) / 8)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   \n\t"), 0);
    }

    #[test]
    fn short_words_count_one_each() {
        assert_eq!(estimate_tokens("one two three"), 3);
    }

    #[test]
    fn long_words_cost_extra() {
        // 16 chars -> 2 tokens, 17 chars -> 3 tokens
        assert_eq!(estimate_tokens("abcdefghabcdefgh"), 2);
        assert_eq!(estimate_tokens("abcdefghabcdefghx"), 3);
    }

    #[test]
    fn estimate_is_deterministic() {
        let text = "Title: Something\n\nContent: a long summary of the page";
        assert_eq!(estimate_tokens(text), estimate_tokens(text));
    }
}

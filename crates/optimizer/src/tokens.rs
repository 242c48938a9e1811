//! Token estimators. Neither is a real tokenizer; both are pure functions of
//! their input.

/// `ceil(chars / 4)`. Used while walking trees where many candidates are
/// costed and only a rough figure is needed.
#[must_use]
pub fn estimate_tokens_fast(content: &str) -> usize {
    content.chars().count().div_ceil(4)
}

/// Word-class aware estimate for content that is already loaded.
///
/// Whitespace-delimited words that look like code (contain `_`, `$`, braces or
/// brackets, or are ALL_CAPS) cost `ceil(len / 3)`; other words cost 1 when at
/// most four characters long, `ceil(len / 4)` otherwise. ASCII punctuation adds
/// `ceil(count * 0.3)`.
#[must_use]
pub fn estimate_tokens_precise(content: &str) -> usize {
    let words: usize = content
        .split_whitespace()
        .map(|word| {
            let len = word.chars().count();
            if is_code_token(word) {
                len.div_ceil(3)
            } else if len <= 4 {
                1
            } else {
                len.div_ceil(4)
            }
        })
        .sum();

    let punctuation = content.chars().filter(char::is_ascii_punctuation).count();
    // ceil(p * 0.3) in integer arithmetic
    words + (punctuation * 3).div_ceil(10)
}

fn is_code_token(word: &str) -> bool {
    if word
        .chars()
        .any(|c| matches!(c, '_' | '$' | '{' | '}' | '[' | ']'))
    {
        return true;
    }
    is_all_caps(word)
}

fn is_all_caps(word: &str) -> bool {
    let letters = word.chars().filter(|c| c.is_alphabetic()).count();
    letters >= 2
        && word
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(char::is_uppercase)
}

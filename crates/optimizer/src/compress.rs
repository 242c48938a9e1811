use crate::sections::is_fence;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

const CODE_BLOCK_MAX_LINES: usize = 20;
const CODE_BLOCK_HEAD: usize = 10;
const CODE_BLOCK_TAIL: usize = 5;
const CODE_TRUNCATION_MARKER: &str = "// ... truncated ...";
const BLOCK_COMMENT_MAX_CHARS: usize = 200;
const BLOCK_COMMENT_PLACEHOLDER: &str = "/* ... comment truncated ... */";

static BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment regex"));
static INLINE_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("valid whitespace regex"));
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid newline regex"));

/// Lossy, budget-independent compression.
///
/// - fenced blocks over 20 lines keep their first 10 and last 5 lines
/// - block comments over 200 characters become a placeholder
/// - outside fences: runs of spaces/tabs collapse to one space, trailing
///   whitespace is dropped and repeated lines keep only their first occurrence
/// - three or more consecutive newlines collapse to two
#[must_use]
pub fn compress(content: &str) -> String {
    let content = truncate_code_blocks(content);
    let content = BLOCK_COMMENT.replace_all(&content, |caps: &regex::Captures<'_>| {
        let comment = &caps[0];
        if comment.chars().count() > BLOCK_COMMENT_MAX_CHARS {
            BLOCK_COMMENT_PLACEHOLDER.to_string()
        } else {
            comment.to_string()
        }
    });
    let content = normalize_prose_lines(&content);
    BLANK_RUN.replace_all(&content, "\n\n").into_owned()
}

fn truncate_code_blocks(content: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut in_code = false;

    for line in content.lines() {
        if is_fence(line) {
            if in_code {
                push_block(&mut out, &block);
                block.clear();
            }
            in_code = !in_code;
            out.push(line);
            continue;
        }
        if in_code {
            block.push(line);
        } else {
            out.push(line);
        }
    }
    // unterminated fence: keep what we collected
    push_block(&mut out, &block);

    out.join("\n")
}

fn push_block<'a>(out: &mut Vec<&'a str>, block: &[&'a str]) {
    if block.len() > CODE_BLOCK_MAX_LINES {
        out.extend_from_slice(&block[..CODE_BLOCK_HEAD]);
        out.push(CODE_TRUNCATION_MARKER);
        out.extend_from_slice(&block[block.len() - CODE_BLOCK_TAIL..]);
    } else {
        out.extend_from_slice(block);
    }
}

fn normalize_prose_lines(content: &str) -> String {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    let mut in_code = false;

    for line in content.lines() {
        if is_fence(line) {
            in_code = !in_code;
            out.push(line.trim_end().to_string());
            continue;
        }
        if in_code {
            out.push(line.to_string());
            continue;
        }

        let collapsed = INLINE_SPACE.replace_all(line, " ");
        let collapsed = collapsed.trim_end();
        if collapsed.trim().is_empty() {
            out.push(String::new());
            continue;
        }
        if seen.insert(collapsed.to_string()) {
            out.push(collapsed.to_string());
        }
    }

    out.join("\n")
}

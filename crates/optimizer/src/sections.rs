use once_cell::sync::Lazy;
use regex::Regex;

static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}\s").expect("valid header regex"));
static RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:={3,}|-{3,})\s*$").expect("valid rule regex"));

pub(crate) fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

pub(crate) fn is_header(line: &str) -> bool {
    HEADER.is_match(line.trim_start())
}

fn is_boundary(line: &str) -> bool {
    is_header(line) || RULE.is_match(line)
}

/// Split `content` into logical sections.
///
/// A `#`-style header or a line of three or more `=`/`-` starts a new section,
/// but only outside fenced code blocks. Joining the sections with `\n` yields
/// the input without its trailing newline.
#[must_use]
pub fn split_sections(content: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_code = false;

    for line in content.lines() {
        if is_fence(line) {
            in_code = !in_code;
            current.push(line);
            continue;
        }
        if !in_code && is_boundary(line) && !current.is_empty() {
            sections.push(current.join("\n"));
            current.clear();
        }
        current.push(line);
    }

    if !current.is_empty() {
        sections.push(current.join("\n"));
    }
    sections
}

use crate::config::OptimizerConfig;
use crate::language::Language;
use crate::sections::{is_fence, is_header, split_sections};
use crate::tokens::estimate_tokens_precise;
use crate::types::{ChunkMetadata, ContextChunk};
use once_cell::sync::Lazy;
use regex::Regex;

static CODE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:fn|pub|impl|function|class|def|const|let|var|import|export|return)\b|[;{}]\s*$")
        .expect("valid code regex")
});
static DOC_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:/\*\*|///|\* @|@param|@returns?|>\s)").expect("valid doc regex")
});

/// Pack sections greedily into chunks of at most `max_chunk_size` estimated
/// tokens, split oversized sections by line, then prepend up to
/// `max_overlap_lines` trailing lines of each chunk (capped by
/// `overlap_percent` of its line count) to the next one.
///
/// Overlap is the only way a chunk's `token_count` may exceed the size.
#[must_use]
pub fn chunk_context(
    content: &str,
    max_chunk_size: usize,
    config: &OptimizerConfig,
) -> Vec<ContextChunk> {
    let max_chunk_size = max_chunk_size.max(1);
    let mut packed: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0usize;

    for section in split_sections(content) {
        let tokens = estimate_tokens_precise(&section);

        if tokens > max_chunk_size {
            flush(&mut packed, &mut current, &mut current_tokens);
            packed.extend(split_by_lines(&section, max_chunk_size));
            continue;
        }

        if current_tokens + tokens > max_chunk_size {
            flush(&mut packed, &mut current, &mut current_tokens);
        }
        current.push(section);
        current_tokens += tokens;
    }
    flush(&mut packed, &mut current, &mut current_tokens);

    let mut chunks: Vec<ContextChunk> = packed
        .iter()
        .enumerate()
        .map(|(index, text)| ContextChunk {
            token_count: estimate_tokens_precise(text),
            metadata: describe(text),
            content: text.clone(),
            index,
        })
        .collect();

    for index in 1..chunks.len() {
        let previous: Vec<&str> = packed[index - 1].lines().collect();
        let overlap = config
            .max_overlap_lines
            .min(previous.len() * config.overlap_percent / 100);
        if overlap == 0 {
            continue;
        }

        let prefix = previous[previous.len() - overlap..].join("\n");
        let chunk = &mut chunks[index];
        chunk.content = format!("{prefix}\n{}", chunk.content);
        chunk.token_count = estimate_tokens_precise(&chunk.content);
        chunk.metadata.overlap_lines = overlap;
    }

    log::debug!(
        "chunked {} sections worth of content into {} chunks (size {max_chunk_size})",
        packed.len(),
        chunks.len()
    );
    chunks
}

fn flush(packed: &mut Vec<String>, current: &mut Vec<String>, current_tokens: &mut usize) {
    if !current.is_empty() {
        packed.push(current.join("\n"));
        current.clear();
    }
    *current_tokens = 0;
}

fn split_by_lines(section: &str, max_chunk_size: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;

    for line in section.lines() {
        let tokens = estimate_tokens_precise(line);
        if !current.is_empty() && current_tokens + tokens > max_chunk_size {
            pieces.push(current.join("\n"));
            current.clear();
            current_tokens = 0;
        }
        current.push(line);
        current_tokens += tokens;
    }
    if !current.is_empty() {
        pieces.push(current.join("\n"));
    }
    pieces
}

fn describe(text: &str) -> ChunkMetadata {
    let fence_tag = text
        .lines()
        .map(str::trim_start)
        .filter(|line| is_fence(line))
        .map(|line| line.trim_start_matches('`').trim())
        .find(|tag| !tag.is_empty());

    ChunkMetadata {
        has_code: text.lines().any(is_fence) || CODE_LINE.is_match(text),
        has_documentation: text.lines().any(is_header) || DOC_LINE.is_match(text),
        language: fence_tag
            .map(Language::from_fence_tag)
            .filter(|lang| *lang != Language::Unknown)
            .map(|lang| lang.as_str().to_string()),
        overlap_lines: 0,
    }
}

use context_optimizer::{
    estimate_tokens_precise, split_sections, ContentOptimizer, ContextChunk, OptimizationStrategy,
};
use pretty_assertions::assert_eq;

fn sample_document() -> String {
    let mut doc = String::from("# Project\n\nA   small    service.\n\n\n\n");
    doc.push_str("## API\n\nexport function handle(req) {\n  try { return run(req) } catch (err) { throw err }\n}\n\n");
    doc.push_str("## Example\n\n```js\n");
    for i in 0..30 {
        doc.push_str(&format!("console.log({i});\n"));
    }
    doc.push_str("```\n\n");
    for i in 0..40 {
        doc.push_str(&format!("## Note {i}\n\nSome detail about item {i}.\n"));
    }
    doc
}

#[test]
fn compress_is_strictly_shorter_without_blank_runs() {
    let doc = sample_document();
    let result = ContentOptimizer::default().optimize_context(&doc, OptimizationStrategy::Compress, None);

    assert!(result.optimized_content.len() < doc.len());
    assert!(!result.optimized_content.contains("\n\n\n"));

    let mut in_code = false;
    for line in result.optimized_content.lines() {
        if line.trim_start().starts_with("```") {
            in_code = !in_code;
            continue;
        }
        if !in_code {
            assert!(!line.contains("  "), "multi-space run outside code: {line:?}");
        }
    }
    assert!(result.reduction_percentage > 0.0);
}

#[test]
fn budgeted_strategies_never_exceed_budget() {
    let doc = sample_document();
    let optimizer = ContentOptimizer::default();
    for budget in [10, 50, 120, 400] {
        for strategy in [OptimizationStrategy::Summarize, OptimizationStrategy::Selective] {
            let result = optimizer.optimize_context(&doc, strategy, Some(budget));
            assert!(
                result.optimized_tokens <= budget,
                "{strategy} exceeded {budget}: {}",
                result.optimized_tokens
            );
            assert_eq!(result.strategy, strategy);
        }
    }
}

#[test]
fn chunks_cover_every_section_exactly_once() {
    let doc = sample_document();
    let chunks = ContentOptimizer::default()
        .chunk_context(&doc, Some(60))
        .unwrap();
    assert!(chunks.len() > 1);

    let rebuilt = chunks
        .iter()
        .map(ContextChunk::own_content)
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(split_sections(&rebuilt), split_sections(&doc));

    for (index, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, index);
        let own_tokens = estimate_tokens_precise(chunk.own_content());
        assert!(own_tokens <= 60 || chunk.own_content().lines().count() == 1);
    }
}

#[test]
fn token_info_matches_chunk_totals_roughly() {
    let doc = sample_document();
    let optimizer = ContentOptimizer::default();
    let info = optimizer.token_info(&doc);
    assert!(info.total_tokens > 0);
    assert!(info.within_limit);
    assert!(info.breakdown.documentation.tokens > 0);
}

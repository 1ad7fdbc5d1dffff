//! Table formatting utilities for structured output.

use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table,
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};

use crate::cache::CacheRecord;
use crate::search::{BuildReport, SearchResult};

fn base_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(cells: &[&str]) -> Vec<Cell> {
    cells
        .iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
        .collect()
}

/// Summary of one index build.
pub fn create_build_table(report: &BuildReport) -> String {
    let mut table = base_table();
    table.set_header(header(&["Metric", "Value"]));

    table.add_row(vec!["Documents".to_string(), report.documents.to_string()]);
    table.add_row(vec!["Dimension".to_string(), report.dimension.to_string()]);
    table.add_row(vec!["Cache hits".to_string(), report.cache_hits.to_string()]);
    table.add_row(vec!["Computed".to_string(), report.computed.to_string()]);
    table.add_row(vec!["Elapsed".to_string(), format!("{:.2?}", report.elapsed)]);

    if !report.degenerate.is_empty() {
        let ids: Vec<&str> = report.degenerate.iter().map(|id| id.as_str()).collect();
        table.add_row(vec![
            Cell::new("Zero-norm documents"),
            Cell::new(ids.join(", ")).fg(Color::Yellow),
        ]);
    }

    table.to_string()
}

/// Ranked search results with their explanation columns.
pub fn create_results_table(results: &[SearchResult]) -> String {
    let mut table = base_table();
    table.set_header(header(&["#", "Document", "Score", "Overlap", "Keywords", "Words"]));

    for (rank, result) in results.iter().enumerate() {
        let explanation = &result.explanation;
        table.add_row(vec![
            Cell::new(rank + 1).set_alignment(CellAlignment::Right),
            Cell::new(result.doc_id.as_str()).add_attribute(Attribute::Bold),
            Cell::new(format!("{:.4}", result.score)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.0}%", explanation.overlap_ratio * 100.0))
                .set_alignment(CellAlignment::Right),
            Cell::new(explanation.overlapping_keywords.join(", ")),
            Cell::new(explanation.document_word_count).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

/// Overview of the embedding cache contents.
pub fn create_cache_table(
    path: &str,
    records: &[CacheRecord],
    size_bytes: Option<u64>,
) -> String {
    let mut table = base_table();
    table.set_header(header(&["Metric", "Value"]));

    table.add_row(vec!["Path".to_string(), path.to_string()]);
    table.add_row(vec!["Entries".to_string(), records.len().to_string()]);

    let mut dimensions: Vec<usize> = records.iter().map(|r| r.embedding.len()).collect();
    dimensions.sort_unstable();
    dimensions.dedup();
    let dimensions: Vec<String> = dimensions.iter().map(ToString::to_string).collect();
    table.add_row(vec![
        "Dimensions".to_string(),
        if dimensions.is_empty() {
            "-".to_string()
        } else {
            dimensions.join(", ")
        },
    ]);

    // RFC 3339 timestamps in one offset sort lexically
    let oldest = records.iter().map(|r| r.updated_at.as_str()).min();
    let newest = records.iter().map(|r| r.updated_at.as_str()).max();
    table.add_row(vec!["Oldest entry".to_string(), oldest.unwrap_or("-").to_string()]);
    table.add_row(vec!["Newest entry".to_string(), newest.unwrap_or("-").to_string()]);

    if let Some(bytes) = size_bytes {
        table.add_row(vec![
            "Size on disk".to_string(),
            format!("{:.1} KiB", bytes as f64 / 1024.0),
        ]);
    }

    table.to_string()
}

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use pharm_cli::pipeline::review_queue;
use pharm_learn::{StoreExport, StoreStats};
use pharm_map::LearnSummary;
use pharm_model::{MatchResult, Tier};

use crate::commands::MatchOutcome;

pub fn print_match_summary(outcome: &MatchOutcome, review_limit: usize) {
    let summary = &outcome.summary;
    println!("Output: {}", outcome.output.display());
    println!(
        "Matched {} lines in {:.1}s",
        summary.total,
        outcome.elapsed.as_secs_f64()
    );

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Tier"),
        header_cell("Meaning"),
        header_cell("Lines"),
        header_cell("Share"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for tier in Tier::ALL {
        let count = summary.count(tier);
        table.add_row(vec![
            tier_cell(tier),
            Cell::new(tier.description()),
            count_cell(count, tier_color(tier)),
            Cell::new(percent(count, summary.total)),
        ]);
    }
    table.add_row(vec![
        Cell::new("LEARNED").fg(Color::Cyan),
        Cell::new("answered from corrections"),
        count_cell(summary.learned, Color::Cyan),
        Cell::new(percent(summary.learned, summary.total)),
    ]);
    table.add_row(vec![
        Cell::new("MRP").fg(Color::Yellow),
        Cell::new("price needs review"),
        count_cell(summary.mrp_review, Color::Yellow),
        Cell::new(percent(summary.mrp_review, summary.total)),
    ]);
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!(
            "automation rate {:.1}%",
            summary.automation_rate() * 100.0
        ))
        .add_attribute(Attribute::Bold),
        Cell::new(summary.total).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!("{table}");
    print_review_table(&outcome.results, review_limit);
}

fn print_review_table(results: &[MatchResult], limit: usize) {
    let queue = review_queue(results, limit);
    if queue.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Line"),
        header_cell("Invoice item"),
        header_cell("Suggestion"),
        header_cell("Score"),
        header_cell("Tier"),
        header_cell("Details"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for result in queue {
        let line = &result.invoice_line;
        let suggestion = result.suggested_item.as_ref().map_or_else(
            || dim_cell("-"),
            |item| Cell::new(format!("{} {}", item.id, item.raw_name)),
        );
        table.add_row(vec![
            Cell::new(line.line_no.as_deref().unwrap_or("-")),
            Cell::new(&line.raw_item_name),
            suggestion,
            Cell::new(format!("{:.3}", result.final_score)),
            tier_cell(result.tier),
            dim_cell(result.breakdown.explain()),
        ]);
    }
    println!("Review queue (lowest scores first):");
    println!("{table}");
}

pub fn print_learn_summary(summary: &LearnSummary, stats: &StoreStats) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Corrections"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("Recorded"), count_cell(summary.recorded, Color::Green)]);
    table.add_row(vec![
        Cell::new("Unknown item code"),
        count_cell(summary.unknown_item, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Empty item text"),
        count_cell(summary.empty_pattern, Color::Yellow),
    ]);
    table.add_row(vec![Cell::new("Failed"), count_cell(summary.failed, Color::Red)]);
    println!("{table}");
    print_store_stats(stats);
}

pub fn print_store_stats(stats: &StoreStats) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Learning store"), header_cell("Value")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("Learned mappings"), Cell::new(stats.total_mappings)]);
    table.add_row(vec![
        Cell::new("Trusted mappings"),
        count_cell(stats.trusted_mappings, Color::Green),
    ]);
    table.add_row(vec![
        Cell::new("Corrections (human)"),
        Cell::new(format!(
            "{} ({})",
            stats.total_corrections, stats.human_corrections
        )),
    ]);
    table.add_row(vec![Cell::new("Events"), Cell::new(stats.total_events)]);
    table.add_row(vec![
        Cell::new("Last correction"),
        stats.last_correction.map_or_else(
            || dim_cell("-"),
            |at| Cell::new(at.format("%Y-%m-%d %H:%M UTC")),
        ),
    ]);
    println!("{table}");
}

pub fn print_export_summary(export: &StoreExport, path: &std::path::Path) {
    println!(
        "Exported {} mappings and {} events to {}",
        export.mappings.len(),
        export.history.len(),
        path.display()
    );
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn percent(count: usize, total: usize) -> String {
    if total == 0 {
        "-".to_string()
    } else {
        format!("{:.1}%", count as f64 / total as f64 * 100.0)
    }
}

fn tier_color(tier: Tier) -> Color {
    match tier {
        Tier::AutoOk => Color::Green,
        Tier::Check => Color::Yellow,
        Tier::NoMatch => Color::Red,
    }
}

fn tier_cell(tier: Tier) -> Cell {
    Cell::new(tier.as_str())
        .fg(tier_color(tier))
        .add_attribute(Attribute::Bold)
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

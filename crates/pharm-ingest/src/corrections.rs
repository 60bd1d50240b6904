//! Reviewer corrections feed.
//!
//! A corrections file is usually a reviewed copy of the match output: the
//! invoice columns, the suggestion and a `Corrected_Item_Code` filled in by
//! the reviewer. Rows without a corrected code were not reviewed and are
//! skipped.

use std::path::Path;

use pharm_model::{Correction, ItemId};

use crate::error::Result;
use crate::invoice::InvoiceColumns;
use crate::table::CsvTable;

pub const CORRECTED_ITEM: &[&str] = &["Corrected_Item_Code", "Corrected Item Code"];
pub const SUGGESTED_ITEM: &[&str] = &["Suggested_Item_Code", "Suggested Item Code"];
pub const SUGGESTED_SCORE: &[&str] = &["Final_Score", "Suggested_Score"];
pub const REASON: &[&str] = &["Notes", "Reason", "Comment"];
/// `NO`/`FALSE`/`0` marks feedback that did not come from a person.
pub const CONFIRMED_BY_HUMAN: &[&str] = &["Confirmed_By_Human", "Human"];

/// Load corrections in file order.
pub fn load_corrections(path: &Path) -> Result<Vec<Correction>> {
    let table = CsvTable::read(path)?;
    let invoice = InvoiceColumns::locate(&table)?;
    let corrected_col = table.require(CORRECTED_ITEM)?;
    let suggested_col = table.column(SUGGESTED_ITEM);
    let score_col = table.column(SUGGESTED_SCORE);
    let reason_col = table.column(REASON);
    let human_col = table.column(CONFIRMED_BY_HUMAN);

    let mut corrections = Vec::new();
    let mut unreviewed = 0usize;
    for row in table.rows() {
        let Some(corrected) = row.text(Some(corrected_col)) else {
            unreviewed += 1;
            continue;
        };
        let corrected_item_id =
            ItemId::new(corrected).map_err(|_| row.invalid("Corrected_Item_Code", corrected))?;

        let mut correction = Correction::new(invoice.line(&row), corrected_item_id);
        correction.suggested_item_id = row.text(suggested_col).and_then(|v| ItemId::new(v).ok());
        correction.suggested_score = row.number("Final_Score", score_col);
        correction.reason = row.text(reason_col).map(str::to_string);
        correction.confirmed_by_human = row.text(human_col).is_none_or(is_affirmative);
        corrections.push(correction);
    }

    tracing::info!(
        path = %path.display(),
        corrections = corrections.len(),
        unreviewed,
        "loaded corrections"
    );
    Ok(corrections)
}

fn is_affirmative(value: &str) -> bool {
    !matches!(
        value.to_ascii_uppercase().as_str(),
        "NO" | "N" | "FALSE" | "0"
    )
}

//! Match output as CSV, one row per invoice line.

use std::path::Path;

use pharm_model::MatchResult;

use crate::error::{IngestError, Result};

pub const RESULT_COLUMNS: [&str; 23] = [
    "Invoice_No",
    "Line_No",
    "Invoice_Item_Name",
    "Supplier_Name",
    "Qty",
    "Bonus",
    "Unit_Price_Invoice",
    "Effective_Unit_Price",
    "MRP_Invoice",
    "MRP_Invoice_Adjusted",
    "MRP_Master",
    "MRP_Status",
    "Suggested_Item_Code",
    "Suggested_Item_Name",
    "Last_Purchase_Supplier",
    "Last_Purchase_Date",
    "Last_Purchase_Rate",
    "Supplier_Score",
    "MRP_Score",
    "Cost_Score",
    "Final_Score",
    "Tier",
    "Match_Details",
];

/// Write results in input order.
///
/// Besides the columns above, a `Learned_Match` flag and an empty
/// `Corrected_Item_Code` column are appended so the file can be reviewed and
/// fed back as a corrections file.
pub fn write_results(path: &Path, results: &[MatchResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| write_error(path, e))?;
    let header = RESULT_COLUMNS
        .iter()
        .copied()
        .chain(["Learned_Match", "Corrected_Item_Code"]);
    writer
        .write_record(header)
        .map_err(|e| write_error(path, e))?;
    for result in results {
        writer
            .write_record(result_row(result))
            .map_err(|e| write_error(path, e))?;
    }
    writer.flush().map_err(|source| IngestError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), rows = results.len(), "wrote match results");
    Ok(())
}

fn result_row(result: &MatchResult) -> Vec<String> {
    let line = &result.invoice_line;
    let item = result.suggested_item.as_ref();
    let purchase = result.last_purchase.as_ref();
    let breakdown = &result.breakdown;
    vec![
        line.invoice_no.clone().unwrap_or_default(),
        line.line_no.clone().unwrap_or_default(),
        line.raw_item_name.clone(),
        line.supplier.clone(),
        number(Some(line.quantity)),
        number(Some(line.bonus_quantity)),
        number(Some(line.unit_price)),
        number(line.effective_unit_price()),
        number(line.invoice_mrp),
        number(line.adjusted_mrp()),
        number(item.and_then(|item| item.master_mrp())),
        result
            .mrp_status
            .map(|status| status.as_str().to_string())
            .unwrap_or_default(),
        item.map(|item| item.id.to_string()).unwrap_or_default(),
        item.map(|item| item.raw_name.clone()).unwrap_or_default(),
        purchase.map(|p| p.supplier.clone()).unwrap_or_default(),
        purchase
            .and_then(|p| p.date)
            .map(|date| date.to_string())
            .unwrap_or_default(),
        number(purchase.and_then(|p| p.rate)),
        score(breakdown.supplier_score),
        score(breakdown.mrp_score),
        score(breakdown.cost_score),
        score(Some(result.final_score)),
        result.tier.as_str().to_string(),
        breakdown.explain(),
        if result.from_learning { "YES" } else { "NO" }.to_string(),
        String::new(),
    ]
}

fn number(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

fn score(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_default()
}

fn write_error(path: &Path, err: csv::Error) -> IngestError {
    let source = match err.into_kind() {
        csv::ErrorKind::Io(source) => source,
        other => std::io::Error::other(format!("{other:?}")),
    };
    IngestError::FileWrite {
        path: path.to_path_buf(),
        source,
    }
}

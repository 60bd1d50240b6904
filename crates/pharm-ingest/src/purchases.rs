//! Purchase history loading.
//!
//! Two layouts are accepted. A flat file carries a `Supplier` column on
//! every row. An accounting-ledger export instead groups rows under supplier
//! header rows: a row with an empty `Particulars` cell whose `Date.` cell
//! holds text names the supplier of the rows below it.

use std::path::Path;

use pharm_map::PurchaseRecord;

use crate::error::Result;
use crate::table::{CsvTable, parse_date};

pub const PARTICULARS: &[&str] = &["Particulars", "Item Name", "Item_Name"];
pub const SUPPLIER: &[&str] = &["Supplier", "Supplier_Name"];
pub const DATE: &[&str] = &["Date.", "Date"];
pub const RATE: &[&str] = &["P.Rate", "Rate"];
pub const BILL_NO: &[&str] = &["Bill No.", "Bill No", "Bill_No"];

/// Load purchase records in file order.
pub fn load_purchases(path: &Path) -> Result<Vec<PurchaseRecord>> {
    let table = CsvTable::read(path)?;
    let particulars_col = table.require(PARTICULARS)?;
    let supplier_col = table.column(SUPPLIER);
    let date_col = table.column(DATE);
    let rate_col = table.column(RATE);
    let bill_col = table.column(BILL_NO);

    let mut records = Vec::with_capacity(table.len());
    let mut current_supplier: Option<String> = None;
    for row in table.rows() {
        let Some(item_name) = row.text(Some(particulars_col)) else {
            // Ledger header row: supplier name in the date column.
            if row.text(bill_col).is_none()
                && let Some(label) = row.text(date_col).filter(|v| parse_date(v).is_none())
            {
                current_supplier = Some(label.to_string());
            }
            continue;
        };

        let supplier = row
            .text(supplier_col)
            .map(str::to_string)
            .or_else(|| current_supplier.clone())
            .unwrap_or_default();
        records.push(PurchaseRecord {
            supplier,
            item_name: item_name.to_string(),
            date: row.date("Date.", date_col),
            rate: row.number("P.Rate", rate_col),
        });
    }

    tracing::info!(
        path = %path.display(),
        records = records.len(),
        "loaded purchase history"
    );
    Ok(records)
}

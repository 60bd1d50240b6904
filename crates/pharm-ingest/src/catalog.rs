//! Master catalog loading.

use std::path::Path;

use pharm_model::{CatalogItem, ItemId, validate_catalog};

use crate::error::{IngestError, Result};
use crate::table::CsvTable;

pub const ITEM_CODE: &[&str] = &["Item Code", "Item_Code", "item_id"];
pub const ITEM_NAME: &[&str] = &["Item Name", "Item_Name", "raw_name"];
pub const NORMALIZED_NAME: &[&str] = &["Normalized Name", "normalized_name"];
/// Net purchase cost per unit.
pub const BUY_RATE: &[&str] = &["B.Rate", "Buy_Rate", "buy_rate"];
/// MRP without VAT.
pub const SELL_RATE: &[&str] = &["S.Rate", "Sell_Rate", "sell_rate"];

/// Load and validate the master catalog.
///
/// `Item Code` and `Item Name` are required; rate columns are optional and
/// unparseable rates read as unknown. The loaded catalog must pass
/// [`validate_catalog`].
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogItem>> {
    let table = CsvTable::read(path)?;
    let code_col = table.require(ITEM_CODE)?;
    let name_col = table.require(ITEM_NAME)?;
    let normalized_col = table.column(NORMALIZED_NAME);
    let buy_col = table.column(BUY_RATE);
    let sell_col = table.column(SELL_RATE);

    let mut items = Vec::with_capacity(table.len());
    for row in table.rows() {
        let code = row.text(Some(code_col)).unwrap_or_default();
        let id = ItemId::new(code).map_err(|_| row.invalid("Item Code", code))?;
        let name = row.text(Some(name_col)).unwrap_or_default();

        let mut item = CatalogItem::new(id, name, row.text(normalized_col).unwrap_or_default());
        item.buy_rate = row.number("B.Rate", buy_col);
        item.sell_rate = row.number("S.Rate", sell_col);
        items.push(item);
    }

    validate_catalog(&items).map_err(|source| IngestError::Rejected {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), items = items.len(), "loaded catalog");
    Ok(items)
}

//! Invoice line loading.

use std::path::Path;

use pharm_model::{InvoiceLine, validate_invoice};

use crate::error::{IngestError, Result};
use crate::table::{CsvTable, Row};

pub const INVOICE_NO: &[&str] = &["Invoice_No", "Invoice No"];
pub const LINE_NO: &[&str] = &["Line_No", "Line No"];
pub const ITEM_NAME: &[&str] = &["Invoice_Item_Name", "Item Name", "Particulars"];
pub const SUPPLIER: &[&str] = &["Supplier_Name", "Supplier"];
pub const QUANTITY: &[&str] = &["Qty", "Quantity"];
pub const BONUS: &[&str] = &["Bonus", "Free"];
pub const UNIT_PRICE: &[&str] = &["Unit_Price", "Unit_Price_Invoice"];
pub const MRP: &[&str] = &["MRP_Invoice", "MRP"];
/// VAT as a fraction or a percentage.
pub const VAT: &[&str] = &["VAT_Amount_or_%", "VAT"];

/// Load invoice lines in file order.
///
/// Only the item-name column is required. Missing numbers default to 0 for
/// quantities and price, and to absent for MRP and VAT.
pub fn load_invoice(path: &Path) -> Result<Vec<InvoiceLine>> {
    let table = CsvTable::read(path)?;
    let columns = InvoiceColumns::locate(&table)?;
    let lines: Vec<InvoiceLine> = table.rows().map(|row| columns.line(&row)).collect();

    validate_invoice(&lines).map_err(|source| IngestError::Rejected {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), lines = lines.len(), "loaded invoice");
    Ok(lines)
}

/// Column positions of the invoice fields in one table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InvoiceColumns {
    invoice_no: Option<usize>,
    line_no: Option<usize>,
    item_name: usize,
    supplier: Option<usize>,
    quantity: Option<usize>,
    bonus: Option<usize>,
    unit_price: Option<usize>,
    mrp: Option<usize>,
    vat: Option<usize>,
}

impl InvoiceColumns {
    pub(crate) fn locate(table: &CsvTable) -> Result<Self> {
        Ok(Self {
            invoice_no: table.column(INVOICE_NO),
            line_no: table.column(LINE_NO),
            item_name: table.require(ITEM_NAME)?,
            supplier: table.column(SUPPLIER),
            quantity: table.column(QUANTITY),
            bonus: table.column(BONUS),
            unit_price: table.column(UNIT_PRICE),
            mrp: table.column(MRP),
            vat: table.column(VAT),
        })
    }

    pub(crate) fn line(&self, row: &Row<'_>) -> InvoiceLine {
        let mut line = InvoiceLine::new(
            row.text(self.supplier).unwrap_or_default(),
            row.text(Some(self.item_name)).unwrap_or_default(),
        )
        .with_quantities(
            row.number("Qty", self.quantity).unwrap_or(0.0),
            row.number("Bonus", self.bonus).unwrap_or(0.0),
        )
        .with_unit_price(row.number("Unit_Price", self.unit_price).unwrap_or(0.0));
        line.invoice_no = row.text(self.invoice_no).map(str::to_string);
        line.line_no = row.text(self.line_no).map(str::to_string);
        line.invoice_mrp = row.number("MRP_Invoice", self.mrp);
        line.vat_rate = row.number("VAT", self.vat);
        line
    }
}

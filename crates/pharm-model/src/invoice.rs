//! Invoice lines and the derived values the matcher compares against the catalog.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Relative MRP deviation up to which the invoice price is accepted as is.
const MRP_OK_DEVIATION: f64 = 0.05;
/// Relative MRP deviation up to which the invoice price only needs a look.
const MRP_CHECK_DEVIATION: f64 = 0.10;

/// One transaction line of a supplier invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// Invoice number, when the loader knows it.
    #[serde(default)]
    pub invoice_no: Option<String>,
    /// Line number within the invoice.
    #[serde(default)]
    pub line_no: Option<String>,
    /// Supplier name as printed on the invoice.
    pub supplier: String,
    /// Free-text item description.
    pub raw_item_name: String,
    /// Billed quantity.
    pub quantity: f64,
    /// Free (bonus) units delivered on top of the billed quantity.
    pub bonus_quantity: f64,
    /// Unit price as billed.
    pub unit_price: f64,
    /// MRP printed on the invoice (VAT inclusive), if any.
    #[serde(default)]
    pub invoice_mrp: Option<f64>,
    /// VAT as either a rate (`0.05`) or a percentage (`5`).
    #[serde(default)]
    pub vat_rate: Option<f64>,
}

impl InvoiceLine {
    pub fn new(supplier: impl Into<String>, raw_item_name: impl Into<String>) -> Self {
        Self {
            invoice_no: None,
            line_no: None,
            supplier: supplier.into(),
            raw_item_name: raw_item_name.into(),
            quantity: 0.0,
            bonus_quantity: 0.0,
            unit_price: 0.0,
            invoice_mrp: None,
            vat_rate: None,
        }
    }

    #[must_use]
    pub fn with_quantities(mut self, quantity: f64, bonus_quantity: f64) -> Self {
        self.quantity = quantity;
        self.bonus_quantity = bonus_quantity;
        self
    }

    #[must_use]
    pub fn with_unit_price(mut self, unit_price: f64) -> Self {
        self.unit_price = unit_price;
        self
    }

    #[must_use]
    pub fn with_mrp(mut self, mrp: f64, vat_rate: Option<f64>) -> Self {
        self.invoice_mrp = Some(mrp);
        self.vat_rate = vat_rate;
        self
    }

    /// Unit cost after spreading the billed amount over bonus units.
    ///
    /// `None` when there is no billed quantity or no positive price.
    pub fn effective_unit_price(&self) -> Option<f64> {
        let total_units = self.quantity + self.bonus_quantity;
        if !(self.quantity > 0.0 && total_units > 0.0 && self.unit_price > 0.0) {
            return None;
        }
        let price = self.unit_price * self.quantity / total_units;
        price.is_finite().then_some(price)
    }

    /// VAT as a fraction: values above 1 are read as percentages.
    pub fn normalized_vat_rate(&self) -> f64 {
        match self.vat_rate {
            Some(rate) if rate.is_finite() && rate > 1.0 => rate / 100.0,
            Some(rate) if rate.is_finite() && rate > 0.0 => rate,
            _ => 0.0,
        }
    }

    /// Invoice MRP with VAT removed, comparable to the catalog sell rate.
    pub fn adjusted_mrp(&self) -> Option<f64> {
        let mrp = self.invoice_mrp.filter(|mrp| mrp.is_finite() && *mrp > 0.0)?;
        Some(mrp / (1.0 + self.normalized_vat_rate()))
    }

    /// Review status of the invoice MRP against a catalog MRP.
    pub fn mrp_status(&self, master_mrp: Option<f64>) -> Option<MrpStatus> {
        let invoice = self.adjusted_mrp()?;
        let master = master_mrp.filter(|mrp| mrp.is_finite() && *mrp > 0.0)?;
        let deviation = (invoice - master).abs() / master;
        Some(if deviation <= MRP_OK_DEVIATION {
            MrpStatus::Ok
        } else if deviation <= MRP_CHECK_DEVIATION {
            MrpStatus::Check
        } else {
            MrpStatus::Overcharged
        })
    }
}

/// Outcome of comparing the invoice MRP with the catalog MRP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MrpStatus {
    /// Within 5% of the catalog MRP.
    Ok,
    /// Between 5% and 10% off.
    Check,
    /// More than 10% off.
    Overcharged,
}

impl MrpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Check => "CHECK",
            Self::Overcharged => "OVERCHARGED",
        }
    }

    /// Whether a reviewer should look at the price.
    pub fn needs_review(&self) -> bool {
        !matches!(self, Self::Ok)
    }
}

/// Reject an empty invoice before the pipeline starts.
pub fn validate_invoice(lines: &[InvoiceLine]) -> Result<()> {
    if lines.is_empty() {
        return Err(ModelError::EmptyInvoice);
    }
    Ok(())
}

//! Report
//!
//! Plain-text tables of branch listings and single-record resolutions.

use std::io;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{Findable, Money, iso::Currency};
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use thiserror::Error;

use crate::{
    entities::{Entity, Field},
    listing::BranchRow,
    resolution::EffectiveView,
    values::Value,
};

/// Errors that can occur when writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Currency code not recognised.
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Look up an ISO currency by code.
///
/// # Errors
///
/// Returns [`ReportError::UnknownCurrency`] for unknown codes.
pub fn currency(code: &str) -> Result<&'static Currency, ReportError> {
    Currency::find(code.trim()).ok_or_else(|| ReportError::UnknownCurrency(code.to_string()))
}

/// Format a value for display; amounts are shown as money in `currency`.
pub fn format_value(value: Option<&Value>, currency: &Currency) -> String {
    match value {
        None => "-".to_string(),
        Some(Value::Amount(amount)) => format_amount(*amount, currency),
        Some(other) => other.to_string(),
    }
}

fn format_amount(amount: Decimal, currency: &Currency) -> String {
    let minor = amount
        .checked_mul(Decimal::from(10_u64.pow(currency.exponent)))
        .map(|scaled| scaled.round_dp(0))
        .and_then(|scaled| scaled.to_i64());

    match minor {
        Some(minor) => Money::from_minor(minor, currency).to_string(),
        None => amount.to_string(),
    }
}

/// Write a branch listing as a table.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_listing<E: Entity>(
    mut out: impl io::Write,
    rows: &[BranchRow<E>],
    currency: &Currency,
) -> Result<(), ReportError> {
    let mut builder = Builder::default();

    builder.push_record(["ID", "Scope", "Name", "Value", "Active", "Overridden"]);

    for row in rows {
        let record = match row {
            BranchRow::General(view) => [
                view.id.to_string(),
                "general".to_string(),
                view.name().unwrap_or_default().to_string(),
                E::HEADLINE_FIELD.map_or_else(String::new, |field| {
                    format_value(view.effective(field), currency)
                }),
                yes_no(view.effective_active),
                yes_no(view.is_overridden),
            ],
            BranchRow::Local(record) => {
                let attributes = record.attributes();

                [
                    record.id().to_string(),
                    "local".to_string(),
                    attributes
                        .master(E::NAME_FIELD)
                        .map(|name| name.to_string())
                        .unwrap_or_default(),
                    E::HEADLINE_FIELD.map_or_else(String::new, |field| {
                        format_value(attributes.master(field).as_ref(), currency)
                    }),
                    yes_no(record.is_active()),
                    String::new(),
                ]
            }
        };

        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.modify(Columns::new(3..4), Alignment::right());

    writeln!(out, "{table}")?;

    Ok(())
}

/// Write one resolved record field by field.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_view<E: Entity>(
    mut out: impl io::Write,
    view: &EffectiveView<E>,
    currency: &Currency,
) -> Result<(), ReportError> {
    let mut builder = Builder::default();

    builder.push_record(["Field", "Master", "Effective", "Overridden"]);

    for resolved in &view.fields {
        builder.push_record([
            resolved.field.wire_name().to_string(),
            format_value(resolved.master.as_ref(), currency),
            format_value(resolved.effective.as_ref(), currency),
            marker(resolved.is_overridden),
        ]);
    }

    builder.push_record([
        "is_active".to_string(),
        yes_no(view.master_active),
        yes_no(view.effective_active),
        marker(view.active_overridden),
    ]);

    let mut table = builder.build();
    table.with(Style::modern_rounded());

    let summary = if view.is_overridden {
        "overridden at this branch"
    } else {
        "inherits the general record"
    };

    writeln!(out, "{} {}: {summary}\n{table}", E::KIND, view.id)?;

    Ok(())
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

fn marker(flag: bool) -> String {
    if flag { "*" } else { "" }.to_string()
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        catalog::Catalog,
        entities::{Product, ProductField},
        ids::BranchId,
        listing::ScopeFilter,
        overrides::OverridePatch,
    };

    use super::*;

    fn catalog() -> Result<Catalog<Product>, Box<dyn std::error::Error>> {
        let mut catalog = Catalog::new();

        catalog.create_general("prd-1".into(), Product::new("Kopi Susu", Decimal::from(18_000)))?;
        catalog.create_local(
            "prd-9".into(),
            BranchId::new("jkt"),
            Product::new("Pisang Goreng", Decimal::from(8_000)),
        )?;
        catalog.apply_override(
            &BranchId::new("jkt"),
            &"prd-1".into(),
            &OverridePatch::new().set(ProductField::Name, "Kopi Susu Aren"),
        )?;

        Ok(catalog)
    }

    #[test]
    fn listing_table_shows_every_row() -> TestResult {
        let catalog = catalog()?;
        let rows = catalog.branch_listing(&BranchId::new("jkt"), ScopeFilter::All)?;

        let mut out = Vec::new();
        write_listing(&mut out, &rows, currency("IDR")?)?;
        let text = String::from_utf8(out)?;

        assert!(text.contains("Kopi Susu Aren"), "effective name shown");
        assert!(text.contains("Pisang Goreng"), "local row shown");
        assert!(text.contains("general") && text.contains("local"));

        Ok(())
    }

    #[test]
    fn view_table_marks_overridden_fields() -> TestResult {
        let catalog = catalog()?;
        let view = catalog.resolve(&BranchId::new("jkt"), &"prd-1".into())?;

        let mut out = Vec::new();
        write_view(&mut out, &view, currency("IDR")?)?;
        let text = String::from_utf8(out)?;

        assert!(text.contains("branch_product_name"));
        assert!(text.contains("overridden at this branch"));

        Ok(())
    }

    #[test]
    fn unknown_currency_is_rejected() {
        assert!(matches!(
            currency("XYZ1"),
            Err(ReportError::UnknownCurrency(_))
        ));
    }

    #[test]
    fn missing_values_render_as_dash() -> TestResult {
        assert_eq!(format_value(None, currency("IDR")?), "-");
        assert_eq!(
            format_value(Some(&Value::Percentage(Decimal::from(15))), currency("IDR")?),
            "15%"
        );

        Ok(())
    }
}

//! Wire Adapter
//!
//! The backend is not consistent about how it encodes some fields. This module
//! normalizes those encodings into the canonical model before anything else
//! sees them, and turns override payloads into [`OverridePatch`]es.

use std::str::FromStr;

use jiff::Timestamp;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::{Map, Number, Value as Json, json};
use thiserror::Error;

use crate::{
    entities::{Entity, Field},
    overrides::{BranchOverride, OverridePatch, PatchOp},
    resolution::{ValidationError, ValidationErrorKind},
    values::{Value, ValueKind},
};

/// Wire key of the branch availability flag.
pub const ACTIVE_AT_BRANCH: &str = "is_active_at_branch";

/// Wire adapter errors
#[derive(Debug, Error)]
pub enum WireError {
    /// Override payloads must be JSON objects.
    #[error("override payload must be a JSON object")]
    NotAnObject,

    /// JSON text could not be parsed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A field in the payload was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIdList {
    Text(String),
    Items(Vec<RawId>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Scalar(RawScalar),
    Relation(Relation),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
struct Relation {
    #[serde(default)]
    id: Option<RawScalar>,

    #[serde(default)]
    category_id: Option<RawScalar>,

    #[serde(default)]
    product_id: Option<RawScalar>,
}

impl From<RawScalar> for String {
    fn from(scalar: RawScalar) -> Self {
        match scalar {
            RawScalar::Text(text) => text,
            RawScalar::Number(number) => number.to_string(),
        }
    }
}

impl RawId {
    /// The referenced id. Pivot rows carry their own `id` next to the target
    /// id, so `<kind>_id` wins over `id`.
    fn into_id(self) -> Option<String> {
        match self {
            RawId::Scalar(scalar) => Some(scalar.into()),
            RawId::Relation(relation) => relation
                .category_id
                .or(relation.product_id)
                .or(relation.id)
                .map(String::from),
        }
    }
}

fn relation_ids<E: serde::de::Error>(items: Vec<RawId>) -> Result<Vec<String>, E> {
    items
        .into_iter()
        .map(RawId::into_id)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| E::custom("relation object without an id"))
}

/// Deserialize a list of ids from any of the encodings the backend uses:
/// an array of ids, an array of relation objects (`{"id": ..}`,
/// `{"category_id": ..}`, `{"product_id": ..}`), a JSON array encoded as a
/// string, a comma-separated string, or null.
///
/// Ids are trimmed, blanks dropped and duplicates removed, first one kept.
///
/// # Errors
///
/// Fails when the input is none of the above.
pub fn id_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = Option::<RawIdList>::deserialize(deserializer)?;

    let ids: Vec<String> = match raw {
        None => Vec::new(),
        Some(RawIdList::Items(items)) => relation_ids::<D::Error>(items)?,
        Some(RawIdList::Text(text)) => {
            let text = text.trim();

            if text.starts_with('[') {
                let items = serde_json::from_str::<Vec<RawId>>(text).map_err(D::Error::custom)?;

                relation_ids::<D::Error>(items)?
            } else {
                text.split(',').map(str::to_string).collect()
            }
        }
    };

    let mut seen = FxHashSet::default();

    Ok(ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.clone()))
        .collect())
}

/// Normalize an id list held in a JSON value.
///
/// # Errors
///
/// See [`id_list`].
pub fn normalize_id_list(value: Json) -> Result<Vec<String>, WireError> {
    Ok(id_list(value)?)
}

/// Build an override patch for `general` from a JSON object keyed by wire
/// names.
///
/// `null` (and blank text) resets a field to inherit. Numbers may be JSON
/// numbers or numeric strings; timestamps are RFC 3339 strings. The kind of
/// each value follows the field on `general`, so a discount's `value` becomes
/// a percentage or an amount according to its type. Bounds are not checked
/// here, that happens when the patch is applied.
///
/// # Errors
///
/// - [`WireError::NotAnObject`]: `payload` is not an object.
/// - [`WireError::Validation`]: unknown key, or a value that cannot be read as
///   the field's kind.
pub fn parse_patch<E: Entity>(
    general: &E,
    payload: &Json,
) -> Result<OverridePatch<E::Field>, WireError> {
    let object = payload.as_object().ok_or(WireError::NotAnObject)?;
    let mut patch = OverridePatch::new();

    for (key, value) in object {
        if key == ACTIVE_AT_BRANCH {
            patch.push_active(parse_flag(value)?);
            continue;
        }

        let field = E::Field::from_wire_name(key)
            .ok_or_else(|| ValidationError::new(key.as_str(), ValidationErrorKind::UnknownField))?;

        patch.push(field, parse_value(field, general.field_kind(field), value)?);
    }

    Ok(patch)
}

/// Parse a JSON text override payload.
///
/// # Errors
///
/// See [`parse_patch`]; also fails on invalid JSON.
pub fn parse_patch_str<E: Entity>(
    general: &E,
    payload: &str,
) -> Result<OverridePatch<E::Field>, WireError> {
    parse_patch(general, &serde_json::from_str(payload)?)
}

/// Serialize an override as the JSON object the backend expects.
pub fn override_to_json<E: Entity>(ovr: &BranchOverride<E>) -> Json {
    let mut object = Map::new();

    object.insert("branch_id".to_string(), json!(ovr.branch().as_str()));
    object.insert(
        format!("{}_id", E::KIND.as_str()),
        json!(ovr.entity().as_str()),
    );

    for field in E::Field::ALL {
        let value = ovr.field(*field).map_or(Json::Null, value_to_json);

        object.insert(field.wire_name().to_string(), value);
    }

    object.insert(
        ACTIVE_AT_BRANCH.to_string(),
        ovr.is_active_at_branch().map_or(Json::Null, Json::Bool),
    );

    Json::Object(object)
}

/// JSON form of a value. Numbers stay numbers.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Text(text) => Json::String(text.clone()),
        Value::Amount(number) | Value::Percentage(number) => decimal_to_json(*number),
        Value::Instant(at) => Json::String(at.to_string()),
    }
}

fn decimal_to_json(number: Decimal) -> Json {
    let normalized = number.normalize();

    if normalized.scale() == 0 {
        if let Some(integer) = normalized.to_i64() {
            return Json::Number(integer.into());
        }
    }

    normalized
        .to_f64()
        .and_then(Number::from_f64)
        .map_or_else(|| Json::String(normalized.to_string()), Json::Number)
}

fn parse_flag(value: &Json) -> Result<PatchOp<bool>, ValidationError> {
    match value {
        Json::Null => Ok(PatchOp::Inherit),
        Json::Bool(flag) => Ok(PatchOp::Set(*flag)),
        Json::String(text) => match text.trim() {
            "true" | "1" => Ok(PatchOp::Set(true)),
            "false" | "0" => Ok(PatchOp::Set(false)),
            "" => Ok(PatchOp::Inherit),
            other => Err(malformed(ACTIVE_AT_BRANCH, other)),
        },
        Json::Number(number) => match number.as_i64() {
            Some(1) => Ok(PatchOp::Set(true)),
            Some(0) => Ok(PatchOp::Set(false)),
            _ => Err(malformed(ACTIVE_AT_BRANCH, &number.to_string())),
        },
        Json::Array(_) | Json::Object(_) => Err(malformed(ACTIVE_AT_BRANCH, &value.to_string())),
    }
}

fn parse_value<F: Field>(
    field: F,
    kind: ValueKind,
    value: &Json,
) -> Result<PatchOp<Value>, ValidationError> {
    let name = field.wire_name();

    if let Json::String(text) = value {
        if text.trim().is_empty() {
            return Ok(PatchOp::Inherit);
        }
    }

    let parsed = match (kind, value) {
        (_, Json::Null) => return Ok(PatchOp::Inherit),
        (ValueKind::Text, Json::String(text)) => Value::Text(text.trim().to_string()),
        (ValueKind::Amount, _) => Value::Amount(parse_decimal(name, value)?),
        (ValueKind::Percentage, _) => Value::Percentage(parse_decimal(name, value)?),
        (ValueKind::Instant, Json::String(text)) => Value::Instant(
            Timestamp::from_str(text.trim()).map_err(|error| malformed(name, &error.to_string()))?,
        ),
        (ValueKind::Text | ValueKind::Instant, other) => {
            return Err(ValidationError::new(
                name,
                ValidationErrorKind::KindMismatch {
                    expected: kind,
                    found: json_kind(other),
                },
            ));
        }
    };

    Ok(PatchOp::Set(parsed))
}

fn parse_decimal(name: &str, value: &Json) -> Result<Decimal, ValidationError> {
    let text = match value {
        Json::Number(number) => number.to_string(),
        Json::String(text) => text.trim().to_string(),
        Json::Null | Json::Bool(_) | Json::Array(_) | Json::Object(_) => {
            return Err(malformed(name, &value.to_string()));
        }
    };

    if let Ok(float) = text.parse::<f64>() {
        if !float.is_finite() {
            return Err(ValidationError::new(name, ValidationErrorKind::NonFinite));
        }
    }

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|error| malformed(name, &error.to_string()))
}

fn json_kind(value: &Json) -> ValueKind {
    match value {
        Json::Number(_) => ValueKind::Amount,
        Json::Null | Json::Bool(_) | Json::String(_) | Json::Array(_) | Json::Object(_) => {
            ValueKind::Text
        }
    }
}

fn malformed(field: &str, detail: &str) -> ValidationError {
    ValidationError::new(field, ValidationErrorKind::Malformed(detail.to_string()))
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        entities::{Discount, DiscountField, DiscountType, Product, ProductField},
        ids::BranchId,
        records::Record,
        resolution::apply_override,
    };

    use super::*;

    fn product() -> Product {
        Product::new("Kopi Susu", Decimal::from(18_000))
    }

    #[test]
    fn id_lists_accept_every_encoding() -> TestResult {
        let expected = vec!["c1".to_string(), "c2".to_string()];

        assert_eq!(normalize_id_list(json!(["c1", "c2"]))?, expected);
        assert_eq!(normalize_id_list(json!("[\"c1\",\"c2\"]"))?, expected);
        assert_eq!(normalize_id_list(json!("c1, c2"))?, expected);
        assert_eq!(
            normalize_id_list(json!([{"id": "c1"}, {"category_id": "c2"}]))?,
            expected
        );
        assert_eq!(normalize_id_list(json!(null))?, Vec::<String>::new());
        assert_eq!(normalize_id_list(json!(""))?, Vec::<String>::new());

        Ok(())
    }

    #[test]
    fn id_lists_dedup_and_stringify_numbers() -> TestResult {
        assert_eq!(
            normalize_id_list(json!([7, "7", {"product_id": 8}]))?,
            vec!["7".to_string(), "8".to_string()]
        );

        Ok(())
    }

    #[test]
    fn pivot_rows_yield_the_target_id() -> TestResult {
        assert_eq!(
            normalize_id_list(json!([{"id": 11, "discount_id": "d1", "category_id": "c1"}]))?,
            vec!["c1".to_string()]
        );
        assert_eq!(
            normalize_id_list(json!("[{\"id\": 3, \"product_id\": \"p1\"}]"))?,
            vec!["p1".to_string()]
        );

        Ok(())
    }

    #[test]
    fn id_lists_reject_garbage() {
        assert!(normalize_id_list(json!(true)).is_err());
        assert!(normalize_id_list(json!("[not json")).is_err());
        assert!(normalize_id_list(json!([{"discount_id": "d1"}])).is_err());
    }

    #[test]
    fn patch_reads_wire_names_and_nulls() -> TestResult {
        let patch = parse_patch(
            &product(),
            &json!({
                "sale_price": "20000",
                "branch_product_name": null,
                "is_active_at_branch": false
            }),
        )?;

        assert_eq!(
            patch.field(ProductField::SalePrice),
            Some(&PatchOp::Set(Value::Amount(Decimal::from(20_000))))
        );
        assert_eq!(patch.field(ProductField::Name), Some(&PatchOp::Inherit));
        assert_eq!(patch.field(ProductField::ImageUrl), None);
        assert_eq!(patch.is_active_at_branch(), Some(&PatchOp::Set(false)));

        Ok(())
    }

    #[test]
    fn patch_value_kind_follows_discount_type() -> TestResult {
        let discount = Discount::new("Member Day", DiscountType::Percentage, Decimal::from(10));
        let patch = parse_patch(&discount, &json!({"value": 12.5}))?;

        assert_eq!(
            patch.field(DiscountField::Value),
            Some(&PatchOp::Set(Value::Percentage(Decimal::new(125, 1))))
        );

        Ok(())
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let result = parse_patch(&product(), &json!({"purchase_price": 1}));

        assert!(matches!(
            result,
            Err(WireError::Validation(ValidationError {
                kind: ValidationErrorKind::UnknownField,
                ref field,
            })) if field == "purchase_price"
        ));
    }

    #[test]
    fn patch_rejects_non_finite_numbers() {
        let result = parse_patch(&product(), &json!({"sale_price": "NaN"}));

        assert!(matches!(
            result,
            Err(WireError::Validation(ValidationError {
                kind: ValidationErrorKind::NonFinite,
                ..
            }))
        ));
    }

    #[test]
    fn patch_rejects_non_objects() {
        assert!(matches!(
            parse_patch(&product(), &json!([1, 2])),
            Err(WireError::NotAnObject)
        ));
    }

    #[test]
    fn patch_parses_timestamps() -> TestResult {
        let discount = Discount::new("Promo", DiscountType::Amount, Decimal::from(5_000));
        let patch = parse_patch_str(&discount, r#"{"ends_at": "2026-12-31T17:00:00Z"}"#)?;

        assert_eq!(
            patch.field(DiscountField::EndsAt),
            Some(&PatchOp::Set(Value::Instant("2026-12-31T17:00:00Z".parse()?)))
        );

        Ok(())
    }

    #[test]
    fn override_serializes_numbers_as_numbers() -> TestResult {
        let general = Record::general("prd-1", product());
        let patch = parse_patch(
            &product(),
            &json!({"sale_price": 20000, "branch_product_name": "Custom"}),
        )?;
        let ovr = apply_override(&general, None, &BranchId::new("jkt"), &patch)?;

        let json = override_to_json(&ovr);

        assert_eq!(json["sale_price"], json!(20000));
        assert_eq!(json["branch_product_name"], json!("Custom"));
        assert_eq!(json["branch_image_url"], Json::Null);
        assert_eq!(json["product_id"], json!("prd-1"));
        assert_eq!(json["is_active_at_branch"], Json::Null);

        Ok(())
    }

    #[test]
    fn fractional_amounts_stay_numeric() {
        assert_eq!(
            value_to_json(&Value::Percentage(Decimal::new(125, 1))),
            json!(12.5)
        );
    }
}

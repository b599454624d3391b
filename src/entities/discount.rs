//! Discounts

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    entities::{Entity, EntityKind, Field},
    resolution::{EffectiveView, ValidationError, ValidationErrorKind},
    values::{Value, ValueKind},
    wire::id_list,
};

/// How a discount's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `value` is a percentage in `[0, 100]`
    #[serde(alias = "percentage")]
    Percentage,

    /// `value` is a currency amount
    #[serde(alias = "amount", alias = "NOMINAL", alias = "nominal")]
    Amount,
}

/// What a discount applies to, as sent by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppliesTo {
    /// Whole transaction
    #[default]
    #[serde(alias = "all")]
    All,

    /// Listed categories
    #[serde(alias = "category", alias = "CATEGORIES", alias = "categories")]
    Category,

    /// Listed products
    #[serde(alias = "product", alias = "PRODUCTS", alias = "products")]
    Product,
}

/// Resolved discount target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountTarget<'a> {
    /// Whole transaction
    All,

    /// Listed category ids
    Categories(&'a [String]),

    /// Listed product ids
    Products(&'a [String]),
}

/// Discount attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    /// Display name
    pub name: String,

    /// Interpretation of `value`
    pub discount_type: DiscountType,

    /// Percentage or amount off
    pub value: Decimal,

    /// Minimum transaction subtotal before the discount applies
    #[serde(default)]
    pub min_purchase: Option<Decimal>,

    /// Cap on the amount taken off
    #[serde(default)]
    pub max_discount: Option<Decimal>,

    /// Start of the activation window
    #[serde(default)]
    pub starts_at: Option<Timestamp>,

    /// End of the activation window
    #[serde(default)]
    pub ends_at: Option<Timestamp>,

    /// Target selector
    #[serde(default)]
    pub applies_to: AppliesTo,

    /// Category ids when targeting categories
    #[serde(default, deserialize_with = "id_list")]
    pub category_ids: Vec<String>,

    /// Product ids when targeting products
    #[serde(default, deserialize_with = "id_list")]
    pub product_ids: Vec<String>,
}

impl Discount {
    /// Create an untargeted discount without window or thresholds.
    pub fn new(name: impl Into<String>, discount_type: DiscountType, value: Decimal) -> Self {
        Self {
            name: name.into(),
            discount_type,
            value,
            min_purchase: None,
            max_discount: None,
            starts_at: None,
            ends_at: None,
            applies_to: AppliesTo::All,
            category_ids: Vec::new(),
            product_ids: Vec::new(),
        }
    }

    /// The entities this discount applies to.
    pub fn target(&self) -> DiscountTarget<'_> {
        match self.applies_to {
            AppliesTo::All => DiscountTarget::All,
            AppliesTo::Category => DiscountTarget::Categories(&self.category_ids),
            AppliesTo::Product => DiscountTarget::Products(&self.product_ids),
        }
    }
}

/// Overridable discount fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiscountField {
    /// Branch-specific display name
    Name,

    /// Branch-specific percentage or amount
    Value,

    /// Branch-specific purchase threshold
    MinPurchase,

    /// Branch-specific cap
    MaxDiscount,

    /// Branch-specific window start
    StartsAt,

    /// Branch-specific window end
    EndsAt,
}

impl Field for DiscountField {
    const ALL: &'static [Self] = &[
        DiscountField::Name,
        DiscountField::Value,
        DiscountField::MinPurchase,
        DiscountField::MaxDiscount,
        DiscountField::StartsAt,
        DiscountField::EndsAt,
    ];

    fn wire_name(self) -> &'static str {
        match self {
            DiscountField::Name => "branch_discount_name",
            DiscountField::Value => "value",
            DiscountField::MinPurchase => "min_purchase",
            DiscountField::MaxDiscount => "max_discount",
            DiscountField::StartsAt => "starts_at",
            DiscountField::EndsAt => "ends_at",
        }
    }
}

impl Entity for Discount {
    type Field = DiscountField;

    const KIND: EntityKind = EntityKind::Discount;
    const NAME_FIELD: DiscountField = DiscountField::Name;
    const HEADLINE_FIELD: Option<DiscountField> = Some(DiscountField::Value);

    fn master(&self, field: DiscountField) -> Option<Value> {
        match field {
            DiscountField::Name => Some(Value::from(self.name.as_str())),
            DiscountField::Value => Some(match self.discount_type {
                DiscountType::Percentage => Value::Percentage(self.value),
                DiscountType::Amount => Value::Amount(self.value),
            }),
            DiscountField::MinPurchase => self.min_purchase.map(Value::Amount),
            DiscountField::MaxDiscount => self.max_discount.map(Value::Amount),
            DiscountField::StartsAt => self.starts_at.map(Value::Instant),
            DiscountField::EndsAt => self.ends_at.map(Value::Instant),
        }
    }

    fn field_kind(&self, field: DiscountField) -> ValueKind {
        match field {
            DiscountField::Name => ValueKind::Text,
            DiscountField::Value => match self.discount_type {
                DiscountType::Percentage => ValueKind::Percentage,
                DiscountType::Amount => ValueKind::Amount,
            },
            DiscountField::MinPurchase | DiscountField::MaxDiscount => ValueKind::Amount,
            DiscountField::StartsAt | DiscountField::EndsAt => ValueKind::Instant,
        }
    }

    fn validate_effective<L>(&self, lookup: L) -> Result<(), ValidationError>
    where
        L: Fn(DiscountField) -> Option<Value>,
    {
        let starts_at = lookup(DiscountField::StartsAt).and_then(|value| value.as_instant());
        let ends_at = lookup(DiscountField::EndsAt).and_then(|value| value.as_instant());

        match (starts_at, ends_at) {
            (Some(start), Some(end)) if end <= start => Err(ValidationError::new(
                DiscountField::EndsAt.wire_name(),
                ValidationErrorKind::InvalidWindow,
            )),
            _ => Ok(()),
        }
    }
}

/// Whether a resolved discount can be used at `at`: it must be available at
/// the branch and `at` must fall inside its effective window.
pub fn is_live(view: &EffectiveView<Discount>, at: Timestamp) -> bool {
    if !view.effective_active {
        return false;
    }

    let starts_at = view
        .effective(DiscountField::StartsAt)
        .and_then(Value::as_instant);

    let ends_at = view
        .effective(DiscountField::EndsAt)
        .and_then(Value::as_instant);

    starts_at.is_none_or(|start| start <= at) && ends_at.is_none_or(|end| at < end)
}

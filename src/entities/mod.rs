//! Entities
//!
//! Each catalog entity kind (category, product, discount) describes which of
//! its attributes a branch may override. The resolution engine is generic over
//! that description, so the merge rules live in one place.

use std::{fmt, hash::Hash, str::FromStr};

use thiserror::Error;

use crate::{resolution::ValidationError, values::Value, values::ValueKind};

pub mod category;
pub mod discount;
pub mod product;

pub use category::{Category, CategoryField};
pub use discount::{AppliesTo, Discount, DiscountField, DiscountTarget, DiscountType, is_live};
pub use product::{Product, ProductField};

/// An overridable attribute of an entity kind.
pub trait Field: Copy + Eq + Ord + Hash + fmt::Debug + 'static {
    /// Every overridable field, in display order.
    const ALL: &'static [Self];

    /// Key used for this field in override payloads.
    fn wire_name(self) -> &'static str;

    /// Look a field up by its wire key.
    fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.wire_name() == name)
    }
}

/// A catalog entity whose attributes can be overridden per branch.
pub trait Entity: Clone + fmt::Debug {
    /// The overridable fields of this entity kind.
    type Field: Field;

    /// Kind tag, used in logs and reports.
    const KIND: EntityKind;

    /// Field holding the display name.
    const NAME_FIELD: Self::Field;

    /// Field shown as the headline figure in listings, if any.
    const HEADLINE_FIELD: Option<Self::Field>;

    /// Master value of an overridable field. `None` when the general record
    /// leaves the attribute unset.
    fn master(&self, field: Self::Field) -> Option<Value>;

    /// The kind a value for `field` must have on this particular record.
    fn field_kind(&self, field: Self::Field) -> ValueKind;

    /// Cross-field checks against the merged values a branch would see.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the offending field.
    fn validate_effective<L>(&self, _lookup: L) -> Result<(), ValidationError>
    where
        L: Fn(Self::Field) -> Option<Value>,
    {
        Ok(())
    }
}

/// Entity kinds known to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Product category
    Category,

    /// Sellable product
    Product,

    /// Discount rule
    Discount,
}

impl EntityKind {
    /// Lowercase name of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Category => "category",
            EntityKind::Product => "product",
            EntityKind::Discount => "discount",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised entity kind.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown entity kind: {0}")]
pub struct UnknownEntityKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "category" | "categories" => Ok(EntityKind::Category),
            "product" | "products" => Ok(EntityKind::Product),
            "discount" | "discounts" => Ok(EntityKind::Discount),
            _ => Err(UnknownEntityKind(s.to_string())),
        }
    }
}

/// Optional text attribute as a value, treating blank text as unset.
pub(crate) fn text_value(text: Option<&str>) -> Option<Value> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(Value::from)
}

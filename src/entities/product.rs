//! Products

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    entities::{Entity, EntityKind, Field, text_value},
    values::{Value, ValueKind},
};

/// Product attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Display name
    pub name: String,

    /// Stock keeping unit
    #[serde(default)]
    pub sku: Option<String>,

    /// Owning category id
    #[serde(default)]
    pub category_id: Option<String>,

    /// Selling price
    pub sale_price: Decimal,

    /// Purchase (cost) price, never overridden per branch
    #[serde(default)]
    pub purchase_price: Option<Decimal>,

    /// Image shown on the POS grid
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    /// Create a product with a name and sale price.
    pub fn new(name: impl Into<String>, sale_price: Decimal) -> Self {
        Self {
            name: name.into(),
            sku: None,
            category_id: None,
            sale_price,
            purchase_price: None,
            image_url: None,
        }
    }
}

/// Overridable product fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProductField {
    /// Branch-specific display name
    Name,

    /// Branch-specific selling price
    SalePrice,

    /// Branch-specific image
    ImageUrl,
}

impl Field for ProductField {
    const ALL: &'static [Self] = &[
        ProductField::Name,
        ProductField::SalePrice,
        ProductField::ImageUrl,
    ];

    fn wire_name(self) -> &'static str {
        match self {
            ProductField::Name => "branch_product_name",
            ProductField::SalePrice => "sale_price",
            ProductField::ImageUrl => "branch_image_url",
        }
    }
}

impl Entity for Product {
    type Field = ProductField;

    const KIND: EntityKind = EntityKind::Product;
    const NAME_FIELD: ProductField = ProductField::Name;
    const HEADLINE_FIELD: Option<ProductField> = Some(ProductField::SalePrice);

    fn master(&self, field: ProductField) -> Option<Value> {
        match field {
            ProductField::Name => Some(Value::from(self.name.as_str())),
            ProductField::SalePrice => Some(Value::Amount(self.sale_price)),
            ProductField::ImageUrl => text_value(self.image_url.as_deref()),
        }
    }

    fn field_kind(&self, field: ProductField) -> ValueKind {
        match field {
            ProductField::Name | ProductField::ImageUrl => ValueKind::Text,
            ProductField::SalePrice => ValueKind::Amount,
        }
    }
}

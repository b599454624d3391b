//! Categories

use serde::{Deserialize, Serialize};

use crate::{
    entities::{Entity, EntityKind, Field, text_value},
    values::{Value, ValueKind},
};

/// Category attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Display name
    pub name: String,

    /// Image shown on the POS grid
    #[serde(default)]
    pub image_url: Option<String>,

    /// Position in category lists
    #[serde(default)]
    pub sort_order: i32,
}

impl Category {
    /// Create a category with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_url: None,
            sort_order: 0,
        }
    }
}

/// Overridable category fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoryField {
    /// Branch-specific display name
    Name,

    /// Branch-specific image
    ImageUrl,
}

impl Field for CategoryField {
    const ALL: &'static [Self] = &[CategoryField::Name, CategoryField::ImageUrl];

    fn wire_name(self) -> &'static str {
        match self {
            CategoryField::Name => "branch_category_name",
            CategoryField::ImageUrl => "branch_image_url",
        }
    }
}

impl Entity for Category {
    type Field = CategoryField;

    const KIND: EntityKind = EntityKind::Category;
    const NAME_FIELD: CategoryField = CategoryField::Name;
    const HEADLINE_FIELD: Option<CategoryField> = None;

    fn master(&self, field: CategoryField) -> Option<Value> {
        match field {
            CategoryField::Name => Some(Value::from(self.name.as_str())),
            CategoryField::ImageUrl => text_value(self.image_url.as_deref()),
        }
    }

    fn field_kind(&self, _field: CategoryField) -> ValueKind {
        ValueKind::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_image_has_no_master_value() {
        let category = Category::new("Coffee");

        assert_eq!(category.master(CategoryField::ImageUrl), None);
        assert_eq!(
            category.master(CategoryField::Name),
            Some(Value::from("Coffee"))
        );
    }

    #[test]
    fn every_field_is_text() {
        let category = Category::new("Coffee");

        assert!(
            CategoryField::ALL
                .iter()
                .all(|field| category.field_kind(*field) == ValueKind::Text),
            "category fields should all be text"
        );
    }
}

//! Fixtures
//!
//! YAML fixture sets seed a catalog per entity kind. A set named `demo` is
//! read from `<base>/categories/demo.yml`, `<base>/products/demo.yml` and
//! `<base>/discounts/demo.yml`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;

use crate::{
    catalog::{Catalog, CatalogError},
    entities::{Category, Discount, Entity, Product},
    ids::BranchId,
    overrides::PatchOp,
    records::{EntityId, Record},
    wire::{WireError, parse_patch},
};

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,

        /// Underlying error
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Override payload could not be read
    #[error("Invalid override for {entity} at {branch}: {source}")]
    Override {
        /// Overridden record
        entity: String,

        /// Branch holding the override
        branch: String,

        /// Underlying error
        source: WireError,
    },

    /// Catalog rejected a record or an override
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// One file of a fixture set.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "E: DeserializeOwned"))]
pub struct CatalogFixture<E> {
    /// General and local records
    #[serde(default = "Vec::new")]
    pub entities: Vec<Record<E>>,

    /// Branch overrides of general records
    #[serde(default)]
    pub overrides: Vec<OverrideFixture>,
}

/// Branch override in a fixture file.
#[derive(Debug, Deserialize)]
pub struct OverrideFixture {
    /// Branch holding the override
    pub branch_id: String,

    /// Overridden general record
    pub entity_id: String,

    /// Overridden fields keyed by wire name
    #[serde(default)]
    pub fields: serde_json::Value,

    /// Explicit branch availability
    #[serde(default)]
    pub is_active_at_branch: Option<bool>,
}

/// A loaded fixture set.
#[derive(Debug, Clone)]
pub struct Fixture {
    base_path: PathBuf,
    categories: Catalog<Category>,
    products: Catalog<Product>,
    discounts: Catalog<Discount>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            categories: Catalog::new(),
            products: Catalog::new(),
            discounts: Catalog::new(),
        }
    }

    /// Load categories from `categories/<name>.yml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// catalog rejects a record or override.
    pub fn load_categories(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        self.categories = load_catalog(&self.file("categories", name))?;

        Ok(self)
    }

    /// Load products from `products/<name>.yml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// catalog rejects a record or override.
    pub fn load_products(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        self.products = load_catalog(&self.file("products", name))?;

        Ok(self)
    }

    /// Load discounts from `discounts/<name>.yml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// catalog rejects a record or override.
    pub fn load_discounts(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        self.discounts = load_catalog(&self.file("discounts", name))?;

        Ok(self)
    }

    /// Load a complete fixture set from the default base path.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        Self::from_set_in("./fixtures", name)
    }

    /// Load a complete fixture set from `base_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set_in(base_path: impl Into<PathBuf>, name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::with_base_path(base_path);

        fixture
            .load_categories(name)?
            .load_products(name)?
            .load_discounts(name)?;

        Ok(fixture)
    }

    /// Category catalog
    pub fn categories(&self) -> &Catalog<Category> {
        &self.categories
    }

    /// Product catalog
    pub fn products(&self) -> &Catalog<Product> {
        &self.products
    }

    /// Discount catalog
    pub fn discounts(&self) -> &Catalog<Discount> {
        &self.discounts
    }

    /// Mutable category catalog
    pub fn categories_mut(&mut self) -> &mut Catalog<Category> {
        &mut self.categories
    }

    /// Mutable product catalog
    pub fn products_mut(&mut self) -> &mut Catalog<Product> {
        &mut self.products
    }

    /// Mutable discount catalog
    pub fn discounts_mut(&mut self) -> &mut Catalog<Discount> {
        &mut self.discounts
    }

    fn file(&self, kind: &str, name: &str) -> PathBuf {
        self.base_path.join(kind).join(format!("{name}.yml"))
    }
}

/// Read one fixture file into a catalog. Overrides go through the same
/// validation as any other override write.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the catalog
/// rejects a record or override.
pub fn load_catalog<E>(path: &Path) -> Result<Catalog<E>, FixtureError>
where
    E: Entity + DeserializeOwned,
{
    let contents = fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let fixture: CatalogFixture<E> = serde_norway::from_str(&contents)?;
    let mut catalog = Catalog::new();

    for record in fixture.entities {
        catalog.insert(record)?;
    }

    for ovr in fixture.overrides {
        let branch = BranchId::new(ovr.branch_id.as_str());
        let id = EntityId::<E>::new(ovr.entity_id.as_str());

        let general = catalog.record(&id)?;

        let fields = match ovr.fields {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            fields => fields,
        };

        let mut patch =
            parse_patch(general.attributes(), &fields).map_err(|source| FixtureError::Override {
                entity: ovr.entity_id.clone(),
                branch: ovr.branch_id.clone(),
                source,
            })?;

        if let Some(is_active) = ovr.is_active_at_branch {
            patch.push_active(PatchOp::Set(is_active));
        }

        catalog.apply_override(&branch, &id, &patch)?;
    }

    debug!(kind = %E::KIND, path = %path.display(), "loaded fixture catalog");

    Ok(catalog)
}

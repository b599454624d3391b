//! Catalog
//!
//! In-memory store for one entity kind: general and local records plus the
//! branch overrides layered over general records. It keeps at most one
//! override per `{branch, entity}` pair by replacing the stored override in
//! place on every write.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    entities::{Entity, Field},
    ids::BranchId,
    listing::{BranchRow, ScopeFilter, compose_branch_listing, list_effective},
    overrides::{BranchOverride, OverridePatch},
    records::{EntityId, Record},
    resolution::{
        EffectiveView, OverrideError, PreconditionError, ValidationError, apply_override,
        resolve_effective,
    },
};

/// Catalog errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No record with this id.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind
        kind: &'static str,

        /// Requested id
        id: String,
    },

    /// A record with this id already exists.
    #[error("{kind} {id} already exists")]
    AlreadyExists {
        /// Entity kind
        kind: &'static str,

        /// Conflicting id
        id: String,
    },

    /// The operation does not apply to this record.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// Rejected input; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<OverrideError> for CatalogError {
    fn from(error: OverrideError) -> Self {
        match error {
            OverrideError::Precondition(error) => Self::Precondition(error),
            OverrideError::Validation(error) => Self::Validation(error),
        }
    }
}

/// Records and branch overrides for one entity kind.
#[derive(Debug, Clone)]
pub struct Catalog<E: Entity> {
    records: BTreeMap<EntityId<E>, Record<E>>,
    overrides: FxHashMap<(BranchId, EntityId<E>), BranchOverride<E>>,
}

impl<E: Entity> Default for Catalog<E> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            overrides: FxHashMap::default(),
        }
    }
}

impl<E: Entity> Catalog<E> {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record as given, scope and active flag included.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::AlreadyExists`] if the id is taken.
    pub fn insert(&mut self, record: Record<E>) -> Result<(), CatalogError> {
        let id = record.id().clone();

        if self.records.contains_key(&id) {
            return Err(CatalogError::AlreadyExists {
                kind: E::KIND.as_str(),
                id: id.into_string(),
            });
        }

        debug!(kind = %E::KIND, id = %id, general = record.is_general(), "inserting record");

        self.records.insert(id, record);

        Ok(())
    }

    /// Create an active general record.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::AlreadyExists`] if the id is taken.
    #[tracing::instrument(
        name = "catalog.create_general",
        skip_all,
        fields(kind = %E::KIND, id = %id),
        err
    )]
    pub fn create_general(
        &mut self,
        id: EntityId<E>,
        attributes: E,
    ) -> Result<(), CatalogError> {
        self.insert(Record::general(id, attributes))?;

        info!("created general record");

        Ok(())
    }

    /// Create an active record owned by `branch`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::AlreadyExists`] if the id is taken.
    #[tracing::instrument(
        name = "catalog.create_local",
        skip_all,
        fields(kind = %E::KIND, id = %id, branch = %branch),
        err
    )]
    pub fn create_local(
        &mut self,
        id: EntityId<E>,
        branch: BranchId,
        attributes: E,
    ) -> Result<(), CatalogError> {
        self.insert(Record::local(id, branch, attributes))?;

        info!("created local record");

        Ok(())
    }

    /// Replace a record's attributes. Scope, and so the owning branch of a
    /// local record, never changes.
    ///
    /// A field whose value kind changes (a discount switching between
    /// percentage and amount) is reset to inherit in every branch override
    /// of the record.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown id.
    #[tracing::instrument(
        name = "catalog.update_attributes",
        skip_all,
        fields(kind = %E::KIND, id = %id, reset_fields = tracing::field::Empty),
        err
    )]
    pub fn update_attributes(
        &mut self,
        id: &EntityId<E>,
        attributes: E,
    ) -> Result<(), CatalogError> {
        let record = self.record_mut(id)?;

        let retyped = <E::Field as Field>::ALL
            .iter()
            .copied()
            .filter(|field| record.attributes().field_kind(*field) != attributes.field_kind(*field))
            .fold(OverridePatch::new(), OverridePatch::inherit);

        record.set_attributes(attributes);

        if !retyped.is_empty() {
            tracing::Span::current().record("reset_fields", retyped.fields().count());

            for (_, ovr) in self.overrides.iter_mut().filter(|((_, entity), _)| entity == id) {
                *ovr = ovr.patched(&retyped);
            }
        }

        info!("updated record attributes");

        Ok(())
    }

    /// Soft-delete a record. Overrides of an archived general record stay
    /// stored but stop being visible.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown id.
    #[tracing::instrument(name = "catalog.archive", skip_all, fields(kind = %E::KIND, id = %id), err)]
    pub fn archive(&mut self, id: &EntityId<E>) -> Result<(), CatalogError> {
        self.record_mut(id)?.set_active(false);

        info!("archived record");

        Ok(())
    }

    /// Reactivate an archived record. Only the record's own flag changes;
    /// branch overrides, including availability suppression, are kept.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown id.
    #[tracing::instrument(name = "catalog.restore", skip_all, fields(kind = %E::KIND, id = %id), err)]
    pub fn restore(&mut self, id: &EntityId<E>) -> Result<(), CatalogError> {
        self.record_mut(id)?.set_active(true);

        info!("restored record");

        Ok(())
    }

    /// Permanently remove a record. Removing a general record drops its
    /// overrides at every branch.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown id.
    #[tracing::instrument(
        name = "catalog.hard_delete",
        skip_all,
        fields(kind = %E::KIND, id = %id, dropped_overrides = tracing::field::Empty),
        err
    )]
    pub fn hard_delete(&mut self, id: &EntityId<E>) -> Result<Record<E>, CatalogError> {
        let record = self.records.remove(id).ok_or_else(|| not_found::<E>(id))?;

        let before = self.overrides.len();

        self.overrides.retain(|(_, entity), _| entity != id);

        let dropped = before - self.overrides.len();

        tracing::Span::current().record("dropped_overrides", dropped);

        info!("deleted record");

        Ok(record)
    }

    /// Create or update `branch`'s override of general record `id`.
    ///
    /// The patch is merged field by field into the stored override, which is
    /// replaced in place; the general record is never touched.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`]: unknown id.
    /// - [`CatalogError::Precondition`]: the record is local.
    /// - [`CatalogError::Validation`]: a patched value is out of bounds; the
    ///   stored override is unchanged.
    #[tracing::instrument(
        name = "catalog.apply_override",
        skip_all,
        fields(kind = %E::KIND, id = %id, branch = %branch, created = tracing::field::Empty),
        err
    )]
    pub fn apply_override(
        &mut self,
        branch: &BranchId,
        id: &EntityId<E>,
        patch: &OverridePatch<E::Field>,
    ) -> Result<BranchOverride<E>, CatalogError> {
        let general = self.record(id)?;
        let key = (branch.clone(), id.clone());
        let existing = self.overrides.get(&key);

        tracing::Span::current().record("created", existing.is_none());

        let next = apply_override(general, existing, branch, patch)?;

        info!(
            overridden_fields = next.fields().count(),
            is_active_at_branch = ?next.is_active_at_branch(),
            "stored branch override"
        );

        self.overrides.insert(key, next.clone());

        Ok(next)
    }

    /// Reset `branch`'s override of `id` so every field inherits again. The
    /// override slot itself is kept.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the branch holds no override.
    #[tracing::instrument(
        name = "catalog.clear_override",
        skip_all,
        fields(kind = %E::KIND, id = %id, branch = %branch),
        err
    )]
    pub fn clear_override(
        &mut self,
        branch: &BranchId,
        id: &EntityId<E>,
    ) -> Result<(), CatalogError> {
        self.overrides
            .get_mut(&(branch.clone(), id.clone()))
            .ok_or_else(|| not_found::<E>(id))?
            .clear();

        info!("cleared branch override");

        Ok(())
    }

    /// Look up a record.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown id.
    pub fn record(&self, id: &EntityId<E>) -> Result<&Record<E>, CatalogError> {
        self.records.get(id).ok_or_else(|| not_found::<E>(id))
    }

    /// `branch`'s override of `id`, if one is stored.
    pub fn override_for(&self, branch: &BranchId, id: &EntityId<E>) -> Option<&BranchOverride<E>> {
        self.overrides.get(&(branch.clone(), id.clone()))
    }

    /// Overrides stored for `branch`, keyed by general record id.
    pub fn overrides_for(&self, branch: &BranchId) -> FxHashMap<EntityId<E>, BranchOverride<E>> {
        self.overrides
            .iter()
            .filter(|((owner, _), _)| owner == branch)
            .map(|((_, entity), ovr)| (entity.clone(), ovr.clone()))
            .collect()
    }

    /// Resolve general record `id` for `branch`.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`]: unknown id.
    /// - [`CatalogError::Precondition`]: the record is local.
    pub fn resolve(
        &self,
        branch: &BranchId,
        id: &EntityId<E>,
    ) -> Result<EffectiveView<E>, CatalogError> {
        let general = self.record(id)?;

        Ok(resolve_effective(general, self.override_for(branch, id))?)
    }

    /// Everything a branch lists: active general records resolved with the
    /// branch's overrides, followed by the branch's own active records.
    ///
    /// # Errors
    ///
    /// Only fails if the store is inconsistent, with a
    /// [`CatalogError::Precondition`].
    pub fn branch_listing(
        &self,
        branch: &BranchId,
        filter: ScopeFilter,
    ) -> Result<Vec<BranchRow<E>>, CatalogError> {
        let overrides = self.overrides_for(branch);

        let generals = self
            .records
            .values()
            .filter(|record| record.is_general() && record.is_active());

        let views = list_effective(generals, &overrides, filter)?;

        let locals = self
            .records
            .values()
            .filter(|record| record.branch() == Some(branch) && record.is_active())
            .cloned();

        Ok(compose_branch_listing(views, locals, filter))
    }

    /// Archived records a branch can restore: its own archived records and,
    /// for the chain operator's view, archived general records.
    pub fn archived(&self, branch: Option<&BranchId>) -> Vec<&Record<E>> {
        self.records
            .values()
            .filter(|record| !record.is_active())
            .filter(|record| match branch {
                Some(branch) => record.branch() == Some(branch),
                None => record.is_general(),
            })
            .collect()
    }

    fn record_mut(&mut self, id: &EntityId<E>) -> Result<&mut Record<E>, CatalogError> {
        self.records.get_mut(id).ok_or_else(|| not_found::<E>(id))
    }
}

fn not_found<E: Entity>(id: &EntityId<E>) -> CatalogError {
    CatalogError::NotFound {
        kind: E::KIND.as_str(),
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::{
        entities::{Discount, DiscountField, DiscountType, Product, ProductField},
        resolution::ValidationErrorKind,
        values::Value,
    };

    use super::*;

    fn jakarta() -> BranchId {
        BranchId::new("jkt-01")
    }

    fn bandung() -> BranchId {
        BranchId::new("bdg-01")
    }

    fn catalog() -> Result<Catalog<Product>, CatalogError> {
        let mut catalog = Catalog::new();

        catalog.create_general(
            "prd-1".into(),
            Product::new("Kopi Susu", Decimal::from(18_000)),
        )?;
        catalog.create_general(
            "prd-2".into(),
            Product::new("Americano", Decimal::from(15_000)),
        )?;
        catalog.create_local(
            "prd-9".into(),
            bandung(),
            Product::new("Batagor", Decimal::from(12_000)),
        )?;

        Ok(catalog)
    }

    fn listed_ids(rows: &[BranchRow<Product>]) -> Vec<&str> {
        rows.iter().map(|row| row.id().as_str()).collect()
    }

    #[test]
    fn duplicate_ids_are_rejected() -> TestResult {
        let mut catalog = catalog()?;

        let result = catalog.create_local(
            "prd-1".into(),
            jakarta(),
            Product::new("Clash", Decimal::ONE),
        );

        assert!(matches!(result, Err(CatalogError::AlreadyExists { .. })));

        Ok(())
    }

    #[test]
    fn only_one_override_per_branch_and_entity() -> TestResult {
        let mut catalog = catalog()?;
        let id = EntityId::new("prd-1");

        catalog.apply_override(
            &jakarta(),
            &id,
            &OverridePatch::new().set(ProductField::SalePrice, Value::Amount(Decimal::from(20_000))),
        )?;
        let stored = catalog.apply_override(
            &jakarta(),
            &id,
            &OverridePatch::new().set(ProductField::Name, "Custom"),
        )?;

        assert_eq!(catalog.overrides_for(&jakarta()).len(), 1);
        assert_eq!(
            stored.field(ProductField::SalePrice),
            Some(&Value::Amount(Decimal::from(20_000)))
        );
        assert_eq!(stored.field(ProductField::Name), Some(&Value::from("Custom")));

        Ok(())
    }

    #[test]
    fn overrides_are_isolated_per_branch() -> TestResult {
        let mut catalog = catalog()?;
        let id = EntityId::new("prd-1");

        catalog.apply_override(&jakarta(), &id, &OverridePatch::new().active_at_branch(false))?;

        assert!(!catalog.resolve(&jakarta(), &id)?.effective_active);
        assert!(catalog.resolve(&bandung(), &id)?.effective_active);
        assert!(catalog.record(&id)?.is_active());

        Ok(())
    }

    #[test]
    fn rejected_override_writes_nothing() -> TestResult {
        let mut catalog = Catalog::new();
        let id: EntityId<Discount> = "dsc-1".into();

        catalog.create_general(
            id.clone(),
            Discount::new("Member Day", DiscountType::Percentage, Decimal::from(10)),
        )?;

        let result = catalog.apply_override(
            &jakarta(),
            &id,
            &OverridePatch::new().set(DiscountField::Value, Value::Percentage(Decimal::from(150))),
        );

        assert!(matches!(
            result,
            Err(CatalogError::Validation(ValidationError {
                kind: ValidationErrorKind::PercentageOutOfRange,
                ..
            }))
        ));
        assert!(catalog.override_for(&jakarta(), &id).is_none());

        Ok(())
    }

    #[test]
    fn local_records_cannot_be_overridden() -> TestResult {
        let mut catalog = catalog()?;

        let result = catalog.apply_override(&bandung(), &"prd-9".into(), &OverridePatch::new());

        assert!(matches!(
            result,
            Err(CatalogError::Precondition(PreconditionError::NotGeneral { .. }))
        ));

        Ok(())
    }

    #[test]
    fn unknown_ids_are_not_found() -> TestResult {
        let mut catalog = catalog()?;

        assert!(matches!(
            catalog.apply_override(&jakarta(), &"nope".into(), &OverridePatch::new()),
            Err(CatalogError::NotFound { .. })
        ));
        assert!(matches!(
            catalog.archive(&"nope".into()),
            Err(CatalogError::NotFound { .. })
        ));

        Ok(())
    }

    #[test]
    fn retyping_a_discount_resets_stale_overrides() -> TestResult {
        let mut catalog = Catalog::new();
        let id: EntityId<Discount> = "dsc-1".into();

        catalog.create_general(
            id.clone(),
            Discount::new("Cashback", DiscountType::Amount, Decimal::from(5_000)),
        )?;
        catalog.apply_override(
            &jakarta(),
            &id,
            &OverridePatch::new()
                .set(DiscountField::Value, Value::Amount(Decimal::from(7_500)))
                .set(DiscountField::Name, "Cashback Jakarta"),
        )?;

        catalog.update_attributes(
            &id,
            Discount::new("Cashback", DiscountType::Percentage, Decimal::from(10)),
        )?;

        let view = catalog.resolve(&jakarta(), &id)?;

        assert_eq!(
            view.effective(DiscountField::Value),
            Some(&Value::Percentage(Decimal::from(10)))
        );
        assert!(!view.is_field_overridden(DiscountField::Value));
        assert_eq!(view.name(), Some("Cashback Jakarta"));

        let stored = catalog.apply_override(
            &jakarta(),
            &id,
            &OverridePatch::new().set(DiscountField::Name, "Cashback JKT"),
        )?;

        assert_eq!(stored.field(DiscountField::Value), None);

        Ok(())
    }

    #[test]
    fn updating_a_local_record_keeps_its_branch() -> TestResult {
        let mut catalog = catalog()?;
        let id = EntityId::new("prd-9");

        catalog.update_attributes(&id, Product::new("Batagor Kuah", Decimal::from(14_000)))?;

        let updated = catalog.record(&id)?;

        assert_eq!(updated.branch(), Some(&bandung()));
        assert_eq!(updated.attributes().name, "Batagor Kuah");

        Ok(())
    }

    #[test]
    fn branch_listing_combines_general_and_local() -> TestResult {
        let catalog = catalog()?;

        let at_bandung = catalog.branch_listing(&bandung(), ScopeFilter::All)?;
        let at_jakarta = catalog.branch_listing(&jakarta(), ScopeFilter::All)?;
        let local_only = catalog.branch_listing(&bandung(), ScopeFilter::Local)?;

        assert_eq!(listed_ids(&at_bandung), ["prd-1", "prd-2", "prd-9"]);
        assert_eq!(listed_ids(&at_jakarta), ["prd-1", "prd-2"]);
        assert_eq!(listed_ids(&local_only), ["prd-9"]);

        Ok(())
    }

    #[test]
    fn archived_general_hides_its_overrides() -> TestResult {
        let mut catalog = catalog()?;
        let id = EntityId::new("prd-1");

        catalog.apply_override(&jakarta(), &id, &OverridePatch::new().set(ProductField::Name, "Kopi"))?;
        catalog.archive(&id)?;

        let overridden = catalog.branch_listing(&jakarta(), ScopeFilter::Overridden)?;

        assert!(overridden.is_empty());
        assert!(catalog.override_for(&jakarta(), &id).is_some());
        assert_eq!(catalog.archived(None).len(), 1);

        Ok(())
    }

    #[test]
    fn restore_leaves_override_state_untouched() -> TestResult {
        let mut catalog = catalog()?;
        let id = EntityId::new("prd-1");

        catalog.apply_override(&jakarta(), &id, &OverridePatch::new().active_at_branch(false))?;
        catalog.archive(&id)?;
        catalog.restore(&id)?;

        let view = catalog.resolve(&jakarta(), &id)?;

        assert!(view.master_active);
        assert!(!view.effective_active);

        Ok(())
    }

    #[test]
    fn archive_and_restore_local_record() -> TestResult {
        let mut catalog = catalog()?;
        let id = EntityId::new("prd-9");

        catalog.archive(&id)?;

        assert_eq!(
            listed_ids(&catalog.branch_listing(&bandung(), ScopeFilter::Local)?),
            Vec::<&str>::new()
        );
        assert_eq!(catalog.archived(Some(&bandung())).len(), 1);

        catalog.restore(&id)?;

        assert_eq!(
            listed_ids(&catalog.branch_listing(&bandung(), ScopeFilter::Local)?),
            ["prd-9"]
        );

        Ok(())
    }

    #[test]
    fn hard_delete_is_terminal_and_drops_overrides() -> TestResult {
        let mut catalog = catalog()?;
        let id = EntityId::new("prd-1");

        catalog.apply_override(&jakarta(), &id, &OverridePatch::new().set(ProductField::Name, "Kopi"))?;
        catalog.apply_override(&bandung(), &id, &OverridePatch::new().active_at_branch(false))?;

        catalog.hard_delete(&id)?;

        assert!(matches!(catalog.record(&id), Err(CatalogError::NotFound { .. })));
        assert!(catalog.override_for(&jakarta(), &id).is_none());
        assert!(catalog.override_for(&bandung(), &id).is_none());
        assert!(matches!(catalog.restore(&id), Err(CatalogError::NotFound { .. })));

        Ok(())
    }

    #[test]
    fn clearing_an_override_keeps_the_slot() -> TestResult {
        let mut catalog = catalog()?;
        let id = EntityId::new("prd-1");

        catalog.apply_override(
            &jakarta(),
            &id,
            &OverridePatch::new()
                .set(ProductField::Name, "Kopi")
                .active_at_branch(false),
        )?;
        catalog.clear_override(&jakarta(), &id)?;

        let view = catalog.resolve(&jakarta(), &id)?;

        assert!(!view.is_overridden);
        assert!(catalog.override_for(&jakarta(), &id).is_some_and(BranchOverride::is_empty));

        Ok(())
    }
}

//! Branch Overrides

use std::collections::BTreeMap;

use crate::{
    entities::{Entity, Field},
    ids::BranchId,
    records::EntityId,
    values::Value,
};

/// One step of a sparse update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOp<T> {
    /// Override with this value
    Set(T),

    /// Drop the override and fall back to the master value
    Inherit,
}

/// Sparse update to a branch override. Fields not mentioned are left as they
/// are.
#[derive(Debug, Clone, PartialEq)]
pub struct OverridePatch<F: Field> {
    fields: BTreeMap<F, PatchOp<Value>>,
    is_active_at_branch: Option<PatchOp<bool>>,
}

impl<F: Field> Default for OverridePatch<F> {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            is_active_at_branch: None,
        }
    }
}

impl<F: Field> OverridePatch<F> {
    /// Empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Override `field` with `value`.
    #[must_use]
    pub fn set(mut self, field: F, value: impl Into<Value>) -> Self {
        self.fields.insert(field, PatchOp::Set(value.into()));
        self
    }

    /// Reset `field` to inherit the master value.
    #[must_use]
    pub fn inherit(mut self, field: F) -> Self {
        self.fields.insert(field, PatchOp::Inherit);
        self
    }

    /// Explicitly enable or suppress the entity at the branch.
    #[must_use]
    pub fn active_at_branch(mut self, is_active: bool) -> Self {
        self.is_active_at_branch = Some(PatchOp::Set(is_active));
        self
    }

    /// Reset branch availability to follow the general record.
    #[must_use]
    pub fn inherit_active(mut self) -> Self {
        self.is_active_at_branch = Some(PatchOp::Inherit);
        self
    }

    /// Record a field operation in place.
    pub fn push(&mut self, field: F, op: PatchOp<Value>) {
        self.fields.insert(field, op);
    }

    /// Record a branch availability operation in place.
    pub fn push_active(&mut self, op: PatchOp<bool>) {
        self.is_active_at_branch = Some(op);
    }

    /// Field operations in field order.
    pub fn fields(&self) -> impl Iterator<Item = (F, &PatchOp<Value>)> {
        self.fields.iter().map(|(field, op)| (*field, op))
    }

    /// Operation for one field, if the patch mentions it.
    pub fn field(&self, field: F) -> Option<&PatchOp<Value>> {
        self.fields.get(&field)
    }

    /// Branch availability operation, if any.
    pub fn is_active_at_branch(&self) -> Option<&PatchOp<bool>> {
        self.is_active_at_branch.as_ref()
    }

    /// Whether the patch mentions nothing at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.is_active_at_branch.is_none()
    }
}

/// Branch-scoped partial values layered over one general record.
///
/// There is at most one per `{branch, entity}` pair. A field that is absent
/// inherits the general record's value.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchOverride<E: Entity> {
    branch: BranchId,
    entity: EntityId<E>,
    fields: BTreeMap<E::Field, Value>,
    is_active_at_branch: Option<bool>,
}

impl<E: Entity> BranchOverride<E> {
    /// Empty override: every field inherits.
    pub fn new(branch: BranchId, entity: EntityId<E>) -> Self {
        Self {
            branch,
            entity,
            fields: BTreeMap::new(),
            is_active_at_branch: None,
        }
    }

    /// Branch this override belongs to.
    pub fn branch(&self) -> &BranchId {
        &self.branch
    }

    /// General record this override applies to.
    pub fn entity(&self) -> &EntityId<E> {
        &self.entity
    }

    /// Override value of `field`, `None` when it inherits.
    pub fn field(&self, field: E::Field) -> Option<&Value> {
        self.fields.get(&field)
    }

    /// Overridden fields in field order.
    pub fn fields(&self) -> impl Iterator<Item = (E::Field, &Value)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    /// Explicit branch availability, `None` when it follows the general record.
    pub fn is_active_at_branch(&self) -> Option<bool> {
        self.is_active_at_branch
    }

    /// Whether nothing is overridden.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.is_active_at_branch.is_none()
    }

    /// Copy of this override with `patch` merged field by field.
    #[must_use]
    pub(crate) fn patched(&self, patch: &OverridePatch<E::Field>) -> Self {
        let mut next = self.clone();

        for (field, op) in patch.fields() {
            match op {
                PatchOp::Set(value) => {
                    next.fields.insert(field, value.clone());
                }
                PatchOp::Inherit => {
                    next.fields.remove(&field);
                }
            }
        }

        match patch.is_active_at_branch() {
            Some(PatchOp::Set(is_active)) => next.is_active_at_branch = Some(*is_active),
            Some(PatchOp::Inherit) => next.is_active_at_branch = None,
            None => {}
        }

        next
    }

    /// Reset every field and the availability flag to inherit.
    pub(crate) fn clear(&mut self) {
        self.fields.clear();
        self.is_active_at_branch = None;
    }
}

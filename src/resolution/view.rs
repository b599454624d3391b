//! Effective Views

use smallvec::SmallVec;

use crate::{entities::Entity, records::EntityId, values::Value};

/// Master and effective value of one field at a branch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField<F> {
    /// The field
    pub field: F,

    /// Value stored on the general record
    pub master: Option<Value>,

    /// Value the branch sees
    pub effective: Option<Value>,

    /// Whether the branch value differs from master
    pub is_overridden: bool,
}

/// A general record as seen from one branch.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveView<E: Entity> {
    /// General record id
    pub id: EntityId<E>,

    /// Per-field resolution, in [`Field::ALL`](crate::entities::Field::ALL) order
    pub fields: SmallVec<[ResolvedField<E::Field>; 6]>,

    /// The general record's own active flag
    pub master_active: bool,

    /// Availability at the branch
    pub effective_active: bool,

    /// Whether the branch set availability explicitly
    pub active_overridden: bool,

    /// Whether the branch intervened at all
    pub is_overridden: bool,
}

impl<E: Entity> EffectiveView<E> {
    /// Resolution of one field.
    pub fn field(&self, field: E::Field) -> Option<&ResolvedField<E::Field>> {
        self.fields.iter().find(|resolved| resolved.field == field)
    }

    /// Effective value of `field`.
    pub fn effective(&self, field: E::Field) -> Option<&Value> {
        self.field(field)
            .and_then(|resolved| resolved.effective.as_ref())
    }

    /// Master value of `field`.
    pub fn master(&self, field: E::Field) -> Option<&Value> {
        self.field(field).and_then(|resolved| resolved.master.as_ref())
    }

    /// Whether `field` is overridden at the branch.
    pub fn is_field_overridden(&self, field: E::Field) -> bool {
        self.field(field)
            .is_some_and(|resolved| resolved.is_overridden)
    }

    /// Effective display name.
    pub fn name(&self) -> Option<&str> {
        self.effective(E::NAME_FIELD).and_then(Value::as_text)
    }
}

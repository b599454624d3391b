//! Override Resolution
//!
//! Pure functions that merge a branch override over a general record and that
//! build the next override from a sparse patch. Nothing here performs I/O or
//! keeps state between calls; persistence and the at-most-one-override-per-key
//! guarantee belong to the caller (see [`Catalog`](crate::catalog::Catalog)).

use rust_decimal::Decimal;
use smallvec::SmallVec;

use crate::{
    entities::{Entity, Field},
    ids::BranchId,
    overrides::{BranchOverride, OverridePatch, PatchOp},
    records::Record,
    values::{Value, ValueKind},
};

mod errors;
mod view;

pub use errors::{OverrideError, PreconditionError, ValidationError, ValidationErrorKind};
pub use view::{EffectiveView, ResolvedField};

/// Hundred percent.
const MAX_PERCENTAGE: Decimal = Decimal::ONE_HUNDRED;

/// Resolve the values `branch_override`'s branch sees for `general`.
///
/// A missing override resolves every field to its master value. Each
/// effective value is the override's value when present, else the master
/// value; availability is the override's explicit flag, else the record's own
/// flag. No clamping happens here.
///
/// # Errors
///
/// - [`PreconditionError::NotGeneral`]: `general` is a local record.
/// - [`PreconditionError::OverrideMismatch`]: the override belongs to another
///   record.
pub fn resolve_effective<E: Entity>(
    general: &Record<E>,
    branch_override: Option<&BranchOverride<E>>,
) -> Result<EffectiveView<E>, PreconditionError> {
    ensure_general(general)?;

    if let Some(ovr) = branch_override {
        if ovr.entity() != general.id() {
            return Err(mismatch(general, ovr.branch(), ovr));
        }
    }

    let attributes = general.attributes();

    let fields = E::Field::ALL
        .iter()
        .map(|&field| {
            let master = attributes.master(field);
            let overridden = branch_override.and_then(|ovr| ovr.field(field)).cloned();
            let is_overridden = overridden
                .as_ref()
                .is_some_and(|value| Some(value) != master.as_ref());
            let effective = overridden.or_else(|| master.clone());

            ResolvedField {
                field,
                master,
                effective,
                is_overridden,
            }
        })
        .collect::<SmallVec<[ResolvedField<E::Field>; 6]>>();

    let explicit_active = branch_override.and_then(BranchOverride::is_active_at_branch);
    let any_field_overridden = fields.iter().any(|resolved| resolved.is_overridden);

    Ok(EffectiveView {
        id: general.id().clone(),
        master_active: general.is_active(),
        effective_active: explicit_active.unwrap_or(general.is_active()),
        active_overridden: explicit_active.is_some(),
        is_overridden: any_field_overridden || explicit_active.is_some(),
        fields,
    })
}

/// Build the override `branch` should hold for `general` after `patch`.
///
/// Without an existing override a new one is seeded from the patch; otherwise
/// the patch is merged into a copy of `existing` field by field. Neither
/// `general` nor `existing` is modified, so a rejected patch leaves no trace.
///
/// # Errors
///
/// - [`OverrideError::Precondition`]: `general` is local, or `existing` does
///   not belong to `general` at `branch`.
/// - [`OverrideError::Validation`]: see [`validate_patch`].
pub fn apply_override<E: Entity>(
    general: &Record<E>,
    existing: Option<&BranchOverride<E>>,
    branch: &BranchId,
    patch: &OverridePatch<E::Field>,
) -> Result<BranchOverride<E>, OverrideError> {
    ensure_general(general)?;

    if let Some(ovr) = existing {
        if ovr.entity() != general.id() || ovr.branch() != branch {
            return Err(mismatch(general, branch, ovr).into());
        }
    }

    validate_patch(general, existing, patch)?;

    let next = match existing {
        Some(ovr) => ovr.patched(patch),
        None => BranchOverride::new(branch.clone(), general.id().clone()).patched(patch),
    };

    Ok(next)
}

/// Check a patch before it is merged.
///
/// Every `Set` value must have the field's kind; amounts must not be negative
/// and percentages must lie in `[0, 100]`. The merged values (patch, then
/// existing override, then master) must pass the entity's own cross-field
/// checks.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, naming the field.
pub fn validate_patch<E: Entity>(
    general: &Record<E>,
    existing: Option<&BranchOverride<E>>,
    patch: &OverridePatch<E::Field>,
) -> Result<(), ValidationError> {
    let attributes = general.attributes();

    for (field, op) in patch.fields() {
        if let PatchOp::Set(value) = op {
            validate_value(field, attributes.field_kind(field), value)?;
        }
    }

    attributes.validate_effective(|field| match patch.field(field) {
        Some(PatchOp::Set(value)) => Some(value.clone()),
        Some(PatchOp::Inherit) => attributes.master(field),
        None => existing
            .and_then(|ovr| ovr.field(field))
            .cloned()
            .or_else(|| attributes.master(field)),
    })
}

fn validate_value<F: Field>(
    field: F,
    expected: ValueKind,
    value: &Value,
) -> Result<(), ValidationError> {
    let error = |kind| ValidationError::new(field.wire_name(), kind);

    if value.kind() != expected {
        return Err(error(ValidationErrorKind::KindMismatch {
            expected,
            found: value.kind(),
        }));
    }

    match value {
        Value::Amount(amount) if *amount < Decimal::ZERO => {
            Err(error(ValidationErrorKind::NegativeAmount))
        }
        Value::Percentage(percent) if *percent < Decimal::ZERO || *percent > MAX_PERCENTAGE => {
            Err(error(ValidationErrorKind::PercentageOutOfRange))
        }
        Value::Text(_) | Value::Amount(_) | Value::Percentage(_) | Value::Instant(_) => Ok(()),
    }
}

fn ensure_general<E>(record: &Record<E>) -> Result<(), PreconditionError> {
    if record.is_general() {
        Ok(())
    } else {
        Err(PreconditionError::NotGeneral {
            id: record.id().to_string(),
        })
    }
}

fn mismatch<E: Entity>(
    general: &Record<E>,
    branch: &BranchId,
    ovr: &BranchOverride<E>,
) -> PreconditionError {
    PreconditionError::OverrideMismatch {
        entity: general.id().to_string(),
        branch: branch.to_string(),
        override_entity: ovr.entity().to_string(),
        override_branch: ovr.branch().to_string(),
    }
}

//! Records
//!
//! A record is one stored entity together with its scope. General records are
//! chain-wide and may be overridden per branch; local records belong to a
//! single branch for their whole life.

use serde::{Deserialize, Deserializer};

use crate::ids::{BranchId, TypedId};

/// Entity Id
pub type EntityId<E> = TypedId<E>;

/// Ownership scope of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Chain-wide, overridable per branch
    General,

    /// Owned by one branch
    Local {
        /// Owning branch
        branch: BranchId,
    },
}

/// A stored entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<E> {
    id: EntityId<E>,
    scope: Scope,
    is_active: bool,
    attributes: E,
}

impl<E> Record<E> {
    /// Create an active general record.
    pub fn general(id: impl Into<EntityId<E>>, attributes: E) -> Self {
        Self {
            id: id.into(),
            scope: Scope::General,
            is_active: true,
            attributes,
        }
    }

    /// Create an active record owned by `branch`.
    pub fn local(id: impl Into<EntityId<E>>, branch: BranchId, attributes: E) -> Self {
        Self {
            id: id.into(),
            scope: Scope::Local { branch },
            is_active: true,
            attributes,
        }
    }

    /// Set the active flag.
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Record id
    pub fn id(&self) -> &EntityId<E> {
        &self.id
    }

    /// Ownership scope
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Whether the record is chain-wide.
    pub fn is_general(&self) -> bool {
        matches!(self.scope, Scope::General)
    }

    /// Whether the record is owned by a branch.
    pub fn is_local(&self) -> bool {
        !self.is_general()
    }

    /// Owning branch of a local record.
    pub fn branch(&self) -> Option<&BranchId> {
        match &self.scope {
            Scope::General => None,
            Scope::Local { branch } => Some(branch),
        }
    }

    /// Whether the record itself is active (not archived).
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Stored attributes
    pub fn attributes(&self) -> &E {
        &self.attributes
    }

    pub(crate) fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }

    pub(crate) fn set_attributes(&mut self, attributes: E) {
        self.attributes = attributes;
    }
}

/// Record as exchanged with the backend: scope is signalled by the presence
/// of `branch_id`.
#[derive(Debug, Deserialize)]
struct RecordWire<E> {
    id: EntityId<E>,

    #[serde(default)]
    branch_id: Option<BranchId>,

    #[serde(default = "default_active")]
    is_active: bool,

    #[serde(flatten)]
    attributes: E,
}

const fn default_active() -> bool {
    true
}

impl<E> From<RecordWire<E>> for Record<E> {
    fn from(wire: RecordWire<E>) -> Self {
        let record = match wire.branch_id {
            Some(branch) if !branch.as_str().trim().is_empty() => {
                Record::local(wire.id, branch, wire.attributes)
            }
            Some(_) | None => Record::general(wire.id, wire.attributes),
        };

        record.with_active(wire.is_active)
    }
}

impl<'de, E: Deserialize<'de>> Deserialize<'de> for Record<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RecordWire::deserialize(deserializer).map(Record::from)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::entities::Category;

    use super::*;

    #[test]
    fn general_and_local_are_exclusive() {
        let general = Record::general("cat-1", Category::new("Coffee"));
        let local = Record::local("cat-2", BranchId::new("bdg"), Category::new("Snacks"));

        assert!(general.is_general() && !general.is_local());
        assert!(local.is_local() && !local.is_general());
        assert_eq!(local.branch(), Some(&BranchId::new("bdg")));
        assert_eq!(general.branch(), None);
    }

    #[test]
    fn branch_id_on_the_wire_marks_a_local_record() -> TestResult {
        let local: Record<Category> =
            serde_json::from_str(r#"{"id": "cat-9", "branch_id": "jkt", "name": "Jajanan"}"#)?;
        let general: Record<Category> = serde_json::from_str(
            r#"{"id": "cat-1", "branch_id": null, "is_active": false, "name": "Coffee"}"#,
        )?;

        assert_eq!(
            local.scope(),
            &Scope::Local {
                branch: BranchId::new("jkt")
            }
        );
        assert!(local.is_active());
        assert!(general.is_general());
        assert!(!general.is_active());

        Ok(())
    }

    #[test]
    fn blank_branch_id_is_general() -> TestResult {
        let record: Record<Category> =
            serde_json::from_str(r#"{"id": "cat-1", "branch_id": "", "name": "Coffee"}"#)?;

        assert!(record.is_general());

        Ok(())
    }
}

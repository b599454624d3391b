//! Branch Listings

use std::{fmt, str::FromStr};

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::{
    entities::Entity,
    overrides::BranchOverride,
    records::{EntityId, Record},
    resolution::{EffectiveView, PreconditionError, resolve_effective},
};

/// View selector used to partition a branch's entity list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeFilter {
    /// Everything visible at the branch
    #[default]
    All,

    /// General records the branch has not overridden
    General,

    /// Records owned by the branch
    Local,

    /// General records the branch has overridden
    Overridden,
}

impl ScopeFilter {
    /// Whether a resolved general record passes the filter.
    pub fn admits_general<E: Entity>(self, view: &EffectiveView<E>) -> bool {
        match self {
            ScopeFilter::All => true,
            ScopeFilter::General => !view.is_overridden,
            ScopeFilter::Overridden => view.is_overridden,
            ScopeFilter::Local => false,
        }
    }

    /// Whether local records pass the filter.
    pub const fn admits_local(self) -> bool {
        matches!(self, ScopeFilter::All | ScopeFilter::Local)
    }
}

impl fmt::Display for ScopeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScopeFilter::All => "all",
            ScopeFilter::General => "general",
            ScopeFilter::Local => "local",
            ScopeFilter::Overridden => "overridden",
        })
    }
}

/// Unrecognised scope filter.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown scope filter: {0}")]
pub struct UnknownScopeFilter(pub String);

impl FromStr for ScopeFilter {
    type Err = UnknownScopeFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(ScopeFilter::All),
            "general" | "generalOnly" | "general_only" => Ok(ScopeFilter::General),
            "local" | "localOnly" | "local_only" => Ok(ScopeFilter::Local),
            "overridden" | "overriddenOnly" | "overridden_only" => Ok(ScopeFilter::Overridden),
            other => Err(UnknownScopeFilter(other.to_string())),
        }
    }
}

/// Resolve every general record against the branch's overrides and keep the
/// ones the filter admits.
///
/// Local records are never part of this list: [`ScopeFilter::Local`] yields
/// nothing here and is served from the local collection by
/// [`compose_branch_listing`].
///
/// # Errors
///
/// Returns a [`PreconditionError`] if a local record is passed as general.
pub fn list_effective<'a, E, I>(
    generals: I,
    overrides: &FxHashMap<EntityId<E>, BranchOverride<E>>,
    filter: ScopeFilter,
) -> Result<Vec<EffectiveView<E>>, PreconditionError>
where
    E: Entity + 'a,
    I: IntoIterator<Item = &'a Record<E>>,
{
    let mut views = Vec::new();

    for general in generals {
        let view = resolve_effective(general, overrides.get(general.id()))?;

        if filter.admits_general(&view) {
            views.push(view);
        }
    }

    Ok(views)
}

/// One row of a branch listing.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchRow<E: Entity> {
    /// General record resolved for the branch
    General(EffectiveView<E>),

    /// Record owned by the branch
    Local(Record<E>),
}

impl<E: Entity> BranchRow<E> {
    /// Entity id
    pub fn id(&self) -> &EntityId<E> {
        match self {
            BranchRow::General(view) => &view.id,
            BranchRow::Local(record) => record.id(),
        }
    }

    /// Whether the row is usable at the branch.
    pub fn is_active(&self) -> bool {
        match self {
            BranchRow::General(view) => view.effective_active,
            BranchRow::Local(record) => record.is_active(),
        }
    }
}

/// Merge resolved general records and the branch's local records into one
/// listing.
///
/// General rows come first. Rows are deduplicated by entity id, the first
/// occurrence wins, and the filter is applied to both kinds of row.
pub fn compose_branch_listing<E, G, L>(generals: G, locals: L, filter: ScopeFilter) -> Vec<BranchRow<E>>
where
    E: Entity,
    G: IntoIterator<Item = EffectiveView<E>>,
    L: IntoIterator<Item = Record<E>>,
{
    let mut seen = FxHashSet::default();

    let general_rows = generals
        .into_iter()
        .filter(|view| filter.admits_general(view))
        .map(BranchRow::General);

    let local_rows = locals
        .into_iter()
        .filter(|_| filter.admits_local())
        .map(BranchRow::Local);

    general_rows
        .chain(local_rows)
        .filter(|row| seen.insert(row.id().clone()))
        .collect()
}

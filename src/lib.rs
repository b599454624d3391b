//! POS Overrides
//!
//! Branch override resolution for a multi-tenant point-of-sale catalog.
//! Categories, products and discounts exist either chain-wide (general) or
//! owned by one branch (local). A branch may override selected fields of a
//! general record, and its own availability flag for it, without touching
//! the record itself.

pub mod catalog;
pub mod entities;
pub mod fixtures;
pub mod ids;
pub mod listing;
pub mod overrides;
pub mod records;
pub mod report;
pub mod resolution;
pub mod values;
pub mod wire;

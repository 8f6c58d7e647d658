//! ArcGIS REST collaborators for `agol-audit-core`.
//!
//! - [`PortalClient`] authenticates with a generated token, enumerates the
//!   owner's Feature Service items with their group and capability lookups,
//!   and implements every fix as a `Portal` mutation.
//! - [`HostedTableCatalog`] reads the metatable from a hosted table.
//!
//! All calls are blocking and run one at a time.

pub mod catalog;
pub mod client;
mod wire;

pub use catalog::HostedTableCatalog;
pub use client::{DEFAULT_ORG, PortalClient};

//! Workspace umbrella crate.
//!
//! Host applications can depend on `catalog-workspace` and get the catalog
//! facade plus the domain types without wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_catalog as catalog;
#[cfg(feature = "desktop-shims")]
pub use core_service::{CatalogService, CoreError, TracksView};

//! Class catalog: the bookable items, their remaining spaces, and the
//! search/sort view the catalog page renders.
//!
//! Pure domain logic (no IO, no storage).

pub mod item;
pub mod query;
pub mod seed;

pub use item::{Catalog, CatalogItem};
pub use query::{CatalogQuery, SortDirection, SortKey, filter_and_sort};
pub use seed::seed_catalog;

// Resource cache
//
// One ResourceDirectory per resource class, composed into a Catalog that the
// path resolver and filesystem operations read through.

pub mod catalog;
pub mod directory;

pub use catalog::{Catalog, CatalogStats};
pub use directory::{FetchResult, ResourceDirectory};

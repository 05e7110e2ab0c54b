mod models;
mod store;
mod trait_def;

pub use models::RawTrack;
pub use store::SqliteCatalogStore;
pub use trait_def::{CatalogStore, StaticCatalogStore};

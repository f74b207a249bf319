pub mod cache;
pub mod client;
pub mod normalize;

pub use cache::{InMemoryResponseCache, NoopResponseCache, ResponseCache};
pub use client::{
    CatalogClient, CatalogError, CatalogFetch, CatalogTransport, HttpCatalogTransport,
    RECENT_FETCH_LIMIT,
};
pub use normalize::{normalize_product, NormalizedProduct};

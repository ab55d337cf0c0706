// Catalog service client modules
//
// Hand-written client for the workspace ("group") scoped REST endpoints:
// workspace and report listing, embed token generation, and dataset refresh.
// Every list endpoint wraps its payload in a `{ "value": [...] }` envelope.

pub mod client;
pub mod datasets;
pub mod embed;
pub mod groups;
pub mod types;

pub use client::CatalogClient;

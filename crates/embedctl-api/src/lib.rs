// embedctl-api: Async Rust client for the report catalog and embed-token service

pub mod auth;
pub mod catalog;
pub mod error;
pub mod transport;

pub use auth::{AccessToken, Credentials, ServicePrincipal, TokenProvider};
pub use catalog::CatalogClient;
pub use catalog::types as catalog_types;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};

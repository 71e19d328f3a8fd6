use thiserror::Error;

use crosssell_core::errors::ApplicationError;

pub mod cross_selling;
pub mod memory;
pub mod product;
pub mod product_stream;
pub mod system_config;

pub use cross_selling::SqlCrossSellingRepository;
pub use memory::{InMemoryCatalog, InMemorySystemConfig};
pub use product::{SqlProductListingLoader, SqlProductRepository};
pub use product_stream::SqlProductStreamRepository;
pub use system_config::{config_value_as_bool, SqlSystemConfigService};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

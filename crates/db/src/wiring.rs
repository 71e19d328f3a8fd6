//! Port sets for `ProductCrossSellingRoute`, one per adapter family.

use std::sync::Arc;

use crosssell_core::config::CrossSellingConfig;
use crosssell_core::cross_selling::CrossSellingPorts;
use crosssell_core::ports::RepositoryStreamBuilder;

use crate::repositories::{
    InMemoryCatalog, InMemorySystemConfig, SqlCrossSellingRepository, SqlProductListingLoader,
    SqlProductRepository, SqlProductStreamRepository, SqlSystemConfigService,
};
use crate::DbPool;

pub fn sqlite_ports(pool: &DbPool, config: &CrossSellingConfig) -> CrossSellingPorts {
    CrossSellingPorts {
        cross_sellings: Arc::new(
            SqlCrossSellingRepository::new(pool.clone())
                .with_default_limit(config.default_stream_limit),
        ),
        stream_builder: Arc::new(RepositoryStreamBuilder::new(SqlProductStreamRepository::new(
            pool.clone(),
        ))),
        products: Arc::new(SqlProductRepository::new(pool.clone())),
        listing: Arc::new(SqlProductListingLoader::new(pool.clone())),
        system_config: Arc::new(SqlSystemConfigService::new(pool.clone())),
    }
}

pub fn in_memory_ports(
    catalog: Arc<InMemoryCatalog>,
    system_config: Arc<InMemorySystemConfig>,
) -> CrossSellingPorts {
    CrossSellingPorts {
        cross_sellings: catalog.clone(),
        stream_builder: Arc::new(RepositoryStreamBuilder::new(catalog.clone())),
        products: catalog.clone(),
        listing: catalog,
        system_config,
    }
}

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crosssell_core::criteria::Criteria;
use crosssell_core::domain::cross_selling::{CrossSellingDefinition, CrossSellingId};
use crosssell_core::domain::product::{Product, ProductCollection, ProductId};
use crosssell_core::domain::product_stream::{ProductStream, ProductStreamId};
use crosssell_core::domain::sales_channel::{SalesChannelContext, SalesChannelId};
use crosssell_core::errors::ApplicationError;
use crosssell_core::ports::{
    CrossSellingRepository, ProductListingLoader, ProductRepository, ProductStreamRepository,
    SystemConfigService,
};

use super::config_value_as_bool;
use crate::query;

/// Whole catalog held in memory. Maps are ordered so every read is
/// deterministic.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<BTreeMap<ProductId, Product>>,
    cross_sellings: RwLock<BTreeMap<CrossSellingId, CrossSellingDefinition>>,
    streams: RwLock<BTreeMap<ProductStreamId, ProductStream>>,
}

impl InMemoryCatalog {
    pub async fn save_product(&self, product: Product) {
        let mut products = self.products.write().await;
        products.insert(product.id.clone(), product);
    }

    pub async fn save_cross_selling(&self, cross_selling: CrossSellingDefinition) {
        let mut cross_sellings = self.cross_sellings.write().await;
        cross_sellings.insert(cross_selling.id.clone(), cross_selling);
    }

    pub async fn save_stream(&self, stream: ProductStream) {
        let mut streams = self.streams.write().await;
        streams.insert(stream.id.clone(), stream);
    }

    pub async fn remove_stream(&self, id: &ProductStreamId) -> Option<ProductStream> {
        let mut streams = self.streams.write().await;
        streams.remove(id)
    }

    async fn snapshot(&self) -> Vec<Product> {
        let products = self.products.read().await;
        products.values().cloned().collect()
    }
}

#[async_trait]
impl CrossSellingRepository for InMemoryCatalog {
    async fn fetch_active_for_product(
        &self,
        product_id: &ProductId,
        _context: &SalesChannelContext,
    ) -> Result<Vec<CrossSellingDefinition>, ApplicationError> {
        let cross_sellings = self.cross_sellings.read().await;
        let mut active: Vec<CrossSellingDefinition> = cross_sellings
            .values()
            .filter(|cross_selling| &cross_selling.product_id == product_id && cross_selling.active)
            .cloned()
            .collect();
        active.sort_by_key(|cross_selling| cross_selling.position);
        Ok(active)
    }
}

#[async_trait]
impl ProductRepository for InMemoryCatalog {
    async fn search(
        &self,
        criteria: &Criteria,
        _context: &SalesChannelContext,
    ) -> Result<ProductCollection, ApplicationError> {
        Ok(query::search(self.snapshot().await, criteria))
    }
}

#[async_trait]
impl ProductListingLoader for InMemoryCatalog {
    async fn load(
        &self,
        criteria: &Criteria,
        context: &SalesChannelContext,
    ) -> Result<ProductCollection, ApplicationError> {
        Ok(query::listing(self.snapshot().await, criteria, context))
    }
}

#[async_trait]
impl ProductStreamRepository for InMemoryCatalog {
    async fn find_by_id(
        &self,
        id: &ProductStreamId,
    ) -> Result<Option<ProductStream>, ApplicationError> {
        let streams = self.streams.read().await;
        Ok(streams.get(id).cloned())
    }
}

type ConfigKey = (String, Option<SalesChannelId>);

#[derive(Default)]
pub struct InMemorySystemConfig {
    values: RwLock<BTreeMap<ConfigKey, Value>>,
}

impl InMemorySystemConfig {
    pub async fn set(&self, key: &str, value: Value, sales_channel_id: Option<SalesChannelId>) {
        let mut values = self.values.write().await;
        values.insert((key.to_string(), sales_channel_id), value);
    }

    pub async fn remove(&self, key: &str, sales_channel_id: Option<SalesChannelId>) {
        let mut values = self.values.write().await;
        values.remove(&(key.to_string(), sales_channel_id));
    }
}

#[async_trait]
impl SystemConfigService for InMemorySystemConfig {
    async fn get_bool(
        &self,
        key: &str,
        sales_channel_id: Option<&SalesChannelId>,
    ) -> Result<Option<bool>, ApplicationError> {
        let values = self.values.read().await;
        let scoped = sales_channel_id
            .and_then(|channel| values.get(&(key.to_string(), Some(channel.clone()))));
        let value = scoped.or_else(|| values.get(&(key.to_string(), None)));
        Ok(value.and_then(config_value_as_bool))
    }
}

//! Collaborators the cross-selling pipeline calls through.

use std::sync::Arc;

use async_trait::async_trait;

use crate::criteria::{Criteria, Filter};
use crate::domain::cross_selling::CrossSellingDefinition;
use crate::domain::product::{ProductCollection, ProductId};
use crate::domain::product_stream::{ProductStream, ProductStreamId};
use crate::domain::sales_channel::{SalesChannelContext, SalesChannelId};
use crate::errors::{ApplicationError, DomainError};

#[async_trait]
pub trait CrossSellingRepository: Send + Sync {
    /// Active definitions of `product_id`, ordered by `position` ascending,
    /// with assigned products loaded.
    async fn fetch_active_for_product(
        &self,
        product_id: &ProductId,
        context: &SalesChannelContext,
    ) -> Result<Vec<CrossSellingDefinition>, ApplicationError>;
}

/// Id-scoped product lookup. Result order is unspecified.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn search(
        &self,
        criteria: &Criteria,
        context: &SalesChannelContext,
    ) -> Result<ProductCollection, ApplicationError>;
}

/// Storefront listing search: honours sorting and limit and collapses
/// variants into one entry per display group.
#[async_trait]
pub trait ProductListingLoader: Send + Sync {
    async fn load(
        &self,
        criteria: &Criteria,
        context: &SalesChannelContext,
    ) -> Result<ProductCollection, ApplicationError>;
}

#[async_trait]
pub trait ProductStreamBuilder: Send + Sync {
    async fn build_filters(
        &self,
        stream_id: &ProductStreamId,
        context: &SalesChannelContext,
    ) -> Result<Vec<Filter>, ApplicationError>;
}

#[async_trait]
pub trait ProductStreamRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &ProductStreamId,
    ) -> Result<Option<ProductStream>, ApplicationError>;
}

#[async_trait]
pub trait SystemConfigService: Send + Sync {
    /// `Ok(None)` when the key is not configured for the channel or globally.
    async fn get_bool(
        &self,
        key: &str,
        sales_channel_id: Option<&SalesChannelId>,
    ) -> Result<Option<bool>, ApplicationError>;
}

#[async_trait]
impl<T> ProductStreamRepository for Arc<T>
where
    T: ProductStreamRepository + ?Sized,
{
    async fn find_by_id(
        &self,
        id: &ProductStreamId,
    ) -> Result<Option<ProductStream>, ApplicationError> {
        (**self).find_by_id(id).await
    }
}

/// Compiles streams from their stored filter definition.
pub struct RepositoryStreamBuilder<R> {
    streams: R,
}

impl<R> RepositoryStreamBuilder<R> {
    pub fn new(streams: R) -> Self {
        Self { streams }
    }
}

#[async_trait]
impl<R> ProductStreamBuilder for RepositoryStreamBuilder<R>
where
    R: ProductStreamRepository,
{
    async fn build_filters(
        &self,
        stream_id: &ProductStreamId,
        _context: &SalesChannelContext,
    ) -> Result<Vec<Filter>, ApplicationError> {
        let stream = self
            .streams
            .find_by_id(stream_id)
            .await?
            .ok_or_else(|| DomainError::ProductStreamNotFound(stream_id.clone()))?;

        stream
            .api_filter
            .ok_or_else(|| DomainError::ProductStreamNotConfigured(stream_id.clone()).into())
    }
}

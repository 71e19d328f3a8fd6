use std::sync::Arc;

use tracing::debug;

use crate::criteria::Criteria;
use crate::cross_selling::availability::handle_available_stock;
use crate::cross_selling::events::{CrossSellingEventDispatcher, StreamCriteriaEvent};
use crate::domain::cross_selling::{CrossSellingDefinition, CrossSellingElement};
use crate::domain::product_stream::ProductStreamId;
use crate::domain::sales_channel::SalesChannelContext;
use crate::errors::ApplicationError;
use crate::ports::{ProductListingLoader, ProductStreamBuilder};

/// Resolves cross-sellings backed by a product stream through the listing
/// search.
pub struct ProductStreamResolver {
    stream_builder: Arc<dyn ProductStreamBuilder>,
    listing: Arc<dyn ProductListingLoader>,
    events: CrossSellingEventDispatcher,
}

impl ProductStreamResolver {
    pub fn new(
        stream_builder: Arc<dyn ProductStreamBuilder>,
        listing: Arc<dyn ProductListingLoader>,
        events: CrossSellingEventDispatcher,
    ) -> Self {
        Self { stream_builder, listing, events }
    }

    pub async fn resolve(
        &self,
        cross_selling: &CrossSellingDefinition,
        stream_id: &ProductStreamId,
        hide_closeout: bool,
        context: &SalesChannelContext,
    ) -> Result<CrossSellingElement, ApplicationError> {
        let filters = self.stream_builder.build_filters(stream_id, context).await?;

        let mut criteria = Criteria::new();
        criteria
            .add_filters(filters)
            .set_limit(Some(cross_selling.limit))
            .add_sorting(cross_selling.sorting.clone());
        handle_available_stock(&mut criteria, hide_closeout);

        self.events.dispatch_stream_criteria(&mut StreamCriteriaEvent {
            cross_selling,
            criteria: &mut criteria,
            context,
        });

        let products = self.listing.load(&criteria, context).await?;
        let total = products.len();

        debug!(
            event_name = "cross_selling.product_stream.resolved",
            correlation_id = %context.correlation_id,
            cross_selling_id = %cross_selling.id,
            product_stream_id = %stream_id,
            total,
            "product stream cross-selling resolved"
        );

        Ok(CrossSellingElement { cross_selling: cross_selling.clone(), products, total })
    }
}

use std::sync::Arc;

use tracing::debug;

use crate::criteria::{Criteria, Filter};
use crate::cross_selling::availability::handle_available_stock;
use crate::cross_selling::events::{CrossSellingEventDispatcher, IdsCriteriaEvent};
use crate::domain::cross_selling::{
    product_ids_by_position, AssignedProduct, CrossSellingDefinition, CrossSellingElement,
};
use crate::domain::product::Visibility;
use crate::domain::sales_channel::SalesChannelContext;
use crate::errors::ApplicationError;
use crate::ports::ProductRepository;

/// Resolves curated cross-sellings from their assigned products.
pub struct ProductListResolver {
    products: Arc<dyn ProductRepository>,
    events: CrossSellingEventDispatcher,
}

impl ProductListResolver {
    pub fn new(products: Arc<dyn ProductRepository>, events: CrossSellingEventDispatcher) -> Self {
        Self { products, events }
    }

    pub async fn resolve(
        &self,
        cross_selling: &CrossSellingDefinition,
        assigned: &[AssignedProduct],
        hide_closeout: bool,
        context: &SalesChannelContext,
    ) -> Result<Option<CrossSellingElement>, ApplicationError> {
        let ids = product_ids_by_position(assigned);
        if ids.is_empty() {
            return Ok(None);
        }

        let mut criteria = Criteria::with_ids(ids.clone());
        criteria.add_filter(Filter::product_available(
            context.sales_channel_id.clone(),
            Visibility::Link,
        ));
        handle_available_stock(&mut criteria, hide_closeout);

        self.events.dispatch_ids_criteria(&mut IdsCriteriaEvent {
            cross_selling,
            criteria: &mut criteria,
            context,
        });

        let mut products = self.products.search(&criteria, context).await?;
        products.sort_by_id_array(&ids);

        debug!(
            event_name = "cross_selling.product_list.resolved",
            correlation_id = %context.correlation_id,
            cross_selling_id = %cross_selling.id,
            assigned = assigned.len(),
            matched = products.len(),
            "product list cross-selling resolved"
        );

        Ok(Some(CrossSellingElement {
            cross_selling: cross_selling.clone(),
            products,
            total: assigned.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::ProductListResolver;
    use crate::criteria::{Criteria, FieldSorting, Filter};
    use crate::cross_selling::events::{
        CrossSellingEventDispatcher, CrossSellingSubscriber, IdsCriteriaEvent,
    };
    use crate::domain::cross_selling::{
        AssignedProduct, CrossSellingDefinition, CrossSellingId, CrossSellingType,
        DEFAULT_STREAM_LIMIT,
    };
    use crate::domain::product::{Product, ProductCollection, ProductId, Visibility};
    use crate::domain::sales_channel::{SalesChannelContext, SalesChannelId};
    use crate::errors::ApplicationError;
    use crate::ports::ProductRepository;

    /// Returns the requested ids that exist, in reverse id order, and keeps
    /// the criteria it was called with.
    struct RecordingProducts {
        known: Vec<&'static str>,
        seen: Mutex<Option<Criteria>>,
    }

    #[async_trait]
    impl ProductRepository for RecordingProducts {
        async fn search(
            &self,
            criteria: &Criteria,
            _context: &SalesChannelContext,
        ) -> Result<ProductCollection, ApplicationError> {
            *self.seen.lock().expect("lock") = Some(criteria.clone());
            let requested = criteria.ids.clone().unwrap_or_default();
            let mut found: Vec<Product> = self
                .known
                .iter()
                .filter(|id| requested.contains(&ProductId::from(**id)))
                .map(|id| product(id))
                .collect();
            found.sort_by(|left, right| right.id.0.cmp(&left.id.0));
            Ok(ProductCollection::new(found))
        }
    }

    /// Widens the id restriction with a product the curator never assigned.
    struct AddsBestseller;

    impl CrossSellingSubscriber for AddsBestseller {
        fn on_ids_criteria(&self, event: &mut IdsCriteriaEvent<'_>) {
            event.criteria.ids.get_or_insert_with(Vec::new).push(ProductId::from("bestseller"));
        }
    }

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::from(id),
            parent_id: None,
            product_number: id.to_uppercase(),
            name: id.to_owned(),
            active: true,
            stock: 1,
            is_closeout: false,
            visibilities: Vec::new(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn definition(assigned: &[(&str, i32)]) -> CrossSellingDefinition {
        CrossSellingDefinition {
            id: CrossSellingId::from("xs-list"),
            product_id: ProductId::from("main"),
            name: "Goes well with".to_owned(),
            position: 1,
            active: true,
            kind: CrossSellingType::ProductList,
            product_stream_id: None,
            limit: DEFAULT_STREAM_LIMIT,
            sorting: FieldSorting::asc("name"),
            assigned_products: assigned
                .iter()
                .map(|(id, position)| AssignedProduct {
                    id: format!("ap-{id}"),
                    product_id: ProductId::from(*id),
                    position: *position,
                })
                .collect(),
        }
    }

    fn resolver(known: Vec<&'static str>) -> (ProductListResolver, Arc<RecordingProducts>) {
        resolver_with(known, CrossSellingEventDispatcher::new())
    }

    fn resolver_with(
        known: Vec<&'static str>,
        events: CrossSellingEventDispatcher,
    ) -> (ProductListResolver, Arc<RecordingProducts>) {
        let products = Arc::new(RecordingProducts { known, seen: Mutex::new(None) });
        (ProductListResolver::new(products.clone(), events), products)
    }

    #[tokio::test]
    async fn products_follow_curator_positions_and_total_counts_assignments() {
        let (resolver, _) = resolver(vec!["a", "b", "c"]);
        let cross_selling = definition(&[("b", 2), ("missing", 4), ("c", 3), ("a", 1)]);
        let context = SalesChannelContext::new(SalesChannelId::from("storefront"));

        let element = resolver
            .resolve(&cross_selling, &cross_selling.assigned_products, false, &context)
            .await
            .expect("resolve")
            .expect("element");

        assert_eq!(
            element.products.ids(),
            vec![ProductId::from("a"), ProductId::from("b"), ProductId::from("c")]
        );
        assert_eq!(element.total, 4);
    }

    #[tokio::test]
    async fn criteria_restrict_to_link_visibility_and_closeout_when_hidden() {
        let (resolver, products) = resolver(vec!["a"]);
        let cross_selling = definition(&[("a", 1)]);
        let context = SalesChannelContext::new(SalesChannelId::from("storefront"));

        resolver
            .resolve(&cross_selling, &cross_selling.assigned_products, true, &context)
            .await
            .expect("resolve");

        let seen = products.seen.lock().expect("lock").clone().expect("search was called");
        assert_eq!(seen.ids, Some(vec![ProductId::from("a")]));
        assert_eq!(
            seen.filters,
            vec![
                Filter::product_available(SalesChannelId::from("storefront"), Visibility::Link),
                Filter::ProductCloseout,
            ]
        );
    }

    #[tokio::test]
    async fn nothing_assigned_resolves_to_no_element_without_searching() {
        let (resolver, products) = resolver(vec!["a"]);
        let cross_selling = definition(&[]);
        let context = SalesChannelContext::new(SalesChannelId::from("storefront"));

        let element = resolver
            .resolve(&cross_selling, &cross_selling.assigned_products, true, &context)
            .await
            .expect("resolve");

        assert!(element.is_none());
        assert!(products.seen.lock().expect("lock").is_none());
    }

    #[tokio::test]
    async fn product_assigned_twice_keeps_first_curated_slot() {
        let (resolver, products) = resolver(vec!["a", "c"]);
        let cross_selling = definition(&[("a", 1), ("c", 2), ("a", 3)]);
        let context = SalesChannelContext::new(SalesChannelId::from("storefront"));

        let element = resolver
            .resolve(&cross_selling, &cross_selling.assigned_products, false, &context)
            .await
            .expect("resolve")
            .expect("element");

        assert_eq!(element.products.ids(), vec![ProductId::from("a"), ProductId::from("c")]);
        assert_eq!(element.total, 3);
        let seen = products.seen.lock().expect("lock").clone().expect("search was called");
        assert_eq!(seen.ids, Some(vec![ProductId::from("a"), ProductId::from("c")]));
    }

    #[tokio::test]
    async fn products_added_by_subscriber_outside_curated_ids_are_dropped() {
        let (resolver, products) = resolver_with(
            vec!["a", "bestseller", "c"],
            CrossSellingEventDispatcher::new().with_subscriber(Arc::new(AddsBestseller)),
        );
        let cross_selling = definition(&[("c", 1), ("a", 2)]);
        let context = SalesChannelContext::new(SalesChannelId::from("storefront"));

        let element = resolver
            .resolve(&cross_selling, &cross_selling.assigned_products, false, &context)
            .await
            .expect("resolve")
            .expect("element");

        let seen = products.seen.lock().expect("lock").clone().expect("search was called");
        assert_eq!(
            seen.ids,
            Some(vec![ProductId::from("c"), ProductId::from("a"), ProductId::from("bestseller")])
        );
        assert_eq!(element.products.ids(), vec![ProductId::from("c"), ProductId::from("a")]);
        assert_eq!(element.total, 2);
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::cross_selling::availability::closeout_hidden;
use crate::cross_selling::events::{CrossSellingEventDispatcher, CrossSellingsLoadedEvent};
use crate::cross_selling::product_list::ProductListResolver;
use crate::cross_selling::product_stream::ProductStreamResolver;
use crate::cross_selling::ResolutionMode;
use crate::domain::cross_selling::{
    CrossSellingDefinition, CrossSellingElement, CrossSellingElementCollection,
    CrossSellingSource,
};
use crate::domain::product::ProductId;
use crate::domain::sales_channel::SalesChannelContext;
use crate::errors::ApplicationError;
use crate::ports::{
    CrossSellingRepository, ProductListingLoader, ProductRepository, ProductStreamBuilder,
    SystemConfigService,
};

#[async_trait]
pub trait CrossSellingRoute: Send + Sync {
    /// Resolved groups of `product_id` in definition order. Groups without
    /// products are left out.
    async fn resolve_cross_sellings(
        &self,
        product_id: &ProductId,
        context: &SalesChannelContext,
    ) -> Result<CrossSellingElementCollection, ApplicationError>;
}

#[async_trait]
impl<T> CrossSellingRoute for Arc<T>
where
    T: CrossSellingRoute + ?Sized,
{
    async fn resolve_cross_sellings(
        &self,
        product_id: &ProductId,
        context: &SalesChannelContext,
    ) -> Result<CrossSellingElementCollection, ApplicationError> {
        (**self).resolve_cross_sellings(product_id, context).await
    }
}

pub struct CrossSellingPorts {
    pub cross_sellings: Arc<dyn CrossSellingRepository>,
    pub stream_builder: Arc<dyn ProductStreamBuilder>,
    pub products: Arc<dyn ProductRepository>,
    pub listing: Arc<dyn ProductListingLoader>,
    pub system_config: Arc<dyn SystemConfigService>,
}

pub struct ProductCrossSellingRoute {
    cross_sellings: Arc<dyn CrossSellingRepository>,
    system_config: Arc<dyn SystemConfigService>,
    product_list: ProductListResolver,
    product_stream: ProductStreamResolver,
    events: CrossSellingEventDispatcher,
    mode: ResolutionMode,
}

impl ProductCrossSellingRoute {
    pub fn new(ports: CrossSellingPorts, events: CrossSellingEventDispatcher) -> Self {
        Self {
            cross_sellings: ports.cross_sellings,
            system_config: ports.system_config,
            product_list: ProductListResolver::new(ports.products, events.clone()),
            product_stream: ProductStreamResolver::new(
                ports.stream_builder,
                ports.listing,
                events.clone(),
            ),
            events,
            mode: ResolutionMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ResolutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    async fn resolve_group(
        &self,
        cross_selling: &CrossSellingDefinition,
        hide_closeout: bool,
        context: &SalesChannelContext,
    ) -> Result<Option<CrossSellingElement>, ApplicationError> {
        match cross_selling.source() {
            CrossSellingSource::Stream(stream_id) => self
                .product_stream
                .resolve(cross_selling, stream_id, hide_closeout, context)
                .await
                .map(Some),
            CrossSellingSource::AssignedProducts(assigned) => {
                self.product_list.resolve(cross_selling, assigned, hide_closeout, context).await
            }
        }
    }

    async fn resolve_groups(
        &self,
        cross_sellings: &[CrossSellingDefinition],
        context: &SalesChannelContext,
    ) -> Result<Vec<Option<CrossSellingElement>>, ApplicationError> {
        if cross_sellings.is_empty() {
            return Ok(Vec::new());
        }

        let hide_closeout = closeout_hidden(self.system_config.as_ref(), context).await;

        match self.mode {
            ResolutionMode::Sequential => {
                let mut resolved = Vec::with_capacity(cross_sellings.len());
                for cross_selling in cross_sellings {
                    resolved.push(self.resolve_group(cross_selling, hide_closeout, context).await?);
                }
                Ok(resolved)
            }
            // try_join_all keeps input order in its output.
            ResolutionMode::Concurrent => {
                try_join_all(cross_sellings.iter().map(|cross_selling| {
                    self.resolve_group(cross_selling, hide_closeout, context)
                }))
                .await
            }
        }
    }
}

#[async_trait]
impl CrossSellingRoute for ProductCrossSellingRoute {
    async fn resolve_cross_sellings(
        &self,
        product_id: &ProductId,
        context: &SalesChannelContext,
    ) -> Result<CrossSellingElementCollection, ApplicationError> {
        info!(
            event_name = "cross_selling.load.start",
            correlation_id = %context.correlation_id,
            product_id = %product_id,
            sales_channel_id = %context.sales_channel_id,
            mode = ?self.mode,
            "loading cross-sellings"
        );

        let cross_sellings =
            self.cross_sellings.fetch_active_for_product(product_id, context).await?;
        let resolved = self.resolve_groups(&cross_sellings, context).await?;

        let mut elements = CrossSellingElementCollection::new();
        for (cross_selling, element) in cross_sellings.iter().zip(resolved) {
            match element {
                Some(element) if !element.products.is_empty() => elements.add(element),
                _ => debug!(
                    event_name = "cross_selling.group.skipped",
                    correlation_id = %context.correlation_id,
                    cross_selling_id = %cross_selling.id,
                    cross_selling_type = cross_selling.kind.as_str(),
                    "cross-selling resolved to no products"
                ),
            }
        }

        self.events
            .dispatch_cross_sellings_loaded(&CrossSellingsLoadedEvent { elements: &elements, context });

        info!(
            event_name = "cross_selling.load.completed",
            correlation_id = %context.correlation_id,
            product_id = %product_id,
            definitions = cross_sellings.len(),
            groups = elements.len(),
            "cross-sellings loaded"
        );

        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::{CrossSellingPorts, CrossSellingRoute, ProductCrossSellingRoute};
    use crate::criteria::{Criteria, FieldSorting, Filter};
    use crate::cross_selling::events::{
        CrossSellingEventDispatcher, CrossSellingSubscriber, InMemoryHookRecorder, RecordedHook,
        StreamCriteriaEvent,
    };
    use crate::cross_selling::ResolutionMode;
    use crate::domain::cross_selling::{
        AssignedProduct, CrossSellingDefinition, CrossSellingElementCollection, CrossSellingId,
        CrossSellingType,
    };
    use crate::domain::product::{
        Product, ProductCollection, ProductId, ProductVisibility, Visibility,
    };
    use crate::domain::product_stream::ProductStreamId;
    use crate::domain::sales_channel::{SalesChannelContext, SalesChannelId};
    use crate::errors::{ApplicationError, DomainError};
    use crate::ports::{
        CrossSellingRepository, ProductListingLoader, ProductRepository, ProductStreamBuilder,
        SystemConfigService,
    };

    const CHANNEL: &str = "storefront";

    /// Just enough of a catalog to drive the route: honours id restriction,
    /// sales-channel availability, the closeout filter and stream membership.
    #[derive(Default)]
    struct FakeCatalog {
        products: Vec<Product>,
        cross_sellings: Vec<CrossSellingDefinition>,
        streams: HashMap<ProductStreamId, Vec<ProductId>>,
        hide_closeout: Mutex<Option<bool>>,
    }

    impl FakeCatalog {
        fn matches(product: &Product, filter: &Filter) -> bool {
            match filter {
                Filter::ProductAvailable { sales_channel_id, visibility } => {
                    product.active
                        && product
                            .visibility_in(sales_channel_id)
                            .map(|level| level >= *visibility)
                            .unwrap_or(false)
                }
                Filter::ProductCloseout => !(product.is_closeout && !product.available()),
                Filter::EqualsAny { field, value } if field == "id" => {
                    value.iter().any(|id| id.as_str() == Some(product.id.0.as_str()))
                }
                _ => true,
            }
        }

        fn set_hide_closeout(&self, value: Option<bool>) {
            *self.hide_closeout.lock().expect("config lock") = value;
        }
    }

    #[async_trait]
    impl CrossSellingRepository for FakeCatalog {
        async fn fetch_active_for_product(
            &self,
            product_id: &ProductId,
            _context: &SalesChannelContext,
        ) -> Result<Vec<CrossSellingDefinition>, ApplicationError> {
            let mut definitions: Vec<CrossSellingDefinition> = self
                .cross_sellings
                .iter()
                .filter(|definition| &definition.product_id == product_id && definition.active)
                .cloned()
                .collect();
            definitions.sort_by_key(|definition| definition.position);
            Ok(definitions)
        }
    }

    #[async_trait]
    impl ProductRepository for FakeCatalog {
        async fn search(
            &self,
            criteria: &Criteria,
            _context: &SalesChannelContext,
        ) -> Result<ProductCollection, ApplicationError> {
            // Reverse storage order so callers cannot rely on it.
            Ok(self
                .products
                .iter()
                .rev()
                .filter(|product| {
                    criteria.ids.as_ref().map(|ids| ids.contains(&product.id)).unwrap_or(true)
                })
                .filter(|product| criteria.filters.iter().all(|filter| Self::matches(product, filter)))
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl ProductListingLoader for FakeCatalog {
        async fn load(
            &self,
            criteria: &Criteria,
            _context: &SalesChannelContext,
        ) -> Result<ProductCollection, ApplicationError> {
            let mut products: Vec<Product> = self
                .products
                .iter()
                .filter(|product| criteria.filters.iter().all(|filter| Self::matches(product, filter)))
                .cloned()
                .collect();
            products.sort_by(|left, right| left.name.cmp(&right.name));
            products.truncate(criteria.limit.map(|limit| limit as usize).unwrap_or(usize::MAX));
            Ok(products.into_iter().collect())
        }
    }

    #[async_trait]
    impl ProductStreamBuilder for FakeCatalog {
        async fn build_filters(
            &self,
            stream_id: &ProductStreamId,
            _context: &SalesChannelContext,
        ) -> Result<Vec<Filter>, ApplicationError> {
            let members = self
                .streams
                .get(stream_id)
                .ok_or_else(|| DomainError::ProductStreamNotFound(stream_id.clone()))?;
            Ok(vec![Filter::equals_any("id", members.iter().map(|id| id.0.clone()))])
        }
    }

    #[async_trait]
    impl SystemConfigService for FakeCatalog {
        async fn get_bool(
            &self,
            _key: &str,
            _sales_channel_id: Option<&SalesChannelId>,
        ) -> Result<Option<bool>, ApplicationError> {
            Ok(*self.hide_closeout.lock().expect("config lock"))
        }
    }

    fn product(id: &str, stock: i64, is_closeout: bool) -> Product {
        Product {
            id: ProductId::from(id),
            parent_id: None,
            product_number: format!("SW-{id}"),
            name: id.to_uppercase(),
            active: true,
            stock,
            is_closeout,
            visibilities: vec![ProductVisibility {
                sales_channel_id: SalesChannelId::from(CHANNEL),
                visibility: Visibility::All,
            }],
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn list(id: &str, position: i32, assigned: &[(&str, i32)]) -> CrossSellingDefinition {
        CrossSellingDefinition {
            id: CrossSellingId::from(id),
            product_id: ProductId::from("main"),
            name: id.to_owned(),
            position,
            active: true,
            kind: CrossSellingType::ProductList,
            product_stream_id: None,
            limit: 24,
            sorting: FieldSorting::asc("name"),
            assigned_products: assigned
                .iter()
                .map(|(product_id, position)| AssignedProduct {
                    id: format!("{id}-{product_id}"),
                    product_id: ProductId::from(*product_id),
                    position: *position,
                })
                .collect(),
        }
    }

    fn stream(id: &str, position: i32, stream_id: Option<&str>, limit: u32) -> CrossSellingDefinition {
        CrossSellingDefinition {
            kind: CrossSellingType::ProductStream,
            product_stream_id: stream_id.map(ProductStreamId::from),
            limit,
            assigned_products: Vec::new(),
            ..list(id, position, &[])
        }
    }

    fn catalog(cross_sellings: Vec<CrossSellingDefinition>) -> Arc<FakeCatalog> {
        Arc::new(FakeCatalog {
            products: vec![
                product("a", 5, false),
                product("b", 0, true),
                product("c", 2, false),
                product("d", 1, false),
            ],
            cross_sellings,
            streams: HashMap::from([
                (ProductStreamId::from("pair"), vec![ProductId::from("c"), ProductId::from("d")]),
                (
                    ProductStreamId::from("all"),
                    vec![
                        ProductId::from("a"),
                        ProductId::from("b"),
                        ProductId::from("c"),
                        ProductId::from("d"),
                    ],
                ),
            ]),
            hide_closeout: Mutex::new(None),
        })
    }

    fn route(catalog: &Arc<FakeCatalog>, events: CrossSellingEventDispatcher) -> ProductCrossSellingRoute {
        ProductCrossSellingRoute::new(
            CrossSellingPorts {
                cross_sellings: catalog.clone(),
                stream_builder: catalog.clone(),
                products: catalog.clone(),
                listing: catalog.clone(),
                system_config: catalog.clone(),
            },
            events,
        )
    }

    fn context() -> SalesChannelContext {
        SalesChannelContext::new(SalesChannelId::from(CHANNEL)).with_correlation_id("test")
    }

    fn group_ids(elements: &CrossSellingElementCollection) -> Vec<String> {
        elements.iter().map(|element| element.cross_selling.id.0.clone()).collect()
    }

    fn product_ids(elements: &CrossSellingElementCollection, index: usize) -> Vec<String> {
        elements.iter().nth(index).expect("group").products.iter().map(|p| p.id.0.clone()).collect()
    }

    #[tokio::test]
    async fn product_without_cross_sellings_resolves_to_empty_collection() {
        let catalog = catalog(Vec::new());

        let elements = route(&catalog, CrossSellingEventDispatcher::new())
            .resolve_cross_sellings(&ProductId::from("main"), &context())
            .await
            .expect("resolve");

        assert!(elements.is_empty());
    }

    #[tokio::test]
    async fn curated_list_follows_curator_position() {
        let catalog = catalog(vec![list("xs", 1, &[("c", 3), ("a", 1), ("b", 2)])]);

        let elements = route(&catalog, CrossSellingEventDispatcher::new())
            .resolve_cross_sellings(&ProductId::from("main"), &context())
            .await
            .expect("resolve");

        assert_eq!(product_ids(&elements, 0), vec!["a", "b", "c"]);
        assert_eq!(elements.iter().next().map(|element| element.total), Some(3));
    }

    #[tokio::test]
    async fn curated_total_keeps_curated_size_after_closeout_filtering() {
        let catalog = catalog(vec![list("xs", 1, &[("c", 3), ("a", 1), ("b", 2)])]);
        catalog.set_hide_closeout(Some(true));

        let elements = route(&catalog, CrossSellingEventDispatcher::new())
            .resolve_cross_sellings(&ProductId::from("main"), &context())
            .await
            .expect("resolve");

        assert_eq!(product_ids(&elements, 0), vec!["a", "c"]);
        assert_eq!(elements.iter().next().map(|element| element.total), Some(3));
    }

    #[tokio::test]
    async fn stream_total_equals_returned_products() {
        let catalog = catalog(vec![stream("pair", 1, Some("pair"), 2), stream("all", 2, Some("all"), 2)]);

        let elements = route(&catalog, CrossSellingEventDispatcher::new())
            .resolve_cross_sellings(&ProductId::from("main"), &context())
            .await
            .expect("resolve");

        for element in &elements {
            assert_eq!(element.total, 2);
            assert_eq!(element.products.len(), 2);
        }
        assert_eq!(product_ids(&elements, 1), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn stream_without_reference_is_omitted_every_time() {
        let catalog = catalog(vec![stream("broken", 1, None, 24)]);
        let route = route(&catalog, CrossSellingEventDispatcher::new());

        let first = route.resolve_cross_sellings(&ProductId::from("main"), &context()).await;
        let second = route.resolve_cross_sellings(&ProductId::from("main"), &context()).await;

        assert_eq!(first, Ok(CrossSellingElementCollection::new()));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn dropped_group_keeps_relative_order_of_the_rest() {
        let catalog = catalog(vec![
            list("third", 3, &[("d", 1)]),
            list("first", 1, &[("a", 1)]),
            list("second", 2, &[("missing", 1)]),
        ]);

        let elements = route(&catalog, CrossSellingEventDispatcher::new())
            .resolve_cross_sellings(&ProductId::from("main"), &context())
            .await
            .expect("resolve");

        assert_eq!(group_ids(&elements), vec!["first", "third"]);
    }

    #[tokio::test]
    async fn toggling_closeout_flag_only_changes_filtered_products() {
        let catalog = catalog(vec![list("xs", 1, &[("b", 1), ("a", 2)]), stream("all", 2, Some("all"), 24)]);
        let route = route(&catalog, CrossSellingEventDispatcher::new());

        let shown = route
            .resolve_cross_sellings(&ProductId::from("main"), &context())
            .await
            .expect("resolve with closeout shown");
        catalog.set_hide_closeout(Some(true));
        let hidden = route
            .resolve_cross_sellings(&ProductId::from("main"), &context())
            .await
            .expect("resolve with closeout hidden");

        assert_eq!(product_ids(&shown, 0), vec!["b", "a"]);
        assert_eq!(product_ids(&hidden, 0), vec!["a"]);
        assert_eq!(shown.iter().next().map(|e| e.total), hidden.iter().next().map(|e| e.total));
        assert_eq!(product_ids(&shown, 1), vec!["a", "b", "c", "d"]);
        assert_eq!(product_ids(&hidden, 1), vec!["a", "c", "d"]);
        assert_eq!(hidden.iter().nth(1).map(|e| e.total), Some(3));
    }

    #[tokio::test]
    async fn repeated_resolution_is_byte_identical() {
        let catalog = catalog(vec![list("xs", 1, &[("c", 3), ("a", 1)]), stream("all", 2, Some("all"), 3)]);
        let route = route(&catalog, CrossSellingEventDispatcher::new());

        let first = route.resolve_cross_sellings(&ProductId::from("main"), &context()).await;
        let second = route.resolve_cross_sellings(&ProductId::from("main"), &context()).await;

        let first = serde_json::to_string(&first.expect("first")).expect("serialize first");
        let second = serde_json::to_string(&second.expect("second")).expect("serialize second");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn concurrent_mode_matches_sequential_output() {
        let catalog = catalog(vec![
            stream("all", 3, Some("all"), 3),
            list("empty", 2, &[]),
            list("xs", 1, &[("c", 3), ("a", 1)]),
        ]);

        let sequential = route(&catalog, CrossSellingEventDispatcher::new())
            .resolve_cross_sellings(&ProductId::from("main"), &context())
            .await
            .expect("sequential");
        let concurrent = route(&catalog, CrossSellingEventDispatcher::new())
            .with_mode(ResolutionMode::Concurrent)
            .resolve_cross_sellings(&ProductId::from("main"), &context())
            .await
            .expect("concurrent");

        assert_eq!(sequential, concurrent);
        assert_eq!(group_ids(&concurrent), vec!["xs", "all"]);
    }

    #[tokio::test]
    async fn missing_stream_fails_whole_request() {
        let catalog = catalog(vec![list("xs", 1, &[("a", 1)]), stream("gone", 2, Some("gone"), 24)]);

        let result = route(&catalog, CrossSellingEventDispatcher::new())
            .resolve_cross_sellings(&ProductId::from("main"), &context())
            .await;

        assert_eq!(
            result,
            Err(ApplicationError::Domain(DomainError::ProductStreamNotFound(
                ProductStreamId::from("gone")
            )))
        );
    }

    struct SingleResult;

    impl CrossSellingSubscriber for SingleResult {
        fn on_stream_criteria(&self, event: &mut StreamCriteriaEvent<'_>) {
            event.criteria.set_limit(Some(1));
        }
    }

    #[tokio::test]
    async fn hooks_see_closeout_filter_and_their_changes_are_executed() {
        let catalog = catalog(vec![list("xs", 1, &[("a", 1)]), stream("all", 2, Some("all"), 24)]);
        catalog.set_hide_closeout(Some(true));
        let recorder = InMemoryHookRecorder::default();
        let events = CrossSellingEventDispatcher::new()
            .with_subscriber(Arc::new(SingleResult))
            .with_subscriber(Arc::new(recorder.clone()));

        let elements = route(&catalog, events)
            .resolve_cross_sellings(&ProductId::from("main"), &context())
            .await
            .expect("resolve");

        assert_eq!(product_ids(&elements, 1), vec!["a"]);
        assert_eq!(elements.iter().nth(1).map(|element| element.total), Some(1));

        let hooks = recorder.hooks();
        assert_eq!(hooks.len(), 3);
        match &hooks[0] {
            RecordedHook::IdsCriteria { cross_selling, criteria } => {
                assert_eq!(cross_selling, "xs");
                assert_eq!(criteria.filters.last(), Some(&Filter::ProductCloseout));
            }
            other => panic!("unexpected first hook: {other:?}"),
        }
        match &hooks[1] {
            RecordedHook::StreamCriteria { criteria, .. } => {
                assert_eq!(criteria.filters.last(), Some(&Filter::ProductCloseout));
                assert_eq!(criteria.limit, Some(1));
            }
            other => panic!("unexpected second hook: {other:?}"),
        }
        assert_eq!(
            hooks[2],
            RecordedHook::CrossSellingsLoaded { cross_sellings: vec!["xs".into(), "all".into()] }
        );
    }

    #[tokio::test]
    async fn inactive_definitions_are_not_resolved() {
        let mut inactive = list("inactive", 1, &[("a", 1)]);
        inactive.active = false;
        let catalog = catalog(vec![inactive, list("active", 2, &[("c", 1)])]);

        let elements = route(&catalog, CrossSellingEventDispatcher::new())
            .resolve_cross_sellings(&ProductId::from("main"), &context())
            .await
            .expect("resolve");

        assert_eq!(group_ids(&elements), vec!["active"]);
    }
}

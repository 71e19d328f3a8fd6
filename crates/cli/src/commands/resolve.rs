use serde_json::json;

use crosssell_core::config::LoadOptions;
use crosssell_core::cross_selling::{
    CrossSellingEventDispatcher, CrossSellingRoute, ProductCrossSellingRoute,
};
use crosssell_core::{ProductId, SalesChannelContext, SalesChannelId};
use crosssell_db::{connect, sqlite_ports};

use crate::commands::seed::seed_demo_catalog;
use crate::commands::{prepare, CommandFailure, CommandResult};

#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub product_id: String,
    /// Migrate and load the demo catalog into the configured database first.
    pub seed: bool,
}

pub fn run(options: LoadOptions, request: ResolveRequest) -> CommandResult {
    let (config, runtime) = match prepare("resolve", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let product_id = request.product_id.trim().to_string();
    if product_id.is_empty() {
        return CommandResult::failure("resolve", "invalid_input", "product id must not be empty", 2);
    }

    let mode = config.cross_selling.resolution_mode;
    let context = SalesChannelContext::new(SalesChannelId::from(
        config.cross_selling.default_sales_channel.as_str(),
    ));

    let result = runtime.block_on(async {
        let pool =
            connect(&config.database).await.map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        if request.seed {
            if let Err(failure) = seed_demo_catalog(&pool).await {
                pool.close().await;
                return Err(failure);
            }
        }

        let route = ProductCrossSellingRoute::new(
            sqlite_ports(&pool, &config.cross_selling),
            CrossSellingEventDispatcher::new(),
        )
        .with_mode(mode);

        let resolved = route
            .resolve_cross_sellings(&ProductId::from(product_id.as_str()), &context)
            .await;
        pool.close().await;

        resolved.map_err(|error| {
            let class = error.class();
            let interface = error.into_interface(context.correlation_id.clone());
            (
                "resolution",
                format!("{interface} [{class}, correlation_id={}]", context.correlation_id),
                7u8,
            )
        })
    });

    let collection = match result {
        Ok(collection) => collection,
        Err(failure) => return CommandResult::from_failure("resolve", failure),
    };

    let groups = match serde_json::to_value(&collection) {
        Ok(groups) => groups,
        Err(error) => {
            let failure: CommandFailure = ("serialization", error.to_string(), 7u8);
            return CommandResult::from_failure("resolve", failure);
        }
    };

    CommandResult::success_with_data(
        "resolve",
        format!("resolved {} cross-selling group(s) for product `{product_id}`", collection.len()),
        json!({
            "product_id": product_id,
            "sales_channel_id": context.sales_channel_id,
            "mode": mode.as_str(),
            "groups": groups,
        }),
    )
}

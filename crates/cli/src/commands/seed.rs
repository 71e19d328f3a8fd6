use serde_json::json;

use crosssell_core::config::LoadOptions;
use crosssell_db::{connect, migrations, DemoCatalog, SeedResult, VerificationResult};

use crate::commands::{prepare, CommandFailure, CommandResult};

pub fn run(options: LoadOptions) -> CommandResult {
    let (config, runtime) = match prepare("seed", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool =
            connect(&config.database).await.map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let outcome = seed_demo_catalog(&pool).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok(seeded) => CommandResult::success_with_data(
            "seed",
            format!(
                "demo catalog loaded: {} products, {} product streams, {} cross-sellings",
                seeded.products,
                seeded.product_streams,
                seeded.cross_sellings.len()
            ),
            json!({
                "main_product_id": crosssell_db::fixtures::DEMO_MAIN_PRODUCT_ID,
                "sales_channel_id": crosssell_db::fixtures::DEMO_SALES_CHANNEL_ID,
                "cross_sellings": seeded.cross_sellings,
            }),
        ),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

/// Migrates, loads and verifies the demo catalog on an open pool. Shared
/// with `resolve --seed`.
pub(crate) async fn seed_demo_catalog(
    pool: &crosssell_db::DbPool,
) -> Result<SeedResult, CommandFailure> {
    migrations::run_pending(pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;

    let seeded = DemoCatalog::load(pool)
        .await
        .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
    let verification = DemoCatalog::verify(pool)
        .await
        .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

    if !verification.all_present {
        return Err(("seed_verification", verification_failure_message(&verification), 6u8));
    }
    Ok(seeded)
}

fn verification_failure_message(verification: &VerificationResult) -> String {
    let failed_checks = verification
        .checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "demo catalog failed to load".to_string()
    } else {
        format!("demo catalog verification failed for checks: {}", failed_checks.join(", "))
    }
}

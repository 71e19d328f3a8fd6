use crate::connection::DbPool;
use crate::repositories::RepositoryError;

pub const DEMO_MAIN_PRODUCT_ID: &str = "demo-camera-x100";
pub const DEMO_SALES_CHANNEL_ID: &str = "storefront";

const DEMO_PRODUCT_IDS: &[&str] = &[
    "demo-camera-x100",
    "demo-lens-35",
    "demo-lens-50",
    "demo-tripod",
    "demo-bag",
    "demo-bag-black",
    "demo-bag-grey",
    "demo-strap",
    "demo-sd-card",
    "demo-charger",
];

const DEMO_STREAM_IDS: &[&str] = &["demo-stream-accessories", "demo-stream-draft"];

/// Cross-sellings of the demo camera with their stored type and assigned
/// product count.
const DEMO_CROSS_SELLINGS: &[(&str, &str, i64)] = &[
    ("demo-xs-lenses", "productList", 5),
    ("demo-xs-accessories", "productStream", 0),
    ("demo-xs-empty", "productList", 0),
    ("demo-xs-unlinked", "productStream", 0),
    ("demo-xs-draft", "productStream", 0),
];

/// Deterministic catalog used by `seed` and by the integration tests.
pub struct DemoCatalog;

impl DemoCatalog {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_catalog.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(Self::SQL).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(SeedResult {
            products: DEMO_PRODUCT_IDS.len(),
            product_streams: DEMO_STREAM_IDS.len(),
            cross_sellings: DEMO_CROSS_SELLINGS.iter().map(|(id, _, _)| *id).collect(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let product_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM product WHERE id IN {}",
            sql_array_from_ids(DEMO_PRODUCT_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("products", product_count == DEMO_PRODUCT_IDS.len() as i64));

        let stream_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM product_stream WHERE id IN {}",
            sql_array_from_ids(DEMO_STREAM_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("product-streams", stream_count == DEMO_STREAM_IDS.len() as i64));

        for (id, kind, assigned) in DEMO_CROSS_SELLINGS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM product_cross_selling
                               WHERE id = ?1 AND product_id = ?2 AND type = ?3)",
            )
            .bind(*id)
            .bind(DEMO_MAIN_PRODUCT_ID)
            .bind(*kind)
            .fetch_one(pool)
            .await?;

            let assigned_count: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM product_cross_selling_assigned_products
                 WHERE cross_selling_id = ?1",
            )
            .bind(*id)
            .fetch_one(pool)
            .await?;

            checks.push((*id, exists == 1 && assigned_count == *assigned));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        // Assigned products and visibilities go with their parents.
        sqlx::query(&format!(
            "DELETE FROM product_cross_selling WHERE product_id = '{DEMO_MAIN_PRODUCT_ID}'"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM product_stream WHERE id IN {}",
            sql_array_from_ids(DEMO_STREAM_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM product WHERE id IN {}",
            sql_array_from_ids(DEMO_PRODUCT_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM system_config WHERE configuration_key = ?")
            .bind("core.listing.hideCloseoutProductsWhenOutOfStock")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub products: usize,
    pub product_streams: usize,
    pub cross_sellings: Vec<&'static str>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite};

use crosssell_core::criteria::{FieldSorting, SortDirection};
use crosssell_core::domain::cross_selling::{
    AssignedProduct, CrossSellingDefinition, CrossSellingId, CrossSellingType,
    DEFAULT_STREAM_LIMIT,
};
use crosssell_core::domain::product::ProductId;
use crosssell_core::domain::product_stream::ProductStreamId;
use crosssell_core::domain::sales_channel::SalesChannelContext;
use crosssell_core::errors::ApplicationError;
use crosssell_core::ports::CrossSellingRepository;

use super::{decode_error, RepositoryError};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlCrossSellingRepository {
    pool: DbPool,
    default_limit: u32,
}

impl SqlCrossSellingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, default_limit: DEFAULT_STREAM_LIMIT }
    }

    /// Limit used for stream definitions stored without one.
    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit;
        self
    }

    /// Upserts the definition and replaces its assigned products.
    pub async fn save(&self, cross_selling: &CrossSellingDefinition) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO product_cross_selling (id, product_id, name, position, active, type,
                                                product_stream_id, sort_by, sort_direction,
                                                stream_limit)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 product_id = excluded.product_id,
                 name = excluded.name,
                 position = excluded.position,
                 active = excluded.active,
                 type = excluded.type,
                 product_stream_id = excluded.product_stream_id,
                 sort_by = excluded.sort_by,
                 sort_direction = excluded.sort_direction,
                 stream_limit = excluded.stream_limit",
        )
        .bind(&cross_selling.id.0)
        .bind(&cross_selling.product_id.0)
        .bind(&cross_selling.name)
        .bind(cross_selling.position)
        .bind(cross_selling.active)
        .bind(cross_selling.kind.as_str())
        .bind(cross_selling.product_stream_id.as_ref().map(|stream| stream.0.as_str()))
        .bind(&cross_selling.sorting.field)
        .bind(cross_selling.sorting.direction.as_str())
        .bind(i64::from(cross_selling.limit))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM product_cross_selling_assigned_products WHERE cross_selling_id = ?")
            .bind(&cross_selling.id.0)
            .execute(&mut *tx)
            .await?;

        for assigned in &cross_selling.assigned_products {
            sqlx::query(
                "INSERT INTO product_cross_selling_assigned_products
                     (id, cross_selling_id, product_id, position)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&assigned.id)
            .bind(&cross_selling.id.0)
            .bind(&assigned.product_id.0)
            .bind(assigned.position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn find_active_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<CrossSellingDefinition>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, product_id, name, position, active, type, product_stream_id,
                    sort_by, sort_direction, stream_limit
             FROM product_cross_selling
             WHERE product_id = ? AND active = 1
             ORDER BY position ASC, id ASC",
        )
        .bind(&product_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut definitions = rows
            .iter()
            .map(|row| row_to_cross_selling(row, self.default_limit))
            .collect::<Result<Vec<_>, _>>()?;
        self.attach_assigned_products(&mut definitions).await?;
        Ok(definitions)
    }

    async fn attach_assigned_products(
        &self,
        definitions: &mut [CrossSellingDefinition],
    ) -> Result<(), RepositoryError> {
        if definitions.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, cross_selling_id, product_id, position
             FROM product_cross_selling_assigned_products
             WHERE cross_selling_id IN (",
        );
        let mut separated = builder.separated(", ");
        for definition in definitions.iter() {
            separated.push_bind(definition.id.0.clone());
        }
        separated.push_unseparated(") ORDER BY cross_selling_id, position, id");

        let mut by_definition: HashMap<String, Vec<AssignedProduct>> = HashMap::new();
        for row in builder.build().fetch_all(&self.pool).await? {
            let cross_selling_id: String = row.try_get("cross_selling_id").map_err(decode_error)?;
            let id: String = row.try_get("id").map_err(decode_error)?;
            let product_id: String = row.try_get("product_id").map_err(decode_error)?;
            let position: i32 = row.try_get("position").map_err(decode_error)?;

            by_definition.entry(cross_selling_id).or_default().push(AssignedProduct {
                id,
                product_id: ProductId(product_id),
                position,
            });
        }

        for definition in definitions.iter_mut() {
            definition.assigned_products = by_definition.remove(&definition.id.0).unwrap_or_default();
        }
        Ok(())
    }
}

fn row_to_cross_selling(
    row: &sqlx::sqlite::SqliteRow,
    default_limit: u32,
) -> Result<CrossSellingDefinition, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let product_id: String = row.try_get("product_id").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let position: i32 = row.try_get("position").map_err(decode_error)?;
    let active: bool = row.try_get("active").map_err(decode_error)?;
    let kind: String = row.try_get("type").map_err(decode_error)?;
    let product_stream_id: Option<String> =
        row.try_get("product_stream_id").map_err(decode_error)?;
    let sort_by: String = row.try_get("sort_by").map_err(decode_error)?;
    let sort_direction: String = row.try_get("sort_direction").map_err(decode_error)?;
    let stream_limit: Option<i64> = row.try_get("stream_limit").map_err(decode_error)?;

    let kind = kind.parse::<CrossSellingType>().map_err(decode_error)?;
    let direction = sort_direction.parse::<SortDirection>().map_err(RepositoryError::Decode)?;
    let limit = match stream_limit {
        Some(limit) => u32::try_from(limit).map_err(|_| {
            RepositoryError::Decode(format!("cross-selling `{id}` has invalid limit {limit}"))
        })?,
        None => default_limit,
    };

    Ok(CrossSellingDefinition {
        id: CrossSellingId(id),
        product_id: ProductId(product_id),
        name,
        position,
        active,
        kind,
        product_stream_id: product_stream_id.map(ProductStreamId),
        limit,
        sorting: FieldSorting::new(sort_by, direction),
        assigned_products: Vec::new(),
    })
}

#[async_trait]
impl CrossSellingRepository for SqlCrossSellingRepository {
    async fn fetch_active_for_product(
        &self,
        product_id: &ProductId,
        _context: &SalesChannelContext,
    ) -> Result<Vec<CrossSellingDefinition>, ApplicationError> {
        Ok(self.find_active_for_product(product_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crosssell_core::criteria::FieldSorting;
    use crosssell_core::domain::cross_selling::{
        AssignedProduct, CrossSellingDefinition, CrossSellingId, CrossSellingType,
    };
    use crosssell_core::domain::product::{Product, ProductId};

    use super::SqlCrossSellingRepository;
    use crate::repositories::SqlProductRepository;
    use crate::{connect_in_memory, migrations, DbPool};

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::from(id),
            parent_id: None,
            product_number: format!("SW-{id}"),
            name: id.to_owned(),
            active: true,
            stock: 2,
            is_closeout: false,
            visibilities: Vec::new(),
            created_at: Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap(),
        }
    }

    fn list(assigned: &[(&str, &str, i32)]) -> CrossSellingDefinition {
        CrossSellingDefinition {
            id: CrossSellingId::from("xs-list"),
            product_id: ProductId::from("main"),
            name: "Goes well with".to_owned(),
            position: 1,
            active: true,
            kind: CrossSellingType::ProductList,
            product_stream_id: None,
            limit: 24,
            sorting: FieldSorting::asc("name"),
            assigned_products: assigned
                .iter()
                .map(|(id, product_id, position)| AssignedProduct {
                    id: (*id).to_owned(),
                    product_id: ProductId::from(*product_id),
                    position: *position,
                })
                .collect(),
        }
    }

    async fn seeded() -> DbPool {
        let pool = connect_in_memory().await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let products = SqlProductRepository::new(pool.clone());
        for id in ["main", "a", "c"] {
            products.save(&product(id)).await.expect("save product");
        }
        pool
    }

    #[tokio::test]
    async fn assigned_products_load_in_curator_order() {
        let repo = SqlCrossSellingRepository::new(seeded().await);
        repo.save(&list(&[("ap-c", "c", 2), ("ap-a", "a", 1)])).await.expect("save");

        let found = repo.find_active_for_product(&ProductId::from("main")).await.expect("find");

        assert_eq!(found.len(), 1);
        let ids: Vec<&str> =
            found[0].assigned_products.iter().map(|assigned| assigned.product_id.0.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn product_assigned_twice_is_rejected_and_previous_list_kept() {
        let repo = SqlCrossSellingRepository::new(seeded().await);
        repo.save(&list(&[("ap-a", "a", 1), ("ap-c", "c", 2)])).await.expect("first save");

        let duplicate = list(&[("ap-a", "a", 1), ("ap-c", "c", 2), ("ap-a-again", "a", 3)]);
        assert!(repo.save(&duplicate).await.is_err());

        let found = repo.find_active_for_product(&ProductId::from("main")).await.expect("find");
        assert_eq!(found[0].assigned_products.len(), 2);
    }
}

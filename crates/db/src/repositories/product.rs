use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};

use crosssell_core::criteria::Criteria;
use crosssell_core::domain::product::{
    Product, ProductCollection, ProductId, ProductVisibility, Visibility,
};
use crosssell_core::domain::sales_channel::{SalesChannelContext, SalesChannelId};
use crosssell_core::errors::ApplicationError;
use crosssell_core::ports::{ProductListingLoader, ProductRepository};

use super::{decode_error, RepositoryError};
use crate::{query, DbPool};

const PRODUCT_COLUMNS: &str =
    "SELECT id, parent_id, product_number, name, active, stock, is_closeout, created_at FROM product";

#[derive(Clone)]
pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO product (id, parent_id, product_number, name, active, stock,
                                  is_closeout, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 parent_id = excluded.parent_id,
                 product_number = excluded.product_number,
                 name = excluded.name,
                 active = excluded.active,
                 stock = excluded.stock,
                 is_closeout = excluded.is_closeout",
        )
        .bind(&product.id.0)
        .bind(product.parent_id.as_ref().map(|parent| parent.0.as_str()))
        .bind(&product.product_number)
        .bind(&product.name)
        .bind(product.active)
        .bind(product.stock)
        .bind(product.is_closeout)
        .bind(product.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM product_visibility WHERE product_id = ?")
            .bind(&product.id.0)
            .execute(&mut *tx)
            .await?;

        for entry in &product.visibilities {
            sqlx::query(
                "INSERT INTO product_visibility (product_id, sales_channel_id, visibility)
                 VALUES (?, ?, ?)",
            )
            .bind(&product.id.0)
            .bind(&entry.sales_channel_id.0)
            .bind(entry.visibility.level())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let mut products = self.candidates(Some(std::slice::from_ref(id)), None).await?;
        Ok(products.pop())
    }

    /// Rows narrowed in SQL by id and, for listings, by storefront
    /// visibility. Everything else is left to the `query` module.
    async fn candidates(
        &self,
        ids: Option<&[ProductId]>,
        storefront: Option<&SalesChannelId>,
    ) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_some_and(|ids| ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(PRODUCT_COLUMNS);
        builder.push(" WHERE 1 = 1");
        if let Some(ids) = ids {
            builder.push(" AND id IN (");
            let mut separated = builder.separated(", ");
            for id in ids {
                separated.push_bind(id.0.clone());
            }
            separated.push_unseparated(")");
        }
        if let Some(sales_channel_id) = storefront {
            builder
                .push(
                    " AND active = 1 AND EXISTS (
                        SELECT 1 FROM product_visibility v
                        WHERE v.product_id = product.id AND v.sales_channel_id = ",
                )
                .push_bind(sales_channel_id.0.clone())
                .push(" AND v.visibility >= ")
                .push_bind(Visibility::Link.level())
                .push(")");
        }
        builder.push(" ORDER BY id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut products = rows.iter().map(row_to_product).collect::<Result<Vec<_>, _>>()?;
        self.attach_visibilities(&mut products).await?;
        Ok(products)
    }

    async fn attach_visibilities(&self, products: &mut [Product]) -> Result<(), RepositoryError> {
        if products.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT product_id, sales_channel_id, visibility FROM product_visibility
             WHERE product_id IN (",
        );
        let mut separated = builder.separated(", ");
        for product in products.iter() {
            separated.push_bind(product.id.0.clone());
        }
        separated.push_unseparated(") ORDER BY product_id, sales_channel_id");

        let mut by_product: HashMap<String, Vec<ProductVisibility>> = HashMap::new();
        for row in builder.build().fetch_all(&self.pool).await? {
            let product_id: String = row.try_get("product_id").map_err(decode_error)?;
            let sales_channel_id: String = row.try_get("sales_channel_id").map_err(decode_error)?;
            let level: i64 = row.try_get("visibility").map_err(decode_error)?;
            let visibility = Visibility::from_level(level).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown visibility level {level}"))
            })?;

            by_product.entry(product_id).or_default().push(ProductVisibility {
                sales_channel_id: SalesChannelId(sales_channel_id),
                visibility,
            });
        }

        for product in products.iter_mut() {
            product.visibilities = by_product.remove(&product.id.0).unwrap_or_default();
        }
        Ok(())
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let parent_id: Option<String> = row.try_get("parent_id").map_err(decode_error)?;
    let product_number: String = row.try_get("product_number").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let active: bool = row.try_get("active").map_err(decode_error)?;
    let stock: i64 = row.try_get("stock").map_err(decode_error)?;
    let is_closeout: bool = row.try_get("is_closeout").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("product `{id}` created_at: {error}")))?;

    Ok(Product {
        id: ProductId(id),
        parent_id: parent_id.map(ProductId),
        product_number,
        name,
        active,
        stock,
        is_closeout,
        visibilities: Vec::new(),
        created_at,
    })
}

#[async_trait]
impl ProductRepository for SqlProductRepository {
    async fn search(
        &self,
        criteria: &Criteria,
        _context: &SalesChannelContext,
    ) -> Result<ProductCollection, ApplicationError> {
        let candidates = self.candidates(criteria.ids.as_deref(), None).await?;
        Ok(query::search(candidates, criteria))
    }
}

/// Listing search over the SQLite catalog.
#[derive(Clone)]
pub struct SqlProductListingLoader {
    products: SqlProductRepository,
}

impl SqlProductListingLoader {
    pub fn new(pool: DbPool) -> Self {
        Self { products: SqlProductRepository::new(pool) }
    }
}

#[async_trait]
impl ProductListingLoader for SqlProductListingLoader {
    async fn load(
        &self,
        criteria: &Criteria,
        context: &SalesChannelContext,
    ) -> Result<ProductCollection, ApplicationError> {
        let candidates = self
            .products
            .candidates(criteria.ids.as_deref(), Some(&context.sales_channel_id))
            .await?;
        Ok(query::listing(candidates, criteria, context))
    }
}

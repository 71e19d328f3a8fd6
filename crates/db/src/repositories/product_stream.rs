use async_trait::async_trait;
use sqlx::Row;

use crosssell_core::criteria::Filter;
use crosssell_core::domain::product_stream::{ProductStream, ProductStreamId};
use crosssell_core::errors::ApplicationError;
use crosssell_core::ports::ProductStreamRepository;

use super::{decode_error, RepositoryError};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlProductStreamRepository {
    pool: DbPool,
}

impl SqlProductStreamRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: &ProductStreamId) -> Result<Option<ProductStream>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, api_filter FROM product_stream WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_stream(r)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, stream: &ProductStream) -> Result<(), RepositoryError> {
        let api_filter = stream
            .api_filter
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(decode_error)?;

        sqlx::query(
            "INSERT INTO product_stream (id, name, api_filter)
             VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 api_filter = excluded.api_filter",
        )
        .bind(&stream.id.0)
        .bind(&stream.name)
        .bind(api_filter)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_stream(row: &sqlx::sqlite::SqliteRow) -> Result<ProductStream, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let api_filter: Option<String> = row.try_get("api_filter").map_err(decode_error)?;

    let api_filter = api_filter
        .map(|raw| serde_json::from_str::<Vec<Filter>>(&raw))
        .transpose()
        .map_err(|error| {
            RepositoryError::Decode(format!("product stream `{id}` api_filter: {error}"))
        })?;

    Ok(ProductStream { id: ProductStreamId(id), name, api_filter })
}

#[async_trait]
impl ProductStreamRepository for SqlProductStreamRepository {
    async fn find_by_id(
        &self,
        id: &ProductStreamId,
    ) -> Result<Option<ProductStream>, ApplicationError> {
        Ok(self.find(id).await?)
    }
}

use async_trait::async_trait;
use serde_json::Value;
use sqlx::Row;

use crosssell_core::domain::sales_channel::SalesChannelId;
use crosssell_core::errors::ApplicationError;
use crosssell_core::ports::SystemConfigService;

use super::{decode_error, RepositoryError};
use crate::DbPool;

/// Key/value settings stored as JSON, optionally scoped to a sales channel.
#[derive(Clone)]
pub struct SqlSystemConfigService {
    pool: DbPool,
}

impl SqlSystemConfigService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn set(
        &self,
        key: &str,
        value: &Value,
        sales_channel_id: Option<&SalesChannelId>,
    ) -> Result<(), RepositoryError> {
        let encoded = serde_json::to_string(value).map_err(decode_error)?;

        sqlx::query(
            "INSERT INTO system_config (id, configuration_key, configuration_value, sales_channel_id)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET configuration_value = excluded.configuration_value",
        )
        .bind(row_id(key, sales_channel_id))
        .bind(key)
        .bind(encoded)
        .bind(sales_channel_id.map(|channel| channel.0.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Channel value when present, otherwise the global one.
    pub async fn get(
        &self,
        key: &str,
        sales_channel_id: Option<&SalesChannelId>,
    ) -> Result<Option<Value>, RepositoryError> {
        let row = sqlx::query(
            "SELECT configuration_value FROM system_config
             WHERE configuration_key = ?1
               AND (sales_channel_id IS NULL OR sales_channel_id = ?2)
             ORDER BY sales_channel_id IS NULL ASC
             LIMIT 1",
        )
        .bind(key)
        .bind(sales_channel_id.map(|channel| channel.0.as_str()))
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("configuration_value").map_err(decode_error)?;
        let value = serde_json::from_str(&raw).map_err(|error| {
            RepositoryError::Decode(format!("system config `{key}`: {error}"))
        })?;
        Ok(Some(value))
    }
}

fn row_id(key: &str, sales_channel_id: Option<&SalesChannelId>) -> String {
    match sales_channel_id {
        Some(channel) => format!("{key}@{channel}"),
        None => key.to_string(),
    }
}

/// Truthiness of a stored setting. `null` counts as unset.
pub fn config_value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => Some(number.as_f64().is_some_and(|n| n != 0.0)),
        Value::String(text) => Some(!(text.is_empty() || text == "0")),
        Value::Array(items) => Some(!items.is_empty()),
        Value::Object(entries) => Some(!entries.is_empty()),
    }
}

#[async_trait]
impl SystemConfigService for SqlSystemConfigService {
    async fn get_bool(
        &self,
        key: &str,
        sales_channel_id: Option<&SalesChannelId>,
    ) -> Result<Option<bool>, ApplicationError> {
        let value = self.get(key, sales_channel_id).await?;
        Ok(value.as_ref().and_then(config_value_as_bool))
    }
}

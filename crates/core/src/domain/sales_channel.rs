use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesChannelId(pub String);

impl fmt::Display for SalesChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SalesChannelId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Per-request context a storefront call runs under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesChannelContext {
    pub sales_channel_id: SalesChannelId,
    pub language_id: Option<String>,
    pub correlation_id: String,
}

impl SalesChannelContext {
    pub fn new(sales_channel_id: SalesChannelId) -> Self {
        Self { sales_channel_id, language_id: None, correlation_id: Uuid::new_v4().to_string() }
    }

    pub fn with_language(mut self, language_id: impl Into<String>) -> Self {
        self.language_id = Some(language_id.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }
}

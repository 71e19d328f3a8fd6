//! Cross-selling resolution for a product detail page.

pub mod availability;
pub mod events;
pub mod product_list;
pub mod product_stream;
pub mod route;

use serde::{Deserialize, Serialize};

pub use availability::HIDE_CLOSEOUT_WHEN_OUT_OF_STOCK;
pub use events::{
    CrossSellingEventDispatcher, CrossSellingSubscriber, CrossSellingsLoadedEvent,
    IdsCriteriaEvent, InMemoryHookRecorder, RecordedHook, StreamCriteriaEvent,
};
pub use route::{CrossSellingPorts, CrossSellingRoute, ProductCrossSellingRoute};

/// How the groups of one request are resolved. Output is identical in both
/// modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    #[default]
    Sequential,
    Concurrent,
}

impl ResolutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Concurrent => "concurrent",
        }
    }
}

impl std::str::FromStr for ResolutionMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(format!("unsupported resolution mode `{other}`")),
        }
    }
}

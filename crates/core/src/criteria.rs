//! Query description handed to the product search and listing services.
//!
//! The resolvers only build and adjust `Criteria`; executing them is the job of
//! whatever implements the search ports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::product::{ProductId, Visibility};
use crate::domain::sales_channel::SalesChannelId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Ascending),
            "DESC" => Ok(Self::Descending),
            other => Err(format!("unsupported sort direction `{other}` (expected ASC|DESC)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSorting {
    pub field: String,
    pub direction: SortDirection,
}

impl FieldSorting {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self { field: field.into(), direction }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Descending)
    }
}

impl Default for FieldSorting {
    fn default() -> Self {
        Self::asc("name")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiOperator {
    And,
    Or,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
}

/// Filter tree. Product streams persist it as JSON, so the wire shape matters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Filter {
    Equals {
        field: String,
        value: Value,
    },
    EqualsAny {
        field: String,
        value: Vec<Value>,
    },
    Contains {
        field: String,
        value: String,
    },
    Range {
        field: String,
        parameters: RangeParameters,
    },
    /// Matches when the inner filters, combined with `operator`, do not match.
    Not {
        operator: MultiOperator,
        queries: Vec<Filter>,
    },
    Multi {
        operator: MultiOperator,
        queries: Vec<Filter>,
    },
    /// Active products exposed in the sales channel at `visibility` or higher.
    ProductAvailable {
        #[serde(rename = "salesChannelId")]
        sales_channel_id: SalesChannelId,
        visibility: Visibility,
    },
    /// Drops closeout products that are out of stock.
    ProductCloseout,
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals { field: field.into(), value: value.into() }
    }

    pub fn equals_any<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::EqualsAny { field: field.into(), value: values.into_iter().map(Into::into).collect() }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Contains { field: field.into(), value: value.into() }
    }

    pub fn range(field: impl Into<String>, parameters: RangeParameters) -> Self {
        Self::Range { field: field.into(), parameters }
    }

    pub fn not(operator: MultiOperator, queries: Vec<Filter>) -> Self {
        Self::Not { operator, queries }
    }

    pub fn multi(operator: MultiOperator, queries: Vec<Filter>) -> Self {
        Self::Multi { operator, queries }
    }

    pub fn product_available(sales_channel_id: SalesChannelId, visibility: Visibility) -> Self {
        Self::ProductAvailable { sales_channel_id, visibility }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<ProductId>>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sortings: Vec<FieldSorting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(default)]
    pub associations: Vec<String>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: Vec<ProductId>) -> Self {
        Self { ids: Some(ids), ..Self::default() }
    }

    pub fn add_filter(&mut self, filter: Filter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    pub fn add_filters(&mut self, filters: impl IntoIterator<Item = Filter>) -> &mut Self {
        self.filters.extend(filters);
        self
    }

    pub fn add_sorting(&mut self, sorting: FieldSorting) -> &mut Self {
        self.sortings.push(sorting);
        self
    }

    pub fn set_limit(&mut self, limit: Option<u32>) -> &mut Self {
        self.limit = limit;
        self
    }

    pub fn set_offset(&mut self, offset: Option<u32>) -> &mut Self {
        self.offset = offset;
        self
    }

    pub fn add_association(&mut self, association: impl Into<String>) -> &mut Self {
        self.associations.push(association.into());
        self
    }

    pub fn has_filter(&self, predicate: impl Fn(&Filter) -> bool) -> bool {
        self.filters.iter().any(predicate)
    }
}

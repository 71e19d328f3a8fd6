use std::fmt;

use serde::{Deserialize, Serialize};

use crate::criteria::Filter;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductStreamId(pub String);

impl fmt::Display for ProductStreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductStreamId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A saved, reusable product query.
///
/// `api_filter` is `None` until an administrator configures the stream; such a
/// stream cannot be compiled into filters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductStream {
    pub id: ProductStreamId,
    pub name: String,
    pub api_filter: Option<Vec<Filter>>,
}

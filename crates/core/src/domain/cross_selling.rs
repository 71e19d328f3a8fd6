use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::criteria::FieldSorting;
use crate::domain::product::{ProductCollection, ProductId};
use crate::domain::product_stream::ProductStreamId;
use crate::errors::DomainError;

pub const DEFAULT_STREAM_LIMIT: u32 = 24;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrossSellingId(pub String);

impl fmt::Display for CrossSellingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CrossSellingId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CrossSellingType {
    ProductList,
    ProductStream,
}

impl CrossSellingType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductList => "productList",
            Self::ProductStream => "productStream",
        }
    }
}

impl FromStr for CrossSellingType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "productList" => Ok(Self::ProductList),
            "productStream" => Ok(Self::ProductStream),
            other => Err(DomainError::InvalidCrossSelling(format!(
                "unsupported cross-selling type `{other}` (expected productList|productStream)"
            ))),
        }
    }
}

/// Curator-assigned member of a product-list cross-selling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedProduct {
    pub id: String,
    pub product_id: ProductId,
    pub position: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossSellingDefinition {
    pub id: CrossSellingId,
    pub product_id: ProductId,
    pub name: String,
    pub position: i32,
    pub active: bool,
    #[serde(rename = "type")]
    pub kind: CrossSellingType,
    pub product_stream_id: Option<ProductStreamId>,
    pub limit: u32,
    pub sorting: FieldSorting,
    pub assigned_products: Vec<AssignedProduct>,
}

/// Where the products of a cross-selling come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrossSellingSource<'a> {
    Stream(&'a ProductStreamId),
    AssignedProducts(&'a [AssignedProduct]),
}

impl CrossSellingDefinition {
    /// A stream-typed definition without a stream reference is served from
    /// its assigned products, which usually yields nothing.
    pub fn source(&self) -> CrossSellingSource<'_> {
        match (self.kind, self.product_stream_id.as_ref()) {
            (CrossSellingType::ProductStream, Some(stream_id)) => {
                CrossSellingSource::Stream(stream_id)
            }
            _ => CrossSellingSource::AssignedProducts(&self.assigned_products),
        }
    }
}

/// Assigned product ids in curator order. Ties keep their stored order and a
/// product assigned twice keeps its first slot.
pub fn product_ids_by_position(assigned: &[AssignedProduct]) -> Vec<ProductId> {
    let mut sorted: Vec<&AssignedProduct> = assigned.iter().collect();
    sorted.sort_by_key(|entry| entry.position);

    let mut seen = HashSet::with_capacity(sorted.len());
    sorted
        .into_iter()
        .filter(|entry| seen.insert(&entry.product_id))
        .map(|entry| entry.product_id.clone())
        .collect()
}

/// One resolved cross-selling group.
///
/// For product lists `total` is the curated size even when fewer products
/// survived filtering; for streams it equals `products.len()`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossSellingElement {
    pub cross_selling: CrossSellingDefinition,
    pub products: ProductCollection,
    pub total: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrossSellingElementCollection(Vec<CrossSellingElement>);

impl CrossSellingElementCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, element: CrossSellingElement) {
        self.0.push(element);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CrossSellingElement> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<CrossSellingElement> {
        self.0
    }
}

impl<'a> IntoIterator for &'a CrossSellingElementCollection {
    type Item = &'a CrossSellingElement;
    type IntoIter = std::slice::Iter<'a, CrossSellingElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

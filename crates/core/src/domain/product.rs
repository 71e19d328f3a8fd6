use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::sales_channel::SalesChannelId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// How far a product is exposed inside one sales channel.
///
/// Levels are ordered: a filter requiring `Link` is satisfied by `Search` and
/// `All` as well.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Link,
    Search,
    All,
}

impl Visibility {
    pub fn level(self) -> i64 {
        match self {
            Self::Link => 10,
            Self::Search => 20,
            Self::All => 30,
        }
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            10 => Some(Self::Link),
            20 => Some(Self::Search),
            30 => Some(Self::All),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVisibility {
    pub sales_channel_id: SalesChannelId,
    pub visibility: Visibility,
}

/// Read-side product snapshot. Carries only what the cross-selling filters
/// need to decide visibility and availability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub parent_id: Option<ProductId>,
    pub product_number: String,
    pub name: String,
    pub active: bool,
    pub stock: i64,
    pub is_closeout: bool,
    pub visibilities: Vec<ProductVisibility>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn available(&self) -> bool {
        self.stock > 0
    }

    /// Variants share the display group of their parent.
    pub fn display_group(&self) -> &ProductId {
        self.parent_id.as_ref().unwrap_or(&self.id)
    }

    pub fn visibility_in(&self, sales_channel_id: &SalesChannelId) -> Option<Visibility> {
        self.visibilities
            .iter()
            .find(|entry| &entry.sales_channel_id == sales_channel_id)
            .map(|entry| entry.visibility)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCollection(Vec<Product>);

impl ProductCollection {
    pub fn new(products: Vec<Product>) -> Self {
        Self(products)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Product> {
        self.0.iter()
    }

    pub fn ids(&self) -> Vec<ProductId> {
        self.0.iter().map(|product| product.id.clone()).collect()
    }

    pub fn into_inner(self) -> Vec<Product> {
        self.0
    }

    /// Reorders the collection to follow `ids`. A repeated id ranks at its
    /// first occurrence; products missing from `ids` are dropped.
    pub fn sort_by_id_array(&mut self, ids: &[ProductId]) {
        let mut rank: HashMap<&ProductId, usize> = HashMap::with_capacity(ids.len());
        for (index, id) in ids.iter().enumerate() {
            rank.entry(id).or_insert(index);
        }

        let mut ranked: Vec<(usize, Product)> = std::mem::take(&mut self.0)
            .into_iter()
            .filter_map(|product| rank.get(&product.id).copied().map(|index| (index, product)))
            .collect();
        ranked.sort_by_key(|(index, _)| *index);
        self.0 = ranked.into_iter().map(|(_, product)| product).collect();
    }
}

impl FromIterator<Product> for ProductCollection {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ProductCollection {
    type Item = Product;
    type IntoIter = std::vec::IntoIter<Product>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ProductCollection {
    type Item = &'a Product;
    type IntoIter = std::slice::Iter<'a, Product>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

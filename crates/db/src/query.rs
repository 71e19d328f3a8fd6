//! In-process evaluation of `Criteria` against product snapshots.
//!
//! Both adapter families fetch candidate rows and then run them through the
//! functions here, so filtering, sorting and paging behave the same whether
//! the catalog lives in SQLite or in memory.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde_json::Value;

use crosssell_core::criteria::{
    Criteria, FieldSorting, Filter, MultiOperator, RangeParameters, SortDirection,
};
use crosssell_core::domain::product::{Product, ProductCollection, ProductId, Visibility};
use crosssell_core::domain::sales_channel::SalesChannelContext;

/// Value of a filterable/sortable product field. Unknown fields are `Null`.
pub fn field_value(product: &Product, field: &str) -> Value {
    let field = field.strip_prefix("product.").unwrap_or(field);
    match field {
        "id" => Value::from(product.id.0.as_str()),
        "parentId" => product
            .parent_id
            .as_ref()
            .map(|parent| Value::from(parent.0.as_str()))
            .unwrap_or(Value::Null),
        "productNumber" => Value::from(product.product_number.as_str()),
        "name" => Value::from(product.name.as_str()),
        "active" => Value::from(product.active),
        "stock" => Value::from(product.stock),
        "available" => Value::from(product.available()),
        "isCloseout" => Value::from(product.is_closeout),
        "createdAt" => Value::from(product.created_at.to_rfc3339()),
        _ => Value::Null,
    }
}

pub fn matches(product: &Product, filter: &Filter) -> bool {
    match filter {
        Filter::Equals { field, value } => values_equal(&field_value(product, field), value),
        Filter::EqualsAny { field, value } => {
            let actual = field_value(product, field);
            value.iter().any(|candidate| values_equal(&actual, candidate))
        }
        Filter::Contains { field, value } => match field_value(product, field) {
            Value::String(actual) => actual.to_lowercase().contains(&value.to_lowercase()),
            _ => false,
        },
        Filter::Range { field, parameters } => {
            field_value(product, field).as_f64().is_some_and(|actual| in_range(actual, parameters))
        }
        Filter::Not { operator, queries } => !matches_all(product, *operator, queries),
        Filter::Multi { operator, queries } => matches_all(product, *operator, queries),
        Filter::ProductAvailable { sales_channel_id, visibility } => {
            product.active
                && product
                    .visibility_in(sales_channel_id)
                    .is_some_and(|level| level >= *visibility)
        }
        Filter::ProductCloseout => !(product.is_closeout && !product.available()),
    }
}

fn matches_all(product: &Product, operator: MultiOperator, queries: &[Filter]) -> bool {
    match operator {
        MultiOperator::And => queries.iter().all(|query| matches(product, query)),
        MultiOperator::Or => queries.iter().any(|query| matches(product, query)),
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(left), Some(right)) => left == right,
        _ => actual == expected,
    }
}

fn in_range(actual: f64, parameters: &RangeParameters) -> bool {
    parameters.gte.map_or(true, |bound| actual >= bound)
        && parameters.gt.map_or(true, |bound| actual > bound)
        && parameters.lte.map_or(true, |bound| actual <= bound)
        && parameters.lt.map_or(true, |bound| actual < bound)
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::String(left), Value::String(right)) => {
            left.to_lowercase().cmp(&right.to_lowercase()).then_with(|| left.cmp(right))
        }
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

/// Stable multi-key sort; products equal on every key keep their input order.
pub fn sort(products: &mut [Product], sortings: &[FieldSorting]) {
    if sortings.is_empty() {
        return;
    }

    products.sort_by(|left, right| {
        sortings.iter().fold(Ordering::Equal, |ordering, sorting| {
            ordering.then_with(|| {
                let ordering = compare_values(
                    &field_value(left, &sorting.field),
                    &field_value(right, &sorting.field),
                );
                match sorting.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            })
        })
    });
}

/// Keeps the first product of every display group.
pub fn collapse_variants(products: Vec<Product>) -> Vec<Product> {
    let mut seen: HashSet<ProductId> = HashSet::new();
    products.into_iter().filter(|product| seen.insert(product.display_group().clone())).collect()
}

fn page(products: Vec<Product>, criteria: &Criteria) -> Vec<Product> {
    let offset = criteria.offset.unwrap_or(0) as usize;
    let limit = criteria.limit.map(|limit| limit as usize).unwrap_or(usize::MAX);
    products.into_iter().skip(offset).take(limit).collect()
}

fn filtered(products: impl IntoIterator<Item = Product>, criteria: &Criteria) -> Vec<Product> {
    let ids: Option<HashSet<&ProductId>> =
        criteria.ids.as_ref().map(|ids| ids.iter().collect());

    products
        .into_iter()
        .filter(|product| ids.as_ref().map_or(true, |ids| ids.contains(&product.id)))
        .filter(|product| criteria.filters.iter().all(|filter| matches(product, filter)))
        .collect()
}

/// Plain search: filter, sort, then page.
pub fn search(products: impl IntoIterator<Item = Product>, criteria: &Criteria) -> ProductCollection {
    let mut products = filtered(products, criteria);
    sort(&mut products, &criteria.sortings);
    page(products, criteria).into_iter().collect()
}

/// Storefront listing: active products visible in the context's sales channel,
/// sorted, one entry per display group, then paged.
pub fn listing(
    products: impl IntoIterator<Item = Product>,
    criteria: &Criteria,
    context: &SalesChannelContext,
) -> ProductCollection {
    let storefront = Filter::product_available(context.sales_channel_id.clone(), Visibility::Link);
    let mut products: Vec<Product> = filtered(products, criteria)
        .into_iter()
        .filter(|product| matches(product, &storefront))
        .collect();
    sort(&mut products, &criteria.sortings);
    page(collapse_variants(products), criteria).into_iter().collect()
}

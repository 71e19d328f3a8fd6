pub mod config;
pub mod criteria;
pub mod cross_selling;
pub mod domain;
pub mod errors;
pub mod ports;

pub use criteria::{Criteria, FieldSorting, Filter, SortDirection};
pub use cross_selling::{
    CrossSellingEventDispatcher, CrossSellingPorts, CrossSellingRoute, CrossSellingSubscriber,
    ProductCrossSellingRoute, ResolutionMode,
};
pub use domain::cross_selling::{
    CrossSellingDefinition, CrossSellingElement, CrossSellingElementCollection, CrossSellingId,
    CrossSellingType,
};
pub use domain::product::{Product, ProductCollection, ProductId, Visibility};
pub use domain::product_stream::{ProductStream, ProductStreamId};
pub use domain::sales_channel::{SalesChannelContext, SalesChannelId};
pub use errors::{ApplicationError, DomainError, InterfaceError};

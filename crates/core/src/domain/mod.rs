pub mod cross_selling;
pub mod product;
pub mod product_stream;
pub mod sales_channel;

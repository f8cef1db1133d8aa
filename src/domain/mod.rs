pub mod codec;
pub mod errors;
pub mod order;
pub mod order_number;
pub mod ports;
pub mod query;
pub mod retention;

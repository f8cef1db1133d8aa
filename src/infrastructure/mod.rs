pub mod memory;
pub mod models;
pub mod sheet_store;

pub use memory::InMemoryRowStore;
pub use sheet_store::DieselRowStore;

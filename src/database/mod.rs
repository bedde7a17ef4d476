pub mod manager;
pub mod memory;
pub mod postgres;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::{update_typed, update_with, Document, DocumentStore, StoreError, WriteOp};

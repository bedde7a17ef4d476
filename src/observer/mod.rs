// Observer system for company-scoped data writes
// Observers run in ring order; rings before Database may veto the write.

pub mod context;
pub mod traits;
pub mod pipeline;
pub mod error;
pub mod implementations;

// Re-export core types
pub use context::*;
pub use traits::*;
pub use pipeline::*;
pub use error::*;

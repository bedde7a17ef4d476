// Observer implementations organized by rings
// Each ring handles a specific phase of a company data write

use crate::observer::pipeline::ObserverPipeline;

// Ring 0: Data Preparation - collection allowlist, then load existing record
#[path = "0/collection_allowlist.rs"]
pub mod collection_allowlist;
#[path = "0/existing_loader.rs"]
pub mod existing_loader;

// Ring 1: Input Validation
#[path = "1/system_field_guard.rs"]
pub mod system_field_guard;
#[path = "1/required_fields.rs"]
pub mod required_fields;

// Ring 4: Enrichment
#[path = "4/timestamps.rs"]
pub mod timestamps;
#[path = "4/number_assigner.rs"]
pub mod number_assigner;

// Ring 5: Database
#[path = "5/document_writer.rs"]
pub mod document_writer;

// Ring 6: Post-Database
#[path = "6/activity_log.rs"]
pub mod activity_log;

pub use activity_log::ActivityLogObserver;
pub use collection_allowlist::{is_allowed_collection, CollectionAllowlistObserver, DATA_COLLECTIONS};
pub use document_writer::DocumentWriterObserver;
pub use existing_loader::ExistingRecordLoader;
pub use number_assigner::NumberAssignerObserver;
pub use required_fields::{required_fields, RequiredFieldsObserver};
pub use system_field_guard::{SystemFieldGuard, SYSTEM_FIELDS};
pub use timestamps::TimestampsObserver;

/// Register every built-in observer
pub fn register_all(pipeline: &mut ObserverPipeline) {
    pipeline.register_observer(Box::new(CollectionAllowlistObserver));
    pipeline.register_observer(Box::new(ExistingRecordLoader));
    pipeline.register_observer(Box::new(SystemFieldGuard));
    pipeline.register_observer(Box::new(RequiredFieldsObserver));
    pipeline.register_observer(Box::new(TimestampsObserver));
    pipeline.register_observer(Box::new(NumberAssignerObserver));
    pipeline.register_observer(Box::new(DocumentWriterObserver));
    pipeline.register_observer(Box::new(ActivityLogObserver));
}

//! Data module - CSV loading, validation and preprocessing

mod loader;
mod processor;
pub mod schema;

pub use loader::{LoaderError, TableCache};
pub use processor::{
    standardize_occupation, standardize_state, DataProcessor, PreprocessSummary, ProcessorError,
};
pub use schema::{KycStatus, SchemaError, TransactionRecord, UserRecord};

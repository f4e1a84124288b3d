// Pipeline processing: parsing, enrichment, merging, classification and MTL assembly

pub mod address;
pub mod classify;
pub mod enrich;
pub mod merge;
pub mod mtl;
pub mod parser;
pub mod text;
pub mod text_library;

pub use classify::{ClassificationTables, Classifier};
pub use mtl::{MtlBuilder, MtlOutcome};
pub use parser::ParseOutcome;
pub use text::TextProcessor;

//! Python source extraction and project assembly

pub mod config;
pub mod coordinator;
pub mod extractor;
pub mod languages;
pub mod parser;
pub mod resolver;
pub mod usages;


#[cfg(test)]
pub mod test_utils;

pub use config::{CONFIG_FILE, ConfigError, IndexConfig};
pub use coordinator::{Coordinator, IndexStats};
pub use extractor::{
    ExtractError, ExtractionResult, ImportRecord, ImportedName, LanguageExtractor, SourceFile,
};
pub use parser::{FileType, SourceParser};

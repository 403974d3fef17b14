//! Language extractors for supported source languages

pub mod python;

use crate::extractor::{ExtractError, LanguageExtractor};
use crate::parser::FileType;

/// Build the extractor for `file_type`. Loads the grammar.
pub fn extractor_for(file_type: FileType) -> Result<Box<dyn LanguageExtractor>, ExtractError> {
    match file_type {
        FileType::Python => Ok(Box::new(python::PythonExtractor::new()?)),
    }
}

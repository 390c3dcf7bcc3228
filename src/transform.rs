//! Source transform hook
//!
//! Runs before usage extraction. Lets an embedding host rewrite a file (compile a template,
//! strip comments, inline imports) so the engine sees what actually ships.

use std::path::Path;

/// Output of a transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutput {
    /// Extract from the original content
    Unchanged,
    /// Extract from this code instead
    Code(String),
    /// Replacement code with its source map
    CodeWithMap { code: String, map: String },
}

impl TransformOutput {
    /// Code to extract from, given the original content.
    pub fn code<'a>(&'a self, original: &'a str) -> &'a str {
        match self {
            TransformOutput::Unchanged => original,
            TransformOutput::Code(code) | TransformOutput::CodeWithMap { code, .. } => code,
        }
    }
}

/// User-supplied transform
pub trait SourceTransform: Send + Sync {
    fn transform(&self, path: &Path, content: &str) -> TransformOutput;
}

impl<F> SourceTransform for F
where
    F: Fn(&Path, &str) -> TransformOutput + Send + Sync,
{
    fn transform(&self, path: &Path, content: &str) -> TransformOutput {
        self(path, content)
    }
}

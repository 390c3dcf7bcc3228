//! Utility-class engine
//!
//! Recognizes configured utility class names anywhere in a source file and renders one rule per
//! used utility, preceded by the design tokens as custom properties and every keyframes block.
//! Output is sorted, so rendering the same usages always produces the same bytes.

use super::{GenerationContext, GenerationEngine, LoadedConfig, ParseResult};
use crate::config::GeneratorConfig;
use crate::error::{ContextError, ExtractionError};
use crate::path::FileId;
use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;
use std::sync::Arc;
use tracing::trace;

/// Characters that can never be part of a class token
const TOKEN_SEPARATORS: &str = r"[^A-Za-z0-9_\-:/.\[\]#%]+";

/// Engine producing `UtilityContext`s
#[derive(Debug, Clone, Default)]
pub struct UtilityEngine;

impl UtilityEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GenerationEngine for UtilityEngine {
    async fn create_context(
        &self,
        config: &LoadedConfig,
    ) -> Result<Arc<dyn GenerationContext>, ContextError> {
        let context = UtilityContext::new(config.config.clone())?;
        Ok(Arc::new(context))
    }
}

/// Generation context for the utility engine
pub struct UtilityContext {
    config: GeneratorConfig,
    separators: Regex,
    /// file → usages extracted from its latest content
    usages: Mutex<HashMap<FileId, BTreeSet<String>>>,
}

impl UtilityContext {
    pub fn new(config: GeneratorConfig) -> Result<Self, ContextError> {
        let separators = Regex::new(TOKEN_SEPARATORS)
            .map_err(|e| ContextError::Initialization(format!("Invalid token pattern: {}", e)))?;
        Ok(Self {
            config,
            separators,
            usages: Mutex::new(HashMap::new()),
        })
    }

    /// Map a source token to a configured utility name.
    fn utility_for<'a>(&self, token: &'a str) -> Option<&'a str> {
        let name = match &self.config.prefix {
            Some(prefix) => token.strip_prefix(prefix.as_str())?.strip_prefix('-')?,
            None => token,
        };
        self.config.utilities.contains_key(name).then_some(name)
    }

    fn class_name(&self, utility: &str) -> String {
        match &self.config.prefix {
            Some(prefix) => format!("{}-{}", prefix, utility),
            None => utility.to_string(),
        }
    }

    /// Union of every file's usages.
    pub fn accumulated(&self) -> BTreeSet<String> {
        self.usages
            .lock()
            .values()
            .flat_map(|set| set.iter().cloned())
            .collect()
    }

    fn render_used(&self, used: &BTreeSet<String>) -> String {
        let mut css = String::new();

        if !self.config.tokens.is_empty() {
            css.push_str(":root {\n");
            for (name, value) in &self.config.tokens {
                let _ = writeln!(css, "  --{}: {};", name, value.trim());
            }
            css.push_str("}\n");
        }

        for (name, body) in &self.config.keyframes {
            if !css.is_empty() {
                css.push('\n');
            }
            let _ = writeln!(css, "@keyframes {} {{\n  {}\n}}", name, body.trim());
        }

        for utility in used {
            let Some(declarations) = self.config.utilities.get(utility) else {
                continue;
            };
            if !css.is_empty() {
                css.push('\n');
            }
            let _ = writeln!(css, ".{} {{", escape_class(&self.class_name(utility)));
            for declaration in declarations.split(';') {
                let declaration = declaration.trim();
                if !declaration.is_empty() {
                    let _ = writeln!(css, "  {};", declaration);
                }
            }
            css.push_str("}\n");
        }

        css
    }
}

#[async_trait]
impl GenerationContext for UtilityContext {
    async fn extract(&self, file: &FileId, content: &str) -> Result<ParseResult, ExtractionError> {
        if content.contains('\0') {
            return Err(ExtractionError::Malformed {
                file: file.clone(),
                message: "content contains a NUL byte".to_string(),
            });
        }

        let usages: BTreeSet<String> = self
            .separators
            .split(content)
            .filter_map(|token| self.utility_for(token))
            .map(str::to_string)
            .collect();

        trace!(file = %file, usages = usages.len(), "Extracted utilities");

        let mut accumulator = self.usages.lock();
        if usages.is_empty() {
            accumulator.remove(file);
        } else {
            accumulator.insert(file.clone(), usages.clone());
        }

        Ok(ParseResult {
            file: file.clone(),
            usages,
        })
    }

    async fn render(&self) -> String {
        let used = self.accumulated();
        self.render_used(&used)
    }
}

/// Escape a class name for use in a selector.
pub fn escape_class(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (idx, ch) in name.chars().enumerate() {
        if idx == 0 && ch.is_ascii_digit() {
            let _ = write!(out, "\\3{} ", ch);
        } else if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}

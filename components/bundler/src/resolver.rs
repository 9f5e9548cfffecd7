//! Module resolution contract.

use core_types::{EcoError, ErrorKind};
use std::collections::HashMap;

/// Result of canonicalising a raw import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Stable identity used as the bundler cache key and the runtime
    /// `require` argument
    pub canonical_name: String,
    /// Directory relative imports inside the module resolve against
    pub new_current_dir: String,
}

/// Host contract for locating and loading modules.
///
/// The bundler is resolver-agnostic: the CLI supplies a filesystem
/// implementation, tests an in-memory one. Both methods may fail; blocking
/// implementations are fine since every bundler step between resolver calls
/// completes atomically.
pub trait ModuleResolver {
    /// Map a current directory and a raw specifier to a canonical module
    /// name plus the directory for the module's own imports.
    fn resolve_filename(
        &mut self,
        current_dir: &str,
        name: &str,
    ) -> Result<ResolvedModule, EcoError>;

    /// Load the source text of a canonicalised module.
    fn resolve_import(&mut self, canonical_name: &str) -> Result<String, EcoError>;
}

/// In-memory resolver keyed by canonical name.
///
/// Specifiers resolve by stripping a leading `./` and appending the `.eco`
/// extension when missing; directories are ignored.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    modules: HashMap<String, String>,
}

impl MemoryResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under its canonical name.
    pub fn add(&mut self, canonical_name: &str, source: &str) {
        self.modules
            .insert(canonical_name.to_string(), source.to_string());
    }
}

impl ModuleResolver for MemoryResolver {
    fn resolve_filename(
        &mut self,
        _current_dir: &str,
        name: &str,
    ) -> Result<ResolvedModule, EcoError> {
        let stripped = name.strip_prefix("./").unwrap_or(name);
        let canonical_name = if stripped.ends_with(".eco") {
            stripped.to_string()
        } else {
            format!("{}.eco", stripped)
        };
        Ok(ResolvedModule {
            canonical_name,
            new_current_dir: String::new(),
        })
    }

    fn resolve_import(&mut self, canonical_name: &str) -> Result<String, EcoError> {
        self.modules.get(canonical_name).cloned().ok_or_else(|| {
            EcoError::new(
                ErrorKind::ModuleError,
                format!("module '{}' not found", canonical_name),
            )
        })
    }
}

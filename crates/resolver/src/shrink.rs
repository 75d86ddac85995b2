//! Code and resource shrinking policy

use crate::variant::Variant;
use serde::Serialize;
use std::path::{Path, PathBuf};
use varsign_core::config::ShrinkConfig;
use varsign_core::error::{Error, Result};

/// Minification settings for one variant
///
/// `shrink_resources` is only ever true together with `minify_enabled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShrinkPolicy {
    minify_enabled: bool,
    shrink_resources: bool,
    rules_files: Vec<PathBuf>,
}

impl ShrinkPolicy {
    /// No minification, no resource shrinking, no rules
    pub fn disabled() -> Self {
        Self {
            minify_enabled: false,
            shrink_resources: false,
            rules_files: Vec::new(),
        }
    }

    /// Build a policy, rejecting resource shrinking without minification
    pub fn new(minify_enabled: bool, shrink_resources: bool, rules_files: Vec<PathBuf>) -> Result<Self> {
        if shrink_resources && !minify_enabled {
            return Err(Error::config(
                "shrinkResources requires minifyEnabled",
            ));
        }
        Ok(Self {
            minify_enabled,
            shrink_resources,
            rules_files,
        })
    }

    /// Code minification and obfuscation
    pub fn minify_enabled(&self) -> bool {
        self.minify_enabled
    }

    /// Unused resource removal
    pub fn shrink_resources(&self) -> bool {
        self.shrink_resources
    }

    /// Rules files in the order the shrinker applies them
    pub fn rules_files(&self) -> &[PathBuf] {
        &self.rules_files
    }
}

/// Declared shrinker rules
///
/// The default rules come with the build toolchain and are kept by name.
/// Project rules are resolved against the module directory and must exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesFiles {
    /// Toolchain-provided optimize rules, applied first
    pub default_rules: PathBuf,
    /// Project rules, in declaration order
    pub project_rules: Vec<PathBuf>,
}

impl RulesFiles {
    /// Resolve project rules against `module_dir`
    pub fn from_config(config: &ShrinkConfig, module_dir: &Path) -> Self {
        Self {
            default_rules: config.default_rules.clone(),
            project_rules: config
                .project_rules
                .iter()
                .map(|p| module_dir.join(p))
                .collect(),
        }
    }

    /// All rules files, default rules first
    pub fn ordered(&self) -> Vec<PathBuf> {
        std::iter::once(self.default_rules.clone())
            .chain(self.project_rules.iter().cloned())
            .collect()
    }

    /// Project rules files that do not exist
    pub fn missing(&self) -> Vec<PathBuf> {
        self.project_rules
            .iter()
            .filter(|p| !p.is_file())
            .cloned()
            .collect()
    }
}

/// Shrink policy for `variant`
///
/// Release enables minification and resource shrinking and requires every
/// project rules file to exist.
pub fn resolve_shrinking(variant: Variant, rules: &RulesFiles) -> Result<ShrinkPolicy> {
    match variant {
        Variant::Debug => Ok(ShrinkPolicy::disabled()),
        Variant::Release => {
            if let Some(missing) = rules.missing().first() {
                return Err(Error::rules_file_not_found(missing)
                    .with_context(format!("Resolving shrink policy for {}", variant)));
            }
            ShrinkPolicy::new(true, true, rules.ordered())
        }
    }
}

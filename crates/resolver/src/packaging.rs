//! Packaging resource exclusions
//!
//! Patterns use Gradle's notation: paths rooted at `/`, `*` within a
//! segment, `**` across segments, and `{a,b}` alternatives.

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use varsign_core::error::{Error, Result};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Expanded and compiled exclusion patterns
#[derive(Debug, Clone, Serialize)]
pub struct PackagingRules {
    excludes: Vec<String>,
    #[serde(skip)]
    compiled: Vec<Pattern>,
}

impl PackagingRules {
    /// Expand brace groups and compile every pattern
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut excludes = Vec::new();
        for pattern in patterns {
            for expanded in expand_braces(pattern.as_ref())? {
                if !excludes.contains(&expanded) {
                    excludes.push(expanded);
                }
            }
        }

        let compiled = excludes
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    Error::invalid_value("packaging.resource_excludes", format!("{}: {}", p, e))
                        .with_source(e)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { excludes, compiled })
    }

    /// Expanded patterns in declaration order
    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    /// Whether a resource path inside the artifact is excluded
    pub fn is_excluded(&self, path: &str) -> bool {
        let rooted = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        self.compiled
            .iter()
            .any(|p| p.matches_with(&rooted, MATCH_OPTIONS))
    }
}

/// Expand `{a,b}` groups, including nested ones
pub fn expand_braces(pattern: &str) -> Result<Vec<String>> {
    let unbalanced = || {
        Error::invalid_value(
            "packaging.resource_excludes",
            format!("unbalanced braces in {}", pattern),
        )
    };

    let Some(open) = pattern.find('{') else {
        if pattern.contains('}') {
            return Err(unbalanced());
        }
        return Ok(vec![pattern.to_string()]);
    };
    if pattern[..open].contains('}') {
        return Err(unbalanced());
    }

    let mut depth = 0usize;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(open + i),
            _ => {}
        }
    }
    let close = close.ok_or_else(unbalanced)?;

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    let mut expanded = Vec::new();
    for window in bounds.windows(2) {
        let alternative = &pattern[window[0] + 1..window[1]];
        let candidate = format!("{}{}{}", prefix, alternative, suffix);
        expanded.extend(expand_braces(&candidate)?);
    }

    Ok(expanded)
}

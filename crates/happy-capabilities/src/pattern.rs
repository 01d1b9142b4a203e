//! Resource patterns: the `scheme://path` strings a capability token grants
//! permissions over, with glob-style wildcard matching.

use globset::Glob;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CapabilityError, CapabilityResult};

/// A resource identifier in `scheme://path` form, e.g.
/// `mcp://filesystem:read_file` or `file:///home/user/project/src/main.rs`.
///
/// Used to decompose a resource string for inspection; matching itself is
/// done by [`ResourcePattern`], which keeps the original pattern string
/// rather than round-tripping through this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUri {
    scheme: String,
    path: String,
}

impl ResourceUri {
    /// Parses `scheme://path` into its two components.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidPattern`] if `resource` has no
    /// `://` separator.
    pub fn parse(resource: &str) -> CapabilityResult<Self> {
        let (scheme, path) = resource
            .split_once("://")
            .ok_or_else(|| CapabilityError::InvalidPattern(resource.to_string()))?;
        Ok(Self { scheme: scheme.to_string(), path: path.to_string() })
    }

    /// The scheme component (`"mcp"`, `"file"`, ...).
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The path component, everything after `://`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.path)
    }
}

/// A glob pattern over resource strings, e.g. `mcp://filesystem:*` or
/// `file:///workspace/**`.
///
/// Wraps a compiled [`globset::GlobMatcher`] alongside the original pattern
/// string, so [`ResourcePattern::as_str`] and `Display`/serialization round
/// trip exactly what the caller passed in rather than a normalized form.
#[derive(Debug, Clone)]
pub struct ResourcePattern {
    pattern: String,
    matcher: globset::GlobMatcher,
}

impl ResourcePattern {
    /// Compiles a glob pattern over resource strings.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidPattern`] if `pattern` is not a
    /// valid glob.
    pub fn new(pattern: impl Into<String>) -> CapabilityResult<Self> {
        let pattern = pattern.into();
        let glob = Glob::new(&pattern)
            .map_err(|e| CapabilityError::InvalidPattern(e.to_string()))?;
        Ok(Self { matcher: glob.compile_matcher(), pattern })
    }

    /// Builds a pattern that matches exactly one resource string (no
    /// wildcards interpreted, even if `resource` contains glob metacharacters
    /// it did not intend as wildcards — matching is still glob-based, so
    /// callers with a literal path containing `*`/`?`/`[` should prefer
    /// comparing the string directly instead of going through `grants`).
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidPattern`] if `resource` is not a
    /// valid glob.
    pub fn exact(resource: impl Into<String>) -> CapabilityResult<Self> {
        Self::new(resource)
    }

    /// Returns the original pattern string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Returns whether `resource` matches this pattern.
    #[must_use]
    pub fn matches(&self, resource: &str) -> bool {
        self.matcher.is_match(resource)
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl PartialEq for ResourcePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for ResourcePattern {}

impl Serialize for ResourcePattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.pattern)
    }
}

impl<'de> Deserialize<'de> for ResourcePattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let pattern = String::deserialize(deserializer)?;
        Self::new(pattern).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pattern_matches_only_itself() {
        let pattern = ResourcePattern::exact("mcp://test:tool").unwrap();
        assert!(pattern.matches("mcp://test:tool"));
        assert!(!pattern.matches("mcp://test:other"));
    }

    #[test]
    fn wildcard_pattern_matches_suffix_variants() {
        let pattern = ResourcePattern::new("mcp://filesystem:*").unwrap();
        assert!(pattern.matches("mcp://filesystem:read_file"));
        assert!(pattern.matches("mcp://filesystem:write_file"));
        assert!(!pattern.matches("mcp://memory:read"));
    }

    #[test]
    fn invalid_glob_syntax_is_rejected() {
        assert!(ResourcePattern::new("mcp://[unterminated").is_err());
    }

    #[test]
    fn resource_uri_splits_scheme_and_path() {
        let uri = ResourceUri::parse("mcp://filesystem:read_file").unwrap();
        assert_eq!(uri.scheme(), "mcp");
        assert_eq!(uri.path(), "filesystem:read_file");
    }

    #[test]
    fn resource_uri_requires_scheme_separator() {
        assert!(ResourceUri::parse("not-a-uri").is_err());
    }

    #[test]
    fn patterns_round_trip_through_json() {
        let pattern = ResourcePattern::new("file:///workspace/**").unwrap();
        let json = serde_json::to_string(&pattern).unwrap();
        let back: ResourcePattern = serde_json::from_str(&json).unwrap();
        assert_eq!(pattern, back);
    }
}

//! Node paths for addressing within configuration trees
//!
//! Provides [`NodePath`], the dotted path used to name the offending node in
//! every validation, planning and deployment error.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path from the root of a configuration tree to one of its nodes
///
/// # Examples
/// - `root` → the root module
/// - `root.domains.1000.modules.0` → first member of the aggregation routed for domain 1000
/// - `@default.modules.1` → second member of the library entry `default`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath(Vec<String>);

impl NodePath {
    /// Name of the root segment
    pub const ROOT: &'static str = "root";

    /// Path of a root configuration
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(vec![Self::ROOT.to_string()])
    }

    /// Path of a named library entry
    #[inline]
    #[must_use]
    pub fn definition(name: &str) -> Self {
        Self(vec![format!("@{name}")])
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Path of the i-th member of an aggregation at this path
    #[inline]
    #[must_use]
    pub fn member(&self, index: usize) -> Self {
        self.child("modules").child(index.to_string())
    }

    /// Path of the route for `key` of a routing module at this path
    #[inline]
    #[must_use]
    pub fn route(&self, key: impl Display) -> Self {
        self.child("domains").child(key.to_string())
    }
}

impl Default for NodePath {
    fn default() -> Self {
        Self::root()
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for NodePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let segments: Vec<String> = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment)
                } else if seg
                    .contains(|c: char| !c.is_alphanumeric() && !matches!(c, '_' | '-' | '@'))
                {
                    Err(PathError::InvalidSegment(seg.to_string()))
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl serde::Serialize for NodePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for NodePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing a node path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty input
    #[error("empty path")]
    Empty,

    /// Empty segment (e.g., "a..b")
    #[error("empty path segment")]
    EmptySegment,

    /// Invalid characters in segment
    #[error("invalid path segment: '{0}'")]
    InvalidSegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_paths_render_dotted() {
        let path = NodePath::root().route(1000).member(2);
        assert_eq!(path.to_string(), "root.domains.1000.modules.2");
    }

    #[test]
    fn definition_paths() {
        let path = NodePath::definition("shared").member(0);
        assert_eq!(path.to_string(), "@shared.modules.0");
    }

    #[test]
    fn parsed_paths_match_built_ones() {
        let path: NodePath = "root.domains.test2".parse().unwrap();
        assert_eq!(path, NodePath::root().route("test2"));
        let json = serde_json::to_string(&NodePath::definition("council").member(1)).unwrap();
        assert_eq!(json, r#""@council.modules.1""#);
        assert_eq!(
            serde_json::from_str::<NodePath>(&json).unwrap(),
            NodePath::definition("council").member(1)
        );
    }

    #[test]
    fn parse_rejects_bad_segments() {
        assert_eq!("".parse::<NodePath>(), Err(PathError::Empty));
        assert_eq!("a..b".parse::<NodePath>(), Err(PathError::EmptySegment));
        assert!(matches!(
            "a.b c".parse::<NodePath>(),
            Err(PathError::InvalidSegment(_))
        ));
    }
}

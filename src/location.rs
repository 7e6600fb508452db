//! Parsed item locations.
//! -----------------------
//! A location is a `/`-joined path of item names whose first segment is the
//! workspace name, e.g. `acme/reports/2024`. The joined string form is what
//! travels on the wire and keys the item index; this type validates it on
//! ingress and gives the handlers structured access to workspace, parent and
//! leaf name.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::{codes, AppError};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location {
    segments: Vec<String>,
}

impl Location {
    /// Parse and validate a `/`-joined location. Rejects empty input, empty
    /// segments (leading/trailing/double slashes), path-walking names and
    /// names that would collide with internal dot-files.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw.is_empty() {
            return Err(AppError::user(codes::INVALID_LOCATION));
        }
        let mut segments = Vec::new();
        for seg in raw.split('/') {
            if !valid_segment(seg) {
                return Err(AppError::user(codes::INVALID_LOCATION));
            }
            segments.push(seg.to_string());
        }
        Ok(Self { segments })
    }

    /// A location made of a workspace name alone (the workspace root).
    pub fn workspace_root(workspace: &str) -> Result<Self, AppError> {
        if !valid_segment(workspace) {
            return Err(AppError::user(codes::INVALID_WORKSPACE));
        }
        Ok(Self { segments: vec![workspace.to_string()] })
    }

    pub fn workspace(&self) -> &str {
        &self.segments[0]
    }

    /// True when the location names the workspace root itself.
    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }

    /// Leaf item name.
    pub fn name(&self) -> &str {
        self.segments.last().expect("location has at least one segment")
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn parent(&self) -> Option<Location> {
        if self.is_root() {
            return None;
        }
        Some(Self { segments: self.segments[..self.segments.len() - 1].to_vec() })
    }

    /// Location of a child item under this one.
    pub fn child(&self, name: &str) -> Result<Location, AppError> {
        if !valid_segment(name) {
            return Err(AppError::user(codes::INVALID_DATA));
        }
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(Self { segments })
    }

    pub fn joined(&self) -> String {
        self.segments.join("/")
    }
}

fn valid_segment(seg: &str) -> bool {
    !seg.is_empty() && !seg.starts_with('.') && !seg.contains('\\') && !seg.contains(char::is_control)
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.joined())
    }
}

impl FromStr for Location {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Location::parse(s)
    }
}

impl TryFrom<String> for Location {
    type Error = AppError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Location::parse(&value)
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.joined()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_locations() {
        let loc = Location::parse("acme/reports/2024").unwrap();
        assert_eq!(loc.workspace(), "acme");
        assert_eq!(loc.name(), "2024");
        assert_eq!(loc.depth(), 3);
        assert!(!loc.is_root());
        assert_eq!(loc.parent().unwrap().joined(), "acme/reports");
    }

    #[test]
    fn root_location_has_no_parent() {
        let loc = Location::parse("acme").unwrap();
        assert!(loc.is_root());
        assert_eq!(loc.workspace(), "acme");
        assert!(loc.parent().is_none());
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "/", "acme/", "/acme", "a//b", "acme/.hidden", "..", "a/..", "a\\b"] {
            assert!(Location::parse(bad).is_err(), "expected {bad:?} to be rejected");
        }
    }

    #[test]
    fn child_appends_segment() {
        let loc = Location::parse("acme/a").unwrap();
        assert_eq!(loc.child("b").unwrap().joined(), "acme/a/b");
        assert!(loc.child("").is_err());
        assert!(loc.child("x/y").is_err());
    }

    #[test]
    fn serde_round_trips_through_string_form() {
        let loc = Location::parse("acme/a/b").unwrap();
        let json = serde_json::to_string(&loc).unwrap();
        assert_eq!(json, "\"acme/a/b\"");
        let back: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loc);
        assert!(serde_json::from_str::<Location>("\"a//b\"").is_err());
    }
}

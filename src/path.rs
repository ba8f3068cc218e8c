//! Materialized path value object.
//!
//! Encodes hierarchical position and sibling order as a non-empty sequence
//! of integers in `[MIN_SEGMENT, MAX_SEGMENT]`. The canonical text form is
//! dash-joined, zero-padded to three digits, and sorts lexicographically in
//! depth-first pre-order.

use std::fmt;

use crate::error::{Error, Result};

pub const MIN_SEGMENT: u16 = 1;
pub const MAX_SEGMENT: u16 = 999;

/// A hierarchical position: `001-100-050` style path.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct MaterializedPath(Vec<u16>);

impl MaterializedPath {
    /// Build a path from segments, rejecting empty lists or out-of-range values.
    pub fn new(segments: Vec<u16>) -> Result<Self> {
        if segments.is_empty() {
            return Err(Error::InvalidPath(
                String::new(),
                "path must have at least one segment".into(),
            ));
        }
        for &s in &segments {
            if !(MIN_SEGMENT..=MAX_SEGMENT).contains(&s) {
                return Err(Error::InvalidPath(
                    segments_to_string(&segments),
                    format!(
                        "segment {s} out of range [{MIN_SEGMENT}, {MAX_SEGMENT}]"
                    ),
                ));
            }
        }
        Ok(MaterializedPath(segments))
    }

    /// Parse `"001-100-050"` into segments.
    pub fn from_string(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidPath(
                s.into(),
                "path string cannot be empty".into(),
            ));
        }
        let mut segments = Vec::new();
        for part in s.split('-') {
            let n: u16 = part
                .parse()
                .map_err(|_| Error::InvalidPath(s.into(), format!("{part:?} is not a number")))?;
            segments.push(n);
        }
        Self::new(segments)
    }

    /// Canonical text form, e.g. `"001-100-050"`.
    pub fn as_string(&self) -> String {
        segments_to_string(&self.0)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn segments(&self) -> &[u16] {
        &self.0
    }

    /// Parent path, or `None` at depth 1.
    pub fn parent(&self) -> Option<MaterializedPath> {
        if self.0.len() == 1 {
            None
        } else {
            Some(MaterializedPath(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Child path at the given sibling position.
    pub fn child(&self, position: u16) -> Result<MaterializedPath> {
        let mut segments = self.0.clone();
        segments.push(position);
        Self::new(segments)
    }

    /// True iff `other` is a strict descendant of `self` (begins with
    /// `self`'s segments followed by at least one more segment).
    pub fn is_ancestor_of(&self, other: &MaterializedPath) -> bool {
        other.0.len() > self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// True iff `self` equals `other` or is an ancestor of it.
    pub fn is_ancestor_of_or_eq(&self, other: &MaterializedPath) -> bool {
        self == other || self.is_ancestor_of(other)
    }

    /// Replace the leading `old`-length prefix of `self` with `new`'s
    /// segments. Fails if `self` does not begin with `old`.
    pub fn replace_prefix(
        &self,
        old: &MaterializedPath,
        new: &MaterializedPath,
    ) -> Result<MaterializedPath> {
        if self.0.len() < old.0.len() || self.0[..old.0.len()] != old.0[..] {
            return Err(Error::InvalidPath(
                self.as_string(),
                format!("does not begin with prefix {}", old.as_string()),
            ));
        }
        let mut segments = new.0.clone();
        segments.extend_from_slice(&self.0[old.0.len()..]);
        MaterializedPath::new(segments)
    }
}

fn segments_to_string(segments: &[u16]) -> String {
    segments
        .iter()
        .map(|s| format!("{s:03}"))
        .collect::<Vec<_>>()
        .join("-")
}

impl fmt::Display for MaterializedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

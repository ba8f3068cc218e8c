//! Outline node entity.

use std::collections::BTreeSet;

use lazy_regex::regex_is_match;

use crate::{id::OpaqueId, path::MaterializedPath};

/// Document types every node is required to carry.
pub const REQUIRED_DOCTYPES: [&str; 2] = ["draft", "notes"];

/// One outline entry: the unit of identity in the outline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub id: OpaqueId,
    pub path: MaterializedPath,
    pub title: String,
    pub slug: String,
    pub doctypes: BTreeSet<String>,
}

impl Node {
    pub fn new(
        id: OpaqueId,
        path: MaterializedPath,
        title: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Node {
            id,
            path,
            title: title.into(),
            slug: slug.into(),
            doctypes: REQUIRED_DOCTYPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn has_required_doctypes(&self) -> bool {
        REQUIRED_DOCTYPES.iter().all(|d| self.doctypes.contains(*d))
    }
}

pub fn is_reserved_doctype(doctype: &str) -> bool {
    REQUIRED_DOCTYPES.contains(&doctype)
}

/// `[A-Za-z0-9-]+`, non-empty and free of underscores (which would make the
/// filename's four-field split ambiguous).
pub fn is_valid_doctype(doctype: &str) -> bool {
    regex_is_match!(r"^[A-Za-z0-9-]+$", doctype)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_has_required_doctypes() {
        let node = Node::new(
            OpaqueId::new("a1").unwrap(),
            MaterializedPath::from_string("100").unwrap(),
            "Title",
            "title",
        );
        assert!(node.has_required_doctypes());
        assert!(node.doctypes.contains("draft"));
        assert!(node.doctypes.contains("notes"));
    }

    #[test]
    fn reserved_doctypes() {
        assert!(is_reserved_doctype("draft"));
        assert!(is_reserved_doctype("notes"));
        assert!(!is_reserved_doctype("characters"));
    }

    #[test]
    fn doctype_validity() {
        assert!(is_valid_doctype("characters"));
        assert!(is_valid_doctype("side-plot"));
        assert!(!is_valid_doctype(""));
        assert!(!is_valid_doctype("bad_name"));
        assert!(!is_valid_doctype("bad name"));
    }
}

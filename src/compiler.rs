//! Depth-first doctype compiler.
//!
//! Concatenates one doctype's stripped bodies across a subtree, in path
//! order, joined by a caller-supplied separator. Empty bodies contribute
//! nothing, so the output never has stray leading/trailing separators.

use std::path::Path;

use crate::{codec, error::{Error, Result}, frontmatter, outline::Outline, path::MaterializedPath, ports::FileSystem};

/// Compile `doctype` across `outline`, optionally restricted to the subtree
/// rooted at `subtree_root`.
pub fn compile(
    fs: &dyn FileSystem,
    dir: &Path,
    outline: &Outline,
    doctype: &str,
    subtree_root: Option<&MaterializedPath>,
    separator: &str,
) -> Result<String> {
    let nodes = match subtree_root {
        Some(root) => outline.subtree(root),
        None => outline.all_sorted(),
    };

    let mut bodies = Vec::new();
    for node in &nodes {
        if !node.doctypes.contains(doctype) {
            continue;
        }
        let path = dir.join(codec::encode(&node.path, &node.id, doctype, &node.slug));
        let contents = fs.read(&path)?;
        let body = frontmatter::strip(&contents);
        if !body.is_empty() {
            bodies.push(body);
        }
    }

    if bodies.is_empty() && !nodes.iter().any(|n| n.doctypes.contains(doctype)) {
        return Err(Error::DoctypeNotFound(doctype.to_string()));
    }

    Ok(bodies.join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{id::OpaqueId, node::Node, ports::InMemoryFileSystem};
    use std::path::PathBuf;

    fn mp(s: &str) -> MaterializedPath {
        MaterializedPath::from_string(s).unwrap()
    }

    #[test]
    fn concatenates_nonempty_bodies_in_path_order() {
        let fs = InMemoryFileSystem::new();
        let mut outline = Outline::new();

        let a = Node::new(OpaqueId::new("a1").unwrap(), mp("100"), "A", "a");
        let b = Node::new(OpaqueId::new("b1").unwrap(), mp("200"), "B", "b");
        fs.seed(
            PathBuf::from("/o/100_a1_draft_a.md"),
            "---\ntitle: A\n---\nFirst.\n",
        );
        fs.seed(
            PathBuf::from("/o/200_b1_draft_b.md"),
            "---\ntitle: B\n---\nSecond.\n",
        );
        outline.insert(a);
        outline.insert(b);

        let result = compile(&fs, Path::new("/o"), &outline, "draft", None, "\n---\n").unwrap();
        assert_eq!(result, "First.\n\n---\nSecond.\n");
    }

    #[test]
    fn empty_bodies_contribute_no_stray_separators() {
        let fs = InMemoryFileSystem::new();
        let mut outline = Outline::new();
        let a = Node::new(OpaqueId::new("a1").unwrap(), mp("100"), "A", "a");
        let b = Node::new(OpaqueId::new("b1").unwrap(), mp("200"), "B", "b");
        fs.seed(PathBuf::from("/o/100_a1_draft_a.md"), "");
        fs.seed(
            PathBuf::from("/o/200_b1_draft_b.md"),
            "---\ntitle: B\n---\nSecond.\n",
        );
        outline.insert(a);
        outline.insert(b);

        let result = compile(&fs, Path::new("/o"), &outline, "draft", None, "\n").unwrap();
        assert_eq!(result, "Second.\n");
    }

    #[test]
    fn fails_when_doctype_absent_everywhere_in_subtree() {
        let fs = InMemoryFileSystem::new();
        let mut outline = Outline::new();
        let a = Node::new(OpaqueId::new("a1").unwrap(), mp("100"), "A", "a");
        outline.insert(a);

        let result = compile(&fs, Path::new("/o"), &outline, "characters", None, "\n");
        assert!(matches!(result, Err(Error::DoctypeNotFound(_))));
    }
}

//! In-memory outline aggregate.
//!
//! Owns every [`Node`] by id, and computes the sibling-position and cascade
//! arithmetic that the rest of the engine needs. The path index used by
//! lookups and tree-order iteration is always derived fresh from the id map
//! (see [`Outline::path_index`]) rather than kept as a second mutable
//! field, so it can never drift out of sync with the nodes it indexes.

use std::collections::{BTreeMap, HashMap};

use crate::{
    error::{Error, Result},
    id::OpaqueId,
    node::Node,
    path::MaterializedPath,
    ports::Slugifier,
};

/// Where a new sibling should be inserted relative to an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertPolicy {
    /// Append as the last child of a parent (or last root).
    Append,
    /// Insert immediately before the given sibling.
    Before,
    /// Insert immediately after the given sibling.
    After,
}

/// How a delete should treat a node's descendants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteMode {
    /// Fail if the node has any descendants.
    Leaf,
    /// Delete the node and every descendant.
    Recursive,
    /// Delete the node, re-parenting direct children to its former parent.
    Promote,
}

/// A path reassignment affecting one node, produced by move/compact.
#[derive(Clone, Debug)]
pub struct Reassignment {
    pub id: OpaqueId,
    pub old_path: MaterializedPath,
    pub new_path: MaterializedPath,
}

/// The result of planning a move: every affected node's old and new path,
/// in depth-first order starting with the moved node itself.
pub struct MoveEffect {
    pub reassignments: Vec<Reassignment>,
}

/// The result of planning a rename: unchanged id/path/doctypes, new
/// title/slug.
pub struct RenameEffect {
    pub id: OpaqueId,
    pub old_slug: String,
    pub new_slug: String,
    pub new_title: String,
}

/// The result of planning a delete.
pub struct DeleteEffect {
    /// ids removed outright, in depth-first order.
    pub deleted: Vec<OpaqueId>,
    /// children re-parented by a promote delete.
    pub promoted: Vec<Reassignment>,
}

/// The result of planning a compaction: every sibling reassigned to its new
/// evenly-spaced position, with cascaded descendant reassignments.
pub struct CompactEffect {
    pub reassignments: Vec<Reassignment>,
}

#[derive(Default)]
pub struct Outline {
    nodes: HashMap<String, Node>,
    next_counter: u64,
}

impl Outline {
    pub fn new() -> Self {
        Outline::default()
    }

    pub fn from_nodes(nodes: Vec<Node>, next_counter: u64) -> Self {
        let nodes = nodes.into_iter().map(|n| (n.id.as_str().to_string(), n)).collect();
        Outline { nodes, next_counter }
    }

    pub fn next_counter(&self) -> u64 {
        self.next_counter
    }

    pub fn bump_counter(&mut self) -> u64 {
        let c = self.next_counter;
        self.next_counter += 1;
        c
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn require(&self, id: &str) -> Result<&Node> {
        self.get(id)
            .ok_or_else(|| Error::UnknownId(id.to_string()))
    }

    pub fn insert(&mut self, node: Node) {
        self.nodes.insert(node.id.as_str().to_string(), node);
    }

    pub fn remove(&mut self, id: &str) -> Option<Node> {
        self.nodes.remove(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Derived path → id index, always rebuilt from the node map.
    pub fn path_index(&self) -> BTreeMap<String, String> {
        self.nodes
            .values()
            .map(|n| (n.path.as_string(), n.id.as_str().to_string()))
            .collect()
    }

    /// All nodes in depth-first pre-order (= lexicographic order of the
    /// padded path string).
    pub fn all_sorted(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by(|a, b| a.path.as_string().cmp(&b.path.as_string()));
        nodes
    }

    pub fn get_by_path(&self, path: &MaterializedPath) -> Option<&Node> {
        self.nodes.values().find(|n| &n.path == path)
    }

    /// Direct children of `prefix` (or root nodes, when `prefix` is `None`),
    /// sorted by path.
    pub fn siblings(&self, prefix: Option<&MaterializedPath>) -> Vec<&Node> {
        let mut siblings: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| match prefix {
                Some(p) => n.path.parent().as_ref() == Some(p),
                None => n.path.depth() == 1,
            })
            .collect();
        siblings.sort_by(|a, b| a.path.as_string().cmp(&b.path.as_string()));
        siblings
    }

    /// Every node in `self` whose path is `root` or a descendant of it, in
    /// depth-first order.
    pub fn subtree(&self, root: &MaterializedPath) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| root.is_ancestor_of_or_eq(&n.path))
            .collect();
        nodes.sort_by(|a, b| a.path.as_string().cmp(&b.path.as_string()));
        nodes
    }

    // ---- sibling-position arithmetic (§4.3) ----

    /// Choose a position for a new last sibling under `prefix`.
    pub fn append_position(&self, prefix: Option<&MaterializedPath>) -> Result<u16> {
        let siblings = self.siblings(prefix);
        let positions: Vec<u16> = siblings
            .iter()
            .map(|n| *n.path.segments().last().unwrap())
            .collect();
        match positions.iter().max() {
            None => Ok(100),
            Some(&max) => {
                let step = tier_step_for_count(positions.len());
                let candidate = max as u32 + step as u32;
                if candidate > u16::MAX as u32 || candidate > 999 {
                    return Err(Error::Exhausted {
                        a: max.to_string(),
                        b: "end".to_string(),
                    });
                }
                Ok(candidate as u16)
            }
        }
    }

    /// Choose a position strictly between `a` and `b` (`a < b`).
    pub fn between_position(&self, a: u16, b: u16) -> Result<u16> {
        if b <= a {
            return Err(Error::InvalidPath(
                format!("{a}-{b}"),
                "between() requires a < b".into(),
            ));
        }
        if b - a < 2 {
            return Err(Error::Exhausted {
                a: a.to_string(),
                b: b.to_string(),
            });
        }
        Ok(a + (b - a) / 2)
    }

    /// Choose a position before the first sibling at `first`.
    pub fn before_first_position(&self, first: u16) -> Result<u16> {
        if first <= 1 {
            return Err(Error::Exhausted {
                a: "start".to_string(),
                b: first.to_string(),
            });
        }
        Ok(first / 2)
    }

    /// Resolve a new sibling position under `prefix`, given an insertion
    /// policy relative to `anchor` (ignored for `Append`).
    pub fn resolve_new_position(
        &self,
        prefix: Option<&MaterializedPath>,
        policy: InsertPolicy,
        anchor: Option<&MaterializedPath>,
    ) -> Result<u16> {
        match policy {
            InsertPolicy::Append => self.append_position(prefix),
            InsertPolicy::Before => {
                let anchor = anchor.ok_or_else(|| {
                    Error::InvalidPath(String::new(), "Before requires an anchor".into())
                })?;
                let anchor_pos = *anchor.segments().last().unwrap();
                let siblings = self.siblings(prefix);
                let idx = siblings
                    .iter()
                    .position(|n| &n.path == anchor)
                    .ok_or_else(|| Error::InvalidPath(anchor.as_string(), "not a sibling".into()))?;
                match idx {
                    0 => self.before_first_position(anchor_pos),
                    _ => {
                        let prev_pos = *siblings[idx - 1].path.segments().last().unwrap();
                        self.between_position(prev_pos, anchor_pos)
                    }
                }
            }
            InsertPolicy::After => {
                let anchor = anchor.ok_or_else(|| {
                    Error::InvalidPath(String::new(), "After requires an anchor".into())
                })?;
                let anchor_pos = *anchor.segments().last().unwrap();
                let siblings = self.siblings(prefix);
                let idx = siblings
                    .iter()
                    .position(|n| &n.path == anchor)
                    .ok_or_else(|| Error::InvalidPath(anchor.as_string(), "not a sibling".into()))?;
                match siblings.get(idx + 1) {
                    None => self.append_position(prefix),
                    Some(next) => {
                        let next_pos = *next.path.segments().last().unwrap();
                        self.between_position(anchor_pos, next_pos)
                    }
                }
            }
        }
    }

    // ---- move with cascade (§4.4) ----

    pub fn plan_move(&self, id: &str, new_path: &MaterializedPath) -> Result<MoveEffect> {
        let node = self.require(id)?;
        let old_path = node.path.clone();

        if new_path == &old_path {
            return Err(Error::InvalidPath(
                new_path.as_string(),
                "move target equals current path".into(),
            ));
        }
        if self.get_by_path(new_path).is_some() {
            return Err(Error::DuplicatePath(new_path.as_string()));
        }
        if old_path.is_ancestor_of(new_path) {
            return Err(Error::CycleDetected { id: id.to_string() });
        }

        let mut reassignments = Vec::new();
        for descendant in self.subtree(&old_path) {
            let new_descendant_path = descendant.path.replace_prefix(&old_path, new_path)?;
            reassignments.push(Reassignment {
                id: descendant.id.clone(),
                old_path: descendant.path.clone(),
                new_path: new_descendant_path,
            });
        }
        Ok(MoveEffect { reassignments })
    }

    pub fn apply_move(&mut self, effect: &MoveEffect) {
        for r in &effect.reassignments {
            if let Some(node) = self.get_mut(r.id.as_str()) {
                node.path = r.new_path.clone();
            }
        }
    }

    // ---- rename (title change, §4.5) ----

    pub fn plan_rename(
        &self,
        id: &str,
        new_title: &str,
        slugifier: &dyn Slugifier,
    ) -> Result<RenameEffect> {
        if new_title.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }
        let node = self.require(id)?;
        let new_slug = slugifier.slugify(new_title);
        Ok(RenameEffect {
            id: node.id.clone(),
            old_slug: node.slug.clone(),
            new_slug,
            new_title: new_title.to_string(),
        })
    }

    pub fn apply_rename(&mut self, effect: &RenameEffect) {
        if let Some(node) = self.get_mut(effect.id.as_str()) {
            node.title = effect.new_title.clone();
            node.slug = effect.new_slug.clone();
        }
    }

    // ---- delete (§4.6) ----

    pub fn plan_delete(&self, id: &str, mode: DeleteMode) -> Result<DeleteEffect> {
        let node = self.require(id)?;
        let root = node.path.clone();
        let descendants = self.subtree(&root);
        let has_children = descendants.len() > 1;

        match mode {
            DeleteMode::Leaf => {
                if has_children {
                    return Err(Error::HasChildren(id.to_string()));
                }
                Ok(DeleteEffect {
                    deleted: vec![node.id.clone()],
                    promoted: Vec::new(),
                })
            }
            DeleteMode::Recursive => Ok(DeleteEffect {
                deleted: descendants.iter().map(|n| n.id.clone()).collect(),
                promoted: Vec::new(),
            }),
            DeleteMode::Promote => {
                let parent_prefix = root.parent();
                let direct_children: Vec<&Node> = self
                    .nodes
                    .values()
                    .filter(|n| n.path.parent().as_ref() == Some(&root))
                    .collect();

                // Simulate promotion: the direct children move to the
                // parent level, taking the next free sibling positions
                // among the pre-existing siblings there (the node being
                // deleted does not count as an occupant once it's gone).
                let mut occupied: Vec<u16> = self
                    .siblings(parent_prefix.as_ref())
                    .into_iter()
                    .filter(|n| n.id != node.id)
                    .map(|n| *n.path.segments().last().unwrap())
                    .collect();

                let mut ordered_children = direct_children;
                ordered_children.sort_by(|a, b| a.path.as_string().cmp(&b.path.as_string()));

                let mut promoted = Vec::new();
                for child in ordered_children {
                    let new_child_pos = {
                        let max = occupied.iter().max().copied();
                        match max {
                            None => 100,
                            Some(max) => {
                                let step = tier_step_for_count(occupied.len());
                                let candidate = max as u32 + step as u32;
                                if candidate > 999 {
                                    return Err(Error::Exhausted {
                                        a: max.to_string(),
                                        b: "end".to_string(),
                                    });
                                }
                                candidate as u16
                            }
                        }
                    };
                    occupied.push(new_child_pos);

                    let new_child_root = match &parent_prefix {
                        Some(p) => p.child(new_child_pos)?,
                        None => MaterializedPath::new(vec![new_child_pos])?,
                    };

                    for descendant in self.subtree(&child.path) {
                        let new_path =
                            descendant.path.replace_prefix(&child.path, &new_child_root)?;
                        promoted.push(Reassignment {
                            id: descendant.id.clone(),
                            old_path: descendant.path.clone(),
                            new_path,
                        });
                    }
                }

                Ok(DeleteEffect {
                    deleted: vec![node.id.clone()],
                    promoted,
                })
            }
        }
    }

    pub fn apply_delete(&mut self, effect: &DeleteEffect) {
        for r in &effect.promoted {
            if let Some(node) = self.get_mut(r.id.as_str()) {
                node.path = r.new_path.clone();
            }
        }
        for id in &effect.deleted {
            self.remove(id.as_str());
        }
    }

    // ---- compaction (§4.7) ----

    pub fn plan_compact(&self, prefix: Option<&MaterializedPath>) -> CompactEffect {
        let siblings = self.siblings(prefix);
        let n = siblings.len();
        let step = tier_step_for_even_spacing(n);

        let mut reassignments = Vec::new();
        for (i, sibling) in siblings.iter().enumerate() {
            let new_pos = step * (i as u16 + 1);
            let new_root = match prefix {
                Some(p) => p.child(new_pos).expect("compact position always valid"),
                None => MaterializedPath::new(vec![new_pos]).expect("compact position always valid"),
            };
            if new_root == sibling.path {
                continue;
            }
            for descendant in self.subtree(&sibling.path) {
                let new_path = descendant
                    .path
                    .replace_prefix(&sibling.path, &new_root)
                    .expect("descendant path always begins with its ancestor's path");
                reassignments.push(Reassignment {
                    id: descendant.id.clone(),
                    old_path: descendant.path.clone(),
                    new_path,
                });
            }
        }
        CompactEffect { reassignments }
    }

    pub fn apply_compact(&mut self, effect: &CompactEffect) {
        for r in &effect.reassignments {
            if let Some(node) = self.get_mut(r.id.as_str()) {
                node.path = r.new_path.clone();
            }
        }
    }
}

/// Step size used when appending the `n+1`th sibling (0-indexed count of
/// existing siblings already occupying the level).
fn tier_step_for_count(existing: usize) -> u16 {
    if existing < 9 {
        100
    } else if existing < 9 + 9 {
        10
    } else {
        1
    }
}

/// Step size used to evenly space `n` siblings across `[1, 999]`, choosing
/// the largest tier that fits.
fn tier_step_for_even_spacing(n: usize) -> u16 {
    if n == 0 {
        return 100;
    }
    for step in [100u16, 10, 1] {
        if (n as u32) * (step as u32) <= 999 {
            return step;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::AsciiSlugifier;

    fn mp(s: &str) -> MaterializedPath {
        MaterializedPath::from_string(s).unwrap()
    }

    fn node(id: &str, path: &str, title: &str) -> Node {
        Node::new(
            OpaqueId::new(id).unwrap(),
            mp(path),
            title,
            AsciiSlugifier.slugify(title),
        )
    }

    #[test]
    fn append_positions_walk_tiers() {
        let mut outline = Outline::new();
        for i in 0..9u16 {
            outline.insert(node(&format!("n{i}"), &format!("{}", (i + 1) * 100), "x"));
        }
        // 9 siblings occupy the 100-tier fully; next append should land in
        // the 10-tier.
        let next = outline.append_position(None).unwrap();
        assert_eq!(next, 910);
    }

    #[test]
    fn tier_transition_10_to_1() {
        let mut outline = Outline::new();
        for i in 0..9u16 {
            outline.insert(node(&format!("n{i}"), &format!("{}", (i + 1) * 100), "x"));
        }
        for i in 0..9u16 {
            outline.insert(node(&format!("m{i}"), &format!("{}", 910 + i * 10), "x"));
        }
        let next = outline.append_position(None).unwrap();
        assert_eq!(next, 991);
    }

    #[test]
    fn insert_between_gap_one_is_exhausted() {
        let outline = Outline::new();
        assert!(outline.between_position(100, 101).is_err());
    }

    #[test]
    fn insert_between_gap_two_succeeds() {
        let outline = Outline::new();
        assert_eq!(outline.between_position(100, 102).unwrap(), 101);
    }

    #[test]
    fn before_first_uses_half() {
        let outline = Outline::new();
        assert_eq!(outline.before_first_position(100).unwrap(), 50);
        assert!(outline.before_first_position(1).is_err());
    }

    #[test]
    fn resolve_new_position_before_without_anchor_errors_instead_of_panicking() {
        let outline = Outline::new();
        let result = outline.resolve_new_position(None, InsertPolicy::Before, None);
        assert!(matches!(result, Err(Error::InvalidPath(..))));
    }

    #[test]
    fn resolve_new_position_after_without_anchor_errors_instead_of_panicking() {
        let outline = Outline::new();
        let result = outline.resolve_new_position(None, InsertPolicy::After, None);
        assert!(matches!(result, Err(Error::InvalidPath(..))));
    }

    #[test]
    fn move_rejects_cycle() {
        let mut outline = Outline::new();
        outline.insert(node("a", "100", "A"));
        outline.insert(node("b", "100-100", "B"));
        let result = outline.plan_move("a", &mp("100-100-200"));
        assert!(matches!(result, Err(Error::CycleDetected { .. })));
    }

    #[test]
    fn move_cascades_to_descendants() {
        let mut outline = Outline::new();
        outline.insert(node("a", "100", "A"));
        outline.insert(node("b", "100-100", "B"));
        outline.insert(node("c", "100-100-100", "C"));
        let effect = outline.plan_move("b", &mp("300")).unwrap();
        outline.apply_move(&effect);
        assert_eq!(outline.require("b").unwrap().path.as_string(), "300");
        assert_eq!(outline.require("c").unwrap().path.as_string(), "300-100");
        assert_eq!(outline.require("a").unwrap().path.as_string(), "100");
    }

    #[test]
    fn move_rejects_occupied_target() {
        let mut outline = Outline::new();
        outline.insert(node("a", "100", "A"));
        outline.insert(node("b", "200", "B"));
        let result = outline.plan_move("a", &mp("200"));
        assert!(matches!(result, Err(Error::DuplicatePath(_))));
    }

    #[test]
    fn move_to_own_current_path_is_rejected_as_noop_not_duplicate() {
        let mut outline = Outline::new();
        outline.insert(node("a", "100", "A"));
        let result = outline.plan_move("a", &mp("100"));
        assert!(matches!(result, Err(Error::InvalidPath(..))));
    }

    #[test]
    fn delete_leaf_fails_with_children() {
        let mut outline = Outline::new();
        outline.insert(node("a", "100", "A"));
        outline.insert(node("b", "100-100", "B"));
        assert!(outline.plan_delete("a", DeleteMode::Leaf).is_err());
    }

    #[test]
    fn delete_recursive_removes_subtree() {
        let mut outline = Outline::new();
        outline.insert(node("a", "100", "A"));
        outline.insert(node("b", "100-100", "B"));
        outline.insert(node("c", "100-100-100", "C"));
        outline.insert(node("d", "200", "D"));
        let effect = outline.plan_delete("a", DeleteMode::Recursive).unwrap();
        outline.apply_delete(&effect);
        assert_eq!(outline.len(), 1);
        assert!(outline.get("d").is_some());
    }

    #[test]
    fn delete_promote_reparents_children() {
        let mut outline = Outline::new();
        outline.insert(node("a", "100", "A"));
        outline.insert(node("b", "100-100", "B"));
        outline.insert(node("c", "100-200", "C"));
        outline.insert(node("d", "200", "D"));
        let effect = outline.plan_delete("a", DeleteMode::Promote).unwrap();
        outline.apply_delete(&effect);
        assert!(outline.get("a").is_none());
        assert_eq!(outline.require("b").unwrap().path.depth(), 1);
        assert_eq!(outline.require("c").unwrap().path.depth(), 1);
        assert_eq!(outline.require("d").unwrap().path.as_string(), "200");
    }

    #[test]
    fn compact_is_idempotent() {
        let mut outline = Outline::new();
        outline.insert(node("a", "100", "A"));
        outline.insert(node("b", "910", "B"));
        outline.insert(node("c", "991", "C"));
        let effect1 = outline.plan_compact(None);
        outline.apply_compact(&effect1);
        let after_first: Vec<String> = outline.all_sorted().iter().map(|n| n.path.as_string()).collect();

        let effect2 = outline.plan_compact(None);
        assert!(effect2.reassignments.is_empty());
        outline.apply_compact(&effect2);
        let after_second: Vec<String> = outline.all_sorted().iter().map(|n| n.path.as_string()).collect();
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn compact_preserves_sibling_count_and_order() {
        let mut outline = Outline::new();
        for i in 0..14u16 {
            let pos = if i < 9 {
                (i + 1) * 100
            } else if i < 12 {
                910 + (i - 9) * 10
            } else {
                991 + (i - 12)
            };
            outline.insert(node(&format!("n{i}"), &pos.to_string(), "x"));
        }
        let effect = outline.plan_compact(None);
        outline.apply_compact(&effect);
        let positions: Vec<u16> = outline
            .all_sorted()
            .iter()
            .map(|n| *n.path.segments().last().unwrap())
            .collect();
        assert_eq!(positions, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120, 130, 140]);
    }
}

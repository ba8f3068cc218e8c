//! Engine facade: wires `DirectoryLoader` + `Outline` + the planner,
//! executor, validator, compiler and searcher into the operation table of
//! the command surface. Every method here reloads the outline from disk,
//! does its arithmetic in memory, and (for mutations) hands the resulting
//! plan to the executor — it never keeps state across calls, so the next
//! call always sees exactly what's on disk (§2's data-flow contract).

use std::path::{Path, PathBuf};

use log::debug;

use crate::{
    codec,
    compiler,
    error::{Error, Result},
    frontmatter,
    id::OpaqueId,
    loader::{self, Anomaly},
    node::{is_reserved_doctype, is_valid_doctype, Node},
    outline::{DeleteMode, InsertPolicy, Outline},
    path::MaterializedPath,
    planner,
    ports::{FileSystem, IdEncoder, Slugifier},
    search::{self, Match, SearchFlags},
    validator::{self, Report},
};

/// Where a new node should land: under a parent (or root), optionally
/// relative to a sibling.
#[derive(Debug, Clone, Default)]
pub struct AddSpec {
    pub parent_id: Option<String>,
    pub sibling_id: Option<String>,
    pub before: bool,
    pub after: bool,
}

/// A resolved move target: either an explicit destination path or "become
/// the last child of this parent" (§6's disambiguation rule).
#[derive(Debug, Clone)]
pub enum MoveTarget {
    Path(MaterializedPath),
    Parent(String),
}

#[derive(Debug, Clone)]
pub struct NodeSummary {
    pub id: String,
    pub path: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct DeleteSummary {
    pub deleted: Vec<String>,
    pub promoted: Vec<String>,
}

/// One entry in a `list` tree, already nested.
#[derive(Debug, Clone)]
pub struct ListEntry {
    pub id: String,
    pub path: String,
    pub title: String,
    pub slug: String,
    pub doctypes: Vec<String>,
    pub children: Vec<ListEntry>,
}

/// The outcome of a `doctor` run.
#[derive(Debug)]
pub struct DoctorReport {
    pub report: Report,
    pub repaired: Vec<(String, String)>,
}

/// Strips a leading `@` (ids) and disambiguates path-looking strings
/// (digits and dashes only) from ids, per §6's boundary rules.
fn strip_at(raw: &str) -> &str {
    OpaqueId::strip_at_prefix(raw)
}

fn looks_like_path(raw: &str) -> bool {
    !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit() || c == '-')
}

pub struct Engine<'a> {
    fs: &'a dyn FileSystem,
    dir: PathBuf,
    id_encoder: &'a dyn IdEncoder,
    slugifier: &'a dyn Slugifier,
}

impl<'a> Engine<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        dir: impl Into<PathBuf>,
        id_encoder: &'a dyn IdEncoder,
        slugifier: &'a dyn Slugifier,
    ) -> Self {
        Engine {
            fs,
            dir: dir.into(),
            id_encoder,
            slugifier,
        }
    }

    fn load(&self) -> Result<(Outline, Vec<Anomaly>)> {
        let result = loader::load(self.fs, self.id_encoder, &self.dir)?;
        Ok((result.outline, result.anomalies))
    }

    /// Resolve a caller-supplied id or dash-digit path to a node that must
    /// already exist, stripping the `@` boundary prefix.
    fn require<'o>(&self, outline: &'o Outline, raw: &str) -> Result<&'o Node> {
        let raw = strip_at(raw);
        if looks_like_path(raw) {
            let path = MaterializedPath::from_string(raw)?;
            outline
                .get_by_path(&path)
                .ok_or_else(|| Error::UnknownId(raw.to_string()))
        } else {
            outline.require(raw)
        }
    }

    /// Resolve an optional subtree designator that must name an existing
    /// node (used by `list`, `compact`, `compile`).
    fn resolve_existing_subtree(
        &self,
        outline: &Outline,
        raw: Option<&str>,
    ) -> Result<Option<MaterializedPath>> {
        match raw {
            None => Ok(None),
            Some(raw) => Ok(Some(self.require(outline, raw)?.path.clone())),
        }
    }

    /// Resolve a search subtree designator, which may be a bare path prefix
    /// that names no existing node (§6: "a path prefix... the parser
    /// disambiguates by the presence of non-digit characters").
    fn resolve_search_subtree(
        &self,
        outline: &Outline,
        raw: Option<&str>,
    ) -> Result<Option<MaterializedPath>> {
        match raw {
            None => Ok(None),
            Some(raw) => {
                let raw = strip_at(raw);
                if looks_like_path(raw) {
                    Ok(Some(MaterializedPath::from_string(raw)?))
                } else {
                    Ok(Some(outline.require(raw)?.path.clone()))
                }
            }
        }
    }

    // ---- add ----

    pub fn add(&self, title: &str, spec: &AddSpec) -> Result<NodeSummary> {
        if title.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }
        let (mut outline, _) = self.load()?;

        let parent_path = match &spec.parent_id {
            Some(raw) => Some(self.require(&outline, raw)?.path.clone()),
            None => None,
        };

        let (policy, anchor_path) = match &spec.sibling_id {
            Some(raw) => {
                let anchor = self.require(&outline, raw)?;
                let anchor_parent = anchor.path.parent();
                if anchor_parent != parent_path {
                    return Err(Error::InvalidPath(
                        anchor.path.as_string(),
                        "sibling does not share the given parent".into(),
                    ));
                }
                let policy = if spec.after {
                    InsertPolicy::After
                } else {
                    // §9 open question: when a sibling is given and no flag
                    // disambiguates, default to Before (the only variant
                    // wired in the source this spec was distilled from).
                    InsertPolicy::Before
                };
                (policy, Some(anchor.path.clone()))
            }
            None => (InsertPolicy::Append, None),
        };

        let position =
            outline.resolve_new_position(parent_path.as_ref(), policy, anchor_path.as_ref())?;
        let new_path = match &parent_path {
            Some(p) => p.child(position)?,
            None => MaterializedPath::new(vec![position])?,
        };

        let counter = outline.bump_counter();
        let id = OpaqueId::new(self.id_encoder.encode(counter))?;
        let slug = self.slugifier.slugify(title);
        let node = Node::new(id.clone(), new_path.clone(), title, slug.clone());

        let plan = planner::plan_add(&self.dir, &node, "");
        crate::executor::apply(self.fs, &plan)?;

        Ok(NodeSummary {
            id: id.as_str().to_string(),
            path: new_path.as_string(),
            slug,
        })
    }

    // ---- list ----

    pub fn list(&self, subtree: Option<&str>) -> Result<Vec<ListEntry>> {
        let (outline, _) = self.load()?;
        let root = self.resolve_existing_subtree(&outline, subtree)?;

        let nodes = match &root {
            Some(root) => outline.subtree(root),
            None => outline.all_sorted(),
        };

        Ok(build_tree(&nodes, root.as_ref()))
    }

    // ---- move ----

    pub fn move_node(&self, id: &str, target: MoveTarget) -> Result<()> {
        let (outline, _) = self.load()?;
        let id = strip_at(id).to_string();

        let new_path = match target {
            MoveTarget::Path(path) => path,
            MoveTarget::Parent(raw) => {
                let parent = self.require(&outline, &raw)?.path.clone();
                let position = outline.append_position(Some(&parent))?;
                parent.child(position)?
            }
        };

        let effect = outline.plan_move(&id, &new_path)?;
        let plan = planner::plan_move(&self.dir, &outline, &effect);
        crate::executor::apply(self.fs, &plan)?;
        Ok(())
    }

    // ---- rename ----

    pub fn rename(&self, id: &str, new_title: &str) -> Result<()> {
        let (outline, _) = self.load()?;
        let id = strip_at(id);
        let node = outline.require(id)?;

        let effect = outline.plan_rename(id, new_title, self.slugifier)?;

        let draft_path = self
            .dir
            .join(codec::encode(&node.path, &node.id, "draft", &node.slug));
        let current_draft = if self.fs.exists(&draft_path) {
            self.fs.read(&draft_path)?
        } else {
            String::new()
        };
        let body = frontmatter::strip(&current_draft);

        let plan = planner::plan_rename(&self.dir, node, &effect, &body);
        crate::executor::apply(self.fs, &plan)?;
        Ok(())
    }

    // ---- delete ----

    pub fn delete(&self, id: &str, mode: DeleteMode) -> Result<DeleteSummary> {
        let (outline, _) = self.load()?;
        let id = strip_at(id);
        let effect = outline.plan_delete(id, mode)?;

        let plan = planner::plan_delete(&self.dir, &outline, &effect);
        crate::executor::apply(self.fs, &plan)?;

        Ok(DeleteSummary {
            deleted: effect.deleted.iter().map(|i| i.as_str().to_string()).collect(),
            promoted: effect.promoted.iter().map(|r| r.id.as_str().to_string()).collect(),
        })
    }

    // ---- compact ----

    pub fn compact(&self, subtree: Option<&str>) -> Result<usize> {
        let (outline, _) = self.load()?;
        let prefix = self.resolve_existing_subtree(&outline, subtree)?;
        let target_depth = prefix.as_ref().map(|p| p.depth() + 1).unwrap_or(1);

        let effect = outline.plan_compact(prefix.as_ref());
        let renumbered = effect
            .reassignments
            .iter()
            .filter(|r| r.old_path.depth() == target_depth)
            .count();

        let plan = planner::plan_compact(&self.dir, &outline, &effect);
        crate::executor::apply(self.fs, &plan)?;
        Ok(renumbered)
    }

    // ---- doctor ----

    pub fn doctor(&self, repair: bool) -> Result<DoctorReport> {
        let (outline, anomalies) = self.load()?;
        let report = validator::validate(&outline, &anomalies);

        if !repair {
            return Ok(DoctorReport {
                report,
                repaired: Vec::new(),
            });
        }

        let fixes: Vec<(String, String)> = validator::repairable(&report)
            .into_iter()
            .map(|(id, doctype)| (id.to_string(), doctype.to_string()))
            .collect();

        for (id, doctype) in &fixes {
            let node = outline.require(id)?;
            let plan = planner::plan_repair_missing_doctype(&self.dir, node, doctype);
            crate::executor::apply(self.fs, &plan)?;
        }

        let (outline_after, anomalies_after) = self.load()?;
        let report_after = validator::validate(&outline_after, &anomalies_after);
        Ok(DoctorReport {
            report: report_after,
            repaired: fixes,
        })
    }

    // ---- compile ----

    pub fn compile(&self, doctype: &str, subtree: Option<&str>, separator: &str) -> Result<String> {
        let (outline, _) = self.load()?;
        let root = self.resolve_existing_subtree(&outline, subtree)?;
        compiler::compile(self.fs, &self.dir, &outline, doctype, root.as_ref(), separator)
    }

    // ---- search ----

    pub fn search(
        &self,
        pattern: &str,
        subtree: Option<&str>,
        doctypes: Option<&[String]>,
        flags: SearchFlags,
    ) -> Result<Vec<Match>> {
        let (outline, _) = self.load()?;
        let root = self.resolve_search_subtree(&outline, subtree)?;
        let iter = search::search(self.fs, &self.dir, &outline, pattern, root.as_ref(), doctypes, flags)?;
        iter.collect()
    }

    // ---- types ----

    pub fn types_list(&self, id: &str) -> Result<Vec<String>> {
        let (outline, _) = self.load()?;
        let node = self.require(&outline, id)?;
        Ok(node.doctypes.iter().cloned().collect())
    }

    pub fn types_add(&self, id: &str, doctype: &str) -> Result<()> {
        let (outline, _) = self.load()?;
        let node = self.require(&outline, id)?;
        if is_reserved_doctype(doctype) {
            return Err(Error::ReservedDoctype(doctype.to_string()));
        }
        if !is_valid_doctype(doctype) {
            return Err(Error::InvalidDoctype(doctype.to_string()));
        }
        if node.doctypes.contains(doctype) {
            return Err(Error::DoctypeAlreadyPresent {
                id: node.id.as_str().to_string(),
                doctype: doctype.to_string(),
            });
        }
        let plan = planner::plan_type_add(&self.dir, node, doctype);
        crate::executor::apply(self.fs, &plan)?;
        Ok(())
    }

    pub fn types_remove(&self, id: &str, doctype: &str) -> Result<()> {
        let (outline, _) = self.load()?;
        let node = self.require(&outline, id)?;
        if is_reserved_doctype(doctype) {
            return Err(Error::ReservedDoctype(doctype.to_string()));
        }
        if !node.doctypes.contains(doctype) {
            return Err(Error::UnknownDoctype {
                id: node.id.as_str().to_string(),
                doctype: doctype.to_string(),
            });
        }
        let plan = planner::plan_type_remove(&self.dir, node, doctype);
        crate::executor::apply(self.fs, &plan)?;
        Ok(())
    }

    pub fn types_read(&self, id: &str, doctype: &str) -> Result<String> {
        let (outline, _) = self.load()?;
        let node = self.require(&outline, id)?;
        if !node.doctypes.contains(doctype) {
            return Err(Error::UnknownDoctype {
                id: node.id.as_str().to_string(),
                doctype: doctype.to_string(),
            });
        }
        let path = self
            .dir
            .join(codec::encode(&node.path, &node.id, doctype, &node.slug));
        let contents = self.fs.read(&path)?;
        Ok(frontmatter::strip(&contents))
    }

    pub fn types_write(&self, id: &str, doctype: &str, body: &str) -> Result<()> {
        let (outline, _) = self.load()?;
        let node = self.require(&outline, id)?;
        if !node.doctypes.contains(doctype) {
            return Err(Error::UnknownDoctype {
                id: node.id.as_str().to_string(),
                doctype: doctype.to_string(),
            });
        }
        let plan = planner::plan_type_write(&self.dir, node, doctype, body);
        crate::executor::apply(self.fs, &plan)?;
        Ok(())
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }
}

/// Disambiguate a `move` target string per §6: digits-and-dashes parses as
/// a materialized path (the explicit destination), anything else as a
/// parent id (append-as-last-child).
pub fn parse_move_target(raw: &str) -> Result<MoveTarget> {
    let stripped = strip_at(raw);
    if looks_like_path(stripped) {
        Ok(MoveTarget::Path(MaterializedPath::from_string(stripped)?))
    } else {
        Ok(MoveTarget::Parent(stripped.to_string()))
    }
}

fn build_tree(nodes: &[&Node], root: Option<&MaterializedPath>) -> Vec<ListEntry> {
    // Every node whose parent is `root` (or a top-level node, when `root`
    // is None) becomes an entry; its children are found recursively among
    // the same slice, which is already restricted to the subtree.
    let mut entries = Vec::new();
    for node in nodes {
        let is_direct_child = match root {
            Some(root) => node.path.parent().as_ref() == Some(root),
            None => node.path.depth() == 1,
        };
        if !is_direct_child {
            continue;
        }
        let children = build_tree(nodes, Some(&node.path));
        entries.push(ListEntry {
            id: node.id.as_str().to_string(),
            path: node.path.as_string(),
            title: node.title.clone(),
            slug: node.slug.clone(),
            doctypes: node.doctypes.iter().cloned().collect(),
            children,
        });
    }
    debug!("built {} top-level list entries", entries.len());
    entries
}

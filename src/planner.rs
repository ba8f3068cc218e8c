//! Mutation planner.
//!
//! Turns an [`Outline`]-level effect (move, rename, delete, compact) plus the
//! node data already in memory into an ordered list of filesystem
//! operations. The planner never touches the filesystem itself; that's
//! [`crate::executor`]'s job.

use std::path::{Path, PathBuf};

use crate::{
    codec,
    id::OpaqueId,
    node::Node,
    outline::{CompactEffect, DeleteEffect, MoveEffect, Outline, RenameEffect},
    path::MaterializedPath,
};

/// One filesystem-level step in a plan.
#[derive(Debug, Clone)]
pub enum FsOp {
    Rename { from: PathBuf, to: PathBuf },
    Create { path: PathBuf, contents: String },
    Delete { path: PathBuf },
}

/// An ordered, named list of steps. `kind` and `len()` are what the executor
/// logs at `info!` before applying.
pub struct Plan {
    pub kind: &'static str,
    pub ops: Vec<FsOp>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

fn node_path(dir: &Path, node: &Node, doctype: &str) -> PathBuf {
    dir.join(codec::encode(&node.path, &node.id, doctype, &node.slug))
}

fn temp_path(dir: &Path, id: &OpaqueId, doctype: &str) -> PathBuf {
    dir.join(format!(".tmp_{id}_{doctype}"))
}

/// Stage every doctype file of a reassigned node through a unique temp name,
/// then to its final name. Always two-phase, even when a direct rename
/// would be collision-free, per the design decision recorded in DESIGN.md.
fn stage_node_rename(
    dir: &Path,
    id: &OpaqueId,
    old_path: &MaterializedPath,
    new_path: &MaterializedPath,
    slug: &str,
    doctypes: &[String],
    first_pass: &mut Vec<FsOp>,
    second_pass: &mut Vec<FsOp>,
) {
    for doctype in doctypes {
        let from = dir.join(codec::encode(old_path, id, doctype, slug));
        let via = temp_path(dir, id, doctype);
        let to = dir.join(codec::encode(new_path, id, doctype, slug));
        first_pass.push(FsOp::Rename {
            from,
            to: via.clone(),
        });
        second_pass.push(FsOp::Rename { from: via, to });
    }
}

/// Plan the filesystem side of a move: every reassigned node's doctype files
/// renamed from their old encoded name to their new one.
pub fn plan_move(dir: &Path, outline: &Outline, effect: &MoveEffect) -> Plan {
    let mut first_pass = Vec::new();
    let mut second_pass = Vec::new();
    for r in &effect.reassignments {
        let Some(node) = outline.get(r.id.as_str()) else {
            continue;
        };
        let doctypes: Vec<String> = node.doctypes.iter().cloned().collect();
        stage_node_rename(
            dir,
            &r.id,
            &r.old_path,
            &r.new_path,
            &node.slug,
            &doctypes,
            &mut first_pass,
            &mut second_pass,
        );
    }
    first_pass.extend(second_pass);
    Plan {
        kind: "move",
        ops: first_pass,
    }
}

/// Plan the filesystem side of a rename: every doctype file renamed to the
/// new slug, and the draft's front-matter title rewritten.
pub fn plan_rename(
    dir: &Path,
    node: &Node,
    effect: &RenameEffect,
    draft_body_without_front_matter: &str,
) -> Plan {
    let mut ops = Vec::new();
    for doctype in &node.doctypes {
        let from = node_path(dir, node, doctype);
        if effect.old_slug == effect.new_slug {
            continue;
        }
        let to = dir.join(codec::encode(&node.path, &node.id, doctype, &effect.new_slug));
        ops.push(FsOp::Rename { from, to });
    }

    let draft_filename = codec::encode(&node.path, &node.id, "draft", &effect.new_slug);
    let draft_path = dir.join(draft_filename);
    let contents =
        crate::frontmatter::render(Some(&effect.new_title), draft_body_without_front_matter);
    ops.push(FsOp::Create {
        path: draft_path,
        contents,
    });

    Plan { kind: "rename", ops }
}

/// Plan the filesystem side of a delete: every doctype file of every deleted
/// node removed, and promoted children's doctype files renamed.
pub fn plan_delete(dir: &Path, outline: &Outline, effect: &DeleteEffect) -> Plan {
    let mut first_pass = Vec::new();
    let mut second_pass = Vec::new();

    for r in &effect.promoted {
        let Some(node) = outline.get(r.id.as_str()) else {
            continue;
        };
        let doctypes: Vec<String> = node.doctypes.iter().cloned().collect();
        stage_node_rename(
            dir,
            &r.id,
            &r.old_path,
            &r.new_path,
            &node.slug,
            &doctypes,
            &mut first_pass,
            &mut second_pass,
        );
    }
    first_pass.extend(second_pass);

    for id in &effect.deleted {
        if let Some(node) = outline.get(id.as_str()) {
            for doctype in &node.doctypes {
                first_pass.push(FsOp::Delete {
                    path: node_path(dir, node, doctype),
                });
            }
        }
    }

    Plan {
        kind: "delete",
        ops: first_pass,
    }
}

/// Plan the filesystem side of a compaction.
pub fn plan_compact(dir: &Path, outline: &Outline, effect: &CompactEffect) -> Plan {
    let mut first_pass = Vec::new();
    let mut second_pass = Vec::new();
    for r in &effect.reassignments {
        let Some(node) = outline.get(r.id.as_str()) else {
            continue;
        };
        let doctypes: Vec<String> = node.doctypes.iter().cloned().collect();
        stage_node_rename(
            dir,
            &r.id,
            &r.old_path,
            &r.new_path,
            &node.slug,
            &doctypes,
            &mut first_pass,
            &mut second_pass,
        );
    }
    first_pass.extend(second_pass);
    Plan {
        kind: "compact",
        ops: first_pass,
    }
}

/// Plan the filesystem side of adding a new node: one file per required
/// doctype, draft carrying the front-matter title.
pub fn plan_add(dir: &Path, node: &Node, draft_body: &str) -> Plan {
    let mut ops = Vec::new();
    for doctype in &node.doctypes {
        let path = node_path(dir, node, doctype);
        let contents = if doctype == "draft" {
            crate::frontmatter::render(Some(&node.title), draft_body)
        } else {
            String::new()
        };
        ops.push(FsOp::Create { path, contents });
    }
    Plan { kind: "add", ops }
}

/// Plan adding a new doctype file to an existing node.
pub fn plan_type_add(dir: &Path, node: &Node, doctype: &str) -> Plan {
    Plan {
        kind: "types-add",
        ops: vec![FsOp::Create {
            path: dir.join(codec::encode(&node.path, &node.id, doctype, &node.slug)),
            contents: String::new(),
        }],
    }
}

/// Plan removing a doctype file from an existing node.
pub fn plan_type_remove(dir: &Path, node: &Node, doctype: &str) -> Plan {
    Plan {
        kind: "types-remove",
        ops: vec![FsOp::Delete {
            path: dir.join(codec::encode(&node.path, &node.id, doctype, &node.slug)),
        }],
    }
}

/// Plan rewriting a doctype file's body (`types write`).
pub fn plan_type_write(dir: &Path, node: &Node, doctype: &str, body: &str) -> Plan {
    let path = dir.join(codec::encode(&node.path, &node.id, doctype, &node.slug));
    let contents = if doctype == "draft" {
        crate::frontmatter::render(Some(&node.title), body)
    } else {
        body.to_string()
    };
    Plan {
        kind: "types-write",
        ops: vec![FsOp::Create { path, contents }],
    }
}

/// Plan the repairer's class-4 fix: create a missing required doctype file.
pub fn plan_repair_missing_doctype(dir: &Path, node: &Node, doctype: &str) -> Plan {
    let path = dir.join(codec::encode(&node.path, &node.id, doctype, &node.slug));
    let contents = if doctype == "draft" {
        crate::frontmatter::render(Some(&node.title), "")
    } else {
        String::new()
    };
    Plan {
        kind: "repair",
        ops: vec![FsOp::Create { path, contents }],
    }
}

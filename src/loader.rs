//! Directory → Outline reconstruction.
//!
//! Scans a flat directory of `.md` files, groups them by id, and rebuilds
//! one [`Node`] per group. The draft file's front-matter `title:` is the
//! authoritative title on reload (§3); any other doctype file only
//! contributes its doctype and, via the filename, a fallback title source
//! if the draft is missing (used by the repairer, not the loader itself).

use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::debug;

use crate::{
    codec::{self, DecodedName},
    error::Result,
    frontmatter,
    id::OpaqueId,
    node::Node,
    outline::Outline,
    ports::{FileSystem, IdEncoder},
};

const DRAFT_DOCTYPE: &str = "draft";

/// A file in the scanned directory that did not parse as a node filename.
#[derive(Debug, Clone)]
pub struct Anomaly {
    pub filename: String,
    pub reason: String,
}

/// The reconstructed outline plus whatever anomalies were found while
/// scanning. A non-empty anomaly list does not prevent the outline from
/// loading around the files that did parse; callers that need strict
/// integrity should run the validator over the result.
pub struct LoadResult {
    pub outline: Outline,
    pub anomalies: Vec<Anomaly>,
}

struct Grouped {
    id: OpaqueId,
    files: Vec<(DecodedName, PathBuf)>,
}

/// Scan `dir` for node files and reconstruct an [`Outline`].
pub fn load(fs: &dyn FileSystem, id_encoder: &dyn IdEncoder, dir: &Path) -> Result<LoadResult> {
    let paths = fs.list_md(dir)?;
    let mut anomalies = Vec::new();
    let mut decoded: Vec<(DecodedName, PathBuf)> = Vec::new();

    for path in paths {
        let filename = match path.file_name().and_then(|f| f.to_str()) {
            Some(f) => f,
            None => continue,
        };
        match codec::decode(filename) {
            Ok(name) => decoded.push((name, path)),
            Err(err) => {
                debug!("skipping unparseable file {filename}: {err}");
                anomalies.push(Anomaly {
                    filename: filename.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    let groups = group_by_id(decoded);

    let mut nodes = Vec::new();
    let mut max_counter = 0u64;
    for group in groups {
        if let Some(counter) = id_encoder.decode(group.id.as_str()) {
            max_counter = max_counter.max(counter + 1);
        }
        let node = build_node(fs, group)?;
        nodes.push(node);
    }

    let outline = Outline::from_nodes(nodes, max_counter);
    Ok(LoadResult { outline, anomalies })
}

fn group_by_id(decoded: Vec<(DecodedName, PathBuf)>) -> Vec<Grouped> {
    decoded
        .into_iter()
        .into_group_map_by(|(name, _)| name.id.clone())
        .into_iter()
        .map(|(id, files)| Grouped { id, files })
        .collect()
}

fn build_node(fs: &dyn FileSystem, group: Grouped) -> Result<Node> {
    let first = &group.files[0].0;
    let path = first.path.clone();
    let id = group.id.clone();

    let draft = group
        .files
        .iter()
        .find(|(name, _)| name.doctype == DRAFT_DOCTYPE);

    let (title, slug) = match draft {
        Some((name, file_path)) => {
            let contents = fs.read(file_path)?;
            let doc = frontmatter::parse(&contents);
            let title = doc.title.unwrap_or_else(|| name.slug.replace('-', " "));
            (title, name.slug.clone())
        }
        None => {
            let fallback = &group.files[0].0;
            (fallback.slug.replace('-', " "), fallback.slug.clone())
        }
    };

    let mut node = Node::new(id, path, title, slug);
    node.doctypes.clear();
    for (name, _) in &group.files {
        node.doctypes.insert(name.doctype.clone());
    }

    Ok(node)
}

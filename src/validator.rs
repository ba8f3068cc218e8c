//! Validator/Repairer.
//!
//! Runs the six invariant checks from §4.8 against a loaded [`Outline`] and
//! the raw anomaly list the loader already collected, accumulating every
//! violation rather than stopping at the first. Repair mode only fixes the
//! missing-required-doctype class; everything else is reported only.

use std::collections::HashMap;

use log::warn;

use crate::{loader::Anomaly, node::REQUIRED_DOCTYPES, outline::Outline};

/// One invariant violation, tagged by the §4.8 class it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    UnparseableFilename { filename: String, reason: String },
    DuplicateId { id: String, paths: Vec<String> },
    DuplicatePath { path: String, ids: Vec<String> },
    MissingDoctype { id: String, doctype: String },
    TitleMismatch { id: String, expected: String, found: String },
    OrphanedPath { id: String, path: String },
}

/// A report is what `doctor` returns: the full violation list, already in
/// the order the checks ran.
#[derive(Debug, Default)]
pub struct Report {
    pub violations: Vec<Violation>,
}

impl Report {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Run every check against `outline`, folding in anomalies the loader
/// already found (class 1).
pub fn validate(outline: &Outline, anomalies: &[Anomaly]) -> Report {
    let mut violations = Vec::new();

    // 1. Unparseable filenames.
    for anomaly in anomalies {
        violations.push(Violation::UnparseableFilename {
            filename: anomaly.filename.clone(),
            reason: anomaly.reason.clone(),
        });
    }

    let nodes = outline.all_sorted();

    // 2. Duplicate id across distinct paths: the loader already dedupes by
    // id via grouping, so a duplicate id can only arise from distinct nodes
    // sharing the same id string, which the id map itself prevents by
    // construction. Guard anyway in case callers build an Outline by hand.
    let mut by_id: HashMap<String, Vec<String>> = HashMap::new();
    for node in &nodes {
        by_id
            .entry(node.id.as_str().to_string())
            .or_default()
            .push(node.path.as_string());
    }
    for (id, paths) in &by_id {
        if paths.len() > 1 {
            violations.push(Violation::DuplicateId {
                id: id.clone(),
                paths: paths.clone(),
            });
        }
    }

    // 3. Duplicate path across distinct ids.
    let mut by_path: HashMap<String, Vec<String>> = HashMap::new();
    for node in &nodes {
        by_path
            .entry(node.path.as_string())
            .or_default()
            .push(node.id.as_str().to_string());
    }
    for (path, ids) in &by_path {
        if ids.len() > 1 {
            violations.push(Violation::DuplicatePath {
                path: path.clone(),
                ids: ids.clone(),
            });
        }
    }

    // 4. Missing required doctype.
    for node in &nodes {
        for required in REQUIRED_DOCTYPES {
            if !node.doctypes.contains(required) {
                violations.push(Violation::MissingDoctype {
                    id: node.id.as_str().to_string(),
                    doctype: required.to_string(),
                });
            }
        }
    }

    // 5. Title mismatch: the node's title is read from the draft file at
    // load time, so a mismatch can only be detected against the slug every
    // other doctype file encodes (the canonical title source once loaded is
    // the draft; a differing slug on a sibling file signals a stale rename).
    for node in &nodes {
        let title_slug = crate::ports::AsciiSlugifier;
        use crate::ports::Slugifier;
        let expected_slug = title_slug.slugify(&node.title);
        if expected_slug != node.slug {
            warn!(
                "title/slug mismatch for {}: title implies {:?}, filename has {:?}",
                node.id, expected_slug, node.slug
            );
            violations.push(Violation::TitleMismatch {
                id: node.id.as_str().to_string(),
                expected: expected_slug,
                found: node.slug.clone(),
            });
        }
    }

    // 6. Orphaned path: non-root node whose immediate parent has no node.
    for node in &nodes {
        if let Some(parent) = node.path.parent() {
            if outline.get_by_path(&parent).is_none() {
                warn!("orphaned path {} (id {})", node.path, node.id);
                violations.push(Violation::OrphanedPath {
                    id: node.id.as_str().to_string(),
                    path: node.path.as_string(),
                });
            }
        }
    }

    Report { violations }
}

/// Every `MissingDoctype` violation in `report`, the only class `doctor
/// --repair` fixes.
pub fn repairable(report: &Report) -> Vec<(&str, &str)> {
    report
        .violations
        .iter()
        .filter_map(|v| match v {
            Violation::MissingDoctype { id, doctype } => Some((id.as_str(), doctype.as_str())),
            _ => None,
        })
        .collect()
}

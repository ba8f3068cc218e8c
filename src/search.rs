//! Regex/literal body scanner.
//!
//! Selects nodes in depth-first path order, filtered by subtree and doctype,
//! and scans each selected file's body (front-matter stripped) line by
//! line. Malformed UTF-8 never aborts the scan: bytes are decoded with a
//! lossy fallback. Results stream one file at a time via [`SearchIter`]
//! rather than collecting eagerly, per the suspension-point contract in
//! §5.

use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};

use crate::{
    error::{Error, Result},
    frontmatter,
    id::OpaqueId,
    outline::Outline,
    path::MaterializedPath,
    ports::FileSystem,
};

/// Scan flags. `literal` escapes the pattern before building the regex, so
/// the caller gets substring matching without writing their own escaping.
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchFlags {
    pub case_sensitive: bool,
    pub dotall: bool,
    pub literal: bool,
}

/// One matched line.
#[derive(Debug, Clone)]
pub struct Match {
    pub id: OpaqueId,
    pub path: MaterializedPath,
    pub doctype: String,
    pub line_number: usize,
    pub line: String,
    pub span: (usize, usize),
}

struct Candidate {
    id: OpaqueId,
    path: MaterializedPath,
    doctype: String,
    file: PathBuf,
}

/// A lazy, depth-first-then-by-line stream of matches. Built by [`search`].
pub struct SearchIter<'a> {
    fs: &'a dyn FileSystem,
    regex: Regex,
    candidates: std::vec::IntoIter<Candidate>,
    pending: std::vec::IntoIter<Match>,
}

impl<'a> Iterator for SearchIter<'a> {
    type Item = Result<Match>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(m) = self.pending.next() {
                return Some(Ok(m));
            }
            let candidate = self.candidates.next()?;
            match scan_file(self.fs, &candidate, &self.regex) {
                Ok(matches) => self.pending = matches.into_iter(),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

fn scan_file(fs: &dyn FileSystem, candidate: &Candidate, regex: &Regex) -> Result<Vec<Match>> {
    let raw = fs.read_lossy(&candidate.file)?;
    let body = frontmatter::strip(&raw);

    let mut matches = Vec::new();
    for (idx, line) in body.lines().enumerate() {
        if let Some(m) = regex.find(line) {
            matches.push(Match {
                id: candidate.id.clone(),
                path: candidate.path.clone(),
                doctype: candidate.doctype.clone(),
                line_number: idx + 1,
                line: line.to_string(),
                span: (m.start(), m.end()),
            });
        }
    }
    Ok(matches)
}

/// Build a regex from `pattern` and `flags`, escaping the pattern first when
/// `flags.literal` is set.
fn build_regex(pattern: &str, flags: SearchFlags) -> Result<Regex> {
    let source = if flags.literal {
        regex::escape(pattern)
    } else {
        pattern.to_string()
    };
    RegexBuilder::new(&source)
        .case_insensitive(!flags.case_sensitive)
        .dot_matches_new_line(flags.dotall)
        .build()
        .map_err(|source| Error::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })
}

/// Search `outline` for `pattern`, optionally restricted to `subtree` and/or
/// a set of doctypes. An invalid regex fails before any file is read.
pub fn search<'a>(
    fs: &'a dyn FileSystem,
    dir: &Path,
    outline: &Outline,
    pattern: &str,
    subtree: Option<&MaterializedPath>,
    doctypes: Option<&[String]>,
    flags: SearchFlags,
) -> Result<SearchIter<'a>> {
    let regex = build_regex(pattern, flags)?;

    let nodes = match subtree {
        Some(root) => outline.subtree(root),
        None => outline.all_sorted(),
    };

    let mut candidates = Vec::new();
    for node in nodes {
        for doctype in &node.doctypes {
            if let Some(allowed) = doctypes {
                if !allowed.iter().any(|d| d == doctype) {
                    continue;
                }
            }
            candidates.push(Candidate {
                id: node.id.clone(),
                path: node.path.clone(),
                doctype: doctype.clone(),
                file: dir.join(crate::codec::encode(&node.path, &node.id, doctype, &node.slug)),
            });
        }
    }

    Ok(SearchIter {
        fs,
        regex,
        candidates: candidates.into_iter(),
        pending: Vec::new().into_iter(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{id::OpaqueId, node::Node, ports::InMemoryFileSystem};
    use std::path::PathBuf;

    fn mp(s: &str) -> MaterializedPath {
        MaterializedPath::from_string(s).unwrap()
    }

    fn seed(fs: &InMemoryFileSystem, outline: &mut Outline, id: &str, path: &str, body: &str) {
        let node = Node::new(OpaqueId::new(id).unwrap(), mp(path), "T", "t");
        fs.seed(
            PathBuf::from(format!("/o/{path}_{id}_draft_t.md")),
            body.to_string(),
        );
        outline.insert(node);
    }

    #[test]
    fn finds_matches_in_path_then_line_order() {
        let fs = InMemoryFileSystem::new();
        let mut outline = Outline::new();
        seed(&fs, &mut outline, "a1", "100", "alpha\nbeta dragon\n");
        seed(&fs, &mut outline, "b1", "200", "dragon again\n");

        let matches: Vec<Match> = search(
            &fs,
            Path::new("/o"),
            &outline,
            "dragon",
            None,
            None,
            SearchFlags::default(),
        )
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id.as_str(), "a1");
        assert_eq!(matches[0].line_number, 2);
        assert_eq!(matches[1].id.as_str(), "b1");
    }

    #[test]
    fn invalid_regex_fails_before_scanning() {
        let fs = InMemoryFileSystem::new();
        let outline = Outline::new();
        let result = search(
            &fs,
            Path::new("/o"),
            &outline,
            "(unclosed",
            None,
            None,
            SearchFlags::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn literal_flag_escapes_pattern() {
        let fs = InMemoryFileSystem::new();
        let mut outline = Outline::new();
        seed(&fs, &mut outline, "a1", "100", "price: $5.00\n");

        let matches: Vec<Match> = search(
            &fs,
            Path::new("/o"),
            &outline,
            "$5.00",
            None,
            None,
            SearchFlags {
                literal: true,
                ..Default::default()
            },
        )
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn doctype_filter_excludes_other_doctypes() {
        let fs = InMemoryFileSystem::new();
        let mut outline = Outline::new();
        let node = Node::new(OpaqueId::new("a1").unwrap(), mp("100"), "T", "t");
        fs.seed(PathBuf::from("/o/100_a1_draft_t.md"), "dragon\n");
        fs.seed(PathBuf::from("/o/100_a1_notes_t.md"), "dragon too\n");
        outline.insert(node);

        let matches: Vec<Match> = search(
            &fs,
            Path::new("/o"),
            &outline,
            "dragon",
            None,
            Some(&["notes".to_string()]),
            SearchFlags::default(),
        )
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].doctype, "notes");
    }
}

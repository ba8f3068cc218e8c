//! Bidirectional parser between a filename and (path, id, doctype, slug).
//!
//! Filenames look like `<mp>_<id>_<doctype>_<slug>.md`. Decoding splits on
//! the first three underscores only, so the slug itself may contain
//! underscores.

use crate::{error::Error, id::OpaqueId, node::is_valid_doctype, path::MaterializedPath};

const EXTENSION: &str = ".md";

/// The four fields encoded in a node filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedName {
    pub path: MaterializedPath,
    pub id: OpaqueId,
    pub doctype: String,
    pub slug: String,
}

/// `{mp}_{id}_{doctype}_{slug}.md`
pub fn encode(path: &MaterializedPath, id: &OpaqueId, doctype: &str, slug: &str) -> String {
    format!("{}_{}_{}_{}{EXTENSION}", path.as_string(), id, doctype, slug)
}

/// Parse a filename into its four fields, or a structured error describing
/// why it doesn't match the grammar.
pub fn decode(filename: &str) -> Result<DecodedName, Error> {
    let stem = filename
        .strip_suffix(EXTENSION)
        .ok_or_else(|| Error::UnparseableFilename(filename.to_string()))?;

    let first = find_nth_underscore(stem, 1)
        .ok_or_else(|| Error::UnparseableFilename(filename.to_string()))?;
    let second = find_nth_underscore(stem, 2)
        .ok_or_else(|| Error::UnparseableFilename(filename.to_string()))?;
    let third = find_nth_underscore(stem, 3)
        .ok_or_else(|| Error::UnparseableFilename(filename.to_string()))?;

    let mp_str = &stem[..first];
    let id_str = &stem[first + 1..second];
    let doctype = &stem[second + 1..third];
    let slug = &stem[third + 1..];

    if slug.is_empty() {
        return Err(Error::UnparseableFilename(filename.to_string()));
    }
    if !is_valid_doctype(doctype) {
        return Err(Error::UnparseableFilename(filename.to_string()));
    }

    let path = MaterializedPath::from_string(mp_str)
        .map_err(|_| Error::UnparseableFilename(filename.to_string()))?;
    let id =
        OpaqueId::new(id_str).map_err(|_| Error::UnparseableFilename(filename.to_string()))?;

    Ok(DecodedName {
        path,
        id,
        doctype: doctype.to_string(),
        slug: slug.to_string(),
    })
}

fn find_nth_underscore(s: &str, n: usize) -> Option<usize> {
    s.char_indices()
        .filter(|(_, c)| *c == '_')
        .nth(n - 1)
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> MaterializedPath {
        MaterializedPath::from_string(s).unwrap()
    }

    fn id(s: &str) -> OpaqueId {
        OpaqueId::new(s).unwrap()
    }

    #[test]
    fn round_trip_encode_decode() {
        let p = path("001-100-050");
        let i = id("A3F7c");
        let name = encode(&p, &i, "draft", "chapter-one");
        assert_eq!(name, "001-100-050_A3F7c_draft_chapter-one.md");

        let decoded = decode(&name).unwrap();
        assert_eq!(decoded.path, p);
        assert_eq!(decoded.id, i);
        assert_eq!(decoded.doctype, "draft");
        assert_eq!(decoded.slug, "chapter-one");
    }

    #[test]
    fn decode_then_encode_round_trips_to_same_string() {
        let name = "100_abc_notes_some-title.md";
        let decoded = decode(name).unwrap();
        let reencoded = encode(&decoded.path, &decoded.id, &decoded.doctype, &decoded.slug);
        assert_eq!(reencoded, name);
    }

    #[test]
    fn slug_may_contain_underscores() {
        let name = "100_abc_draft_some_weird_slug.md";
        let decoded = decode(name).unwrap();
        assert_eq!(decoded.slug, "some_weird_slug");
    }

    #[test]
    fn rejects_missing_extension() {
        assert!(decode("100_abc_draft_slug").is_err());
    }

    #[test]
    fn rejects_too_few_fields() {
        assert!(decode("100_abc_draft.md").is_err());
    }

    #[test]
    fn rejects_empty_slug() {
        assert!(decode("100_abc_draft_.md").is_err());
    }

    #[test]
    fn rejects_bad_path() {
        assert!(decode("abc_xyz_draft_slug.md").is_err());
    }

    #[test]
    fn rejects_bad_id() {
        assert!(decode("100_bad-id_draft_slug.md").is_err());
    }

    #[test]
    fn unknown_shape_is_anomaly_not_panic() {
        assert!(decode("README.md").is_err());
        assert!(decode(".hidden").is_err());
    }
}

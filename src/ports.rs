//! Collaborator ports: capability interfaces the core depends on but does
//! not implement a specific instance of. `RealFileSystem`, `Base62IdEncoder`
//! and `AsciiSlugifier` are the default adapters the CLI wires up; tests may
//! substitute other implementations, in particular `InMemoryFileSystem`.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

/// Non-recursive filesystem access the core needs: read, write (create or
/// replace), delete, rename, list `*.md`, exists, mkdirs.
pub trait FileSystem {
    fn read(&self, path: &Path) -> Result<String>;
    /// Like `read`, but malformed UTF-8 is replaced rather than surfaced as
    /// an error; only used by the searcher (§4.10), which must never let a
    /// decoding error abort the scan.
    fn read_lossy(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, contents: &str) -> Result<()>;
    fn delete(&self, path: &Path) -> Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn list_md(&self, dir: &Path) -> Result<Vec<PathBuf>>;
    fn exists(&self, path: &Path) -> bool;
    fn mkdirs(&self, dir: &Path) -> Result<()>;
}

/// Maps a monotonically increasing counter to a unique id string, and back.
pub trait IdEncoder {
    fn encode(&self, counter: u64) -> String;
    fn decode(&self, id: &str) -> Option<u64>;
}

/// Deterministic, idempotent title-to-slug transform.
pub trait Slugifier {
    fn slugify(&self, title: &str) -> String;
}

/// `std::fs`-backed filesystem adapter.
#[derive(Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| Error::io(path, e))
    }

    fn read_lossy(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(path, contents).map_err(|e| Error::io(path, e))
    }

    fn delete(&self, path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path).map_err(|e| Error::io(path, e))?;
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).map_err(|e| Error::io(from, e))
    }

    fn list_md(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("md") {
                out.push(path);
            }
        }
        out.sort();
        Ok(out)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn mkdirs(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))
    }
}

/// In-memory filesystem double for unit and property tests.
///
/// Not persisted anywhere; exists purely so outline-engine logic can be
/// exercised without touching disk.
#[derive(Default)]
pub struct InMemoryFileSystem {
    files: std::sync::Mutex<BTreeMap<PathBuf, String>>,
}

impl InMemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), contents.into());
    }

    pub fn snapshot(&self) -> BTreeMap<PathBuf, String> {
        self.files.lock().unwrap().clone()
    }
}

impl FileSystem for InMemoryFileSystem {
    fn read(&self, path: &Path) -> Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::io(path, std::io::Error::from(std::io::ErrorKind::NotFound)))
    }

    fn read_lossy(&self, path: &Path) -> Result<String> {
        self.read(path)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        let contents = files
            .remove(from)
            .ok_or_else(|| Error::io(from, std::io::Error::from(std::io::ErrorKind::NotFound)))?;
        files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    fn list_md(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|p| {
                p.parent() == Some(dir) && p.extension().and_then(|e| e.to_str()) == Some("md")
            })
            .cloned()
            .collect())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn mkdirs(&self, _dir: &Path) -> Result<()> {
        Ok(())
    }
}

/// Counter-to-id encoder using a base-62 alphabet (`0-9A-Za-z`).
///
/// Not cryptographic; only needs to be a stable bijection on the range of
/// counters the outline will ever mint, which monotonic counters satisfy.
#[derive(Default)]
pub struct Base62IdEncoder;

const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

impl IdEncoder for Base62IdEncoder {
    fn encode(&self, counter: u64) -> String {
        if counter == 0 {
            return "0".to_string();
        }
        let mut n = counter;
        let mut digits = Vec::new();
        while n > 0 {
            digits.push(ALPHABET[(n % 62) as usize]);
            n /= 62;
        }
        digits.reverse();
        String::from_utf8(digits).expect("alphabet is ASCII")
    }

    fn decode(&self, id: &str) -> Option<u64> {
        let mut n: u64 = 0;
        for c in id.chars() {
            let digit = ALPHABET.iter().position(|&b| b == c as u8)? as u64;
            n = n.checked_mul(62)?.checked_add(digit)?;
        }
        Some(n)
    }
}

/// Deterministic ASCII slugifier: lowercase, non-alphanumeric runs collapse
/// to a single hyphen, leading/trailing hyphens trimmed.
#[derive(Default)]
pub struct AsciiSlugifier;

impl Slugifier for AsciiSlugifier {
    fn slugify(&self, title: &str) -> String {
        let mut slug = String::new();
        let mut last_was_hyphen = true; // swallow leading separators
        for c in title.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
                last_was_hyphen = false;
            } else if !last_was_hyphen {
                slug.push('-');
                last_was_hyphen = true;
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        if slug.is_empty() {
            "untitled".to_string()
        } else {
            slug
        }
    }
}

//! Opaque node identifier.
//!
//! A short alphanumeric string, assigned once at node creation and never
//! changed by subsequent mutations. The value itself carries no structure
//! the core is allowed to rely on; minting new ones is the `IdEncoder`
//! port's job (see [`crate::ports`]).

use std::fmt;

use derive_more::Deref;

use crate::error::{Error, Result};

pub const MAX_LEN: usize = 20;

#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Deref)]
pub struct OpaqueId(String);

impl OpaqueId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() || value.len() > MAX_LEN {
            return Err(Error::InvalidPath(
                value,
                format!("id must be 1..={MAX_LEN} characters"),
            ));
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidPath(value, "id must be alphanumeric".into()));
        }
        Ok(OpaqueId(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strip a leading `@` if present, as accepted at the CLI boundary.
    pub fn strip_at_prefix(raw: &str) -> &str {
        raw.strip_prefix('@').unwrap_or(raw)
    }
}

impl fmt::Display for OpaqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

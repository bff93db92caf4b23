//! Validated object keys.

use std::fmt;

use tsblock_common::{Result, error::Error};

/// A relative, `/`-separated object path that has been verified not to escape
/// the store's container: no leading slash, no empty, `.` or `..` components,
/// no backslashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Parses and validates an object key.
    pub fn new(key: impl Into<String>) -> Result<ObjectKey> {
        let key = key.into();
        Self::verify(&key)?;
        Ok(ObjectKey(key))
    }

    /// Appends a relative path to this key.
    pub fn join(&self, relative: &str) -> Result<ObjectKey> {
        ObjectKey::new(format!("{}/{}", self.0, relative))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the `/`-separated components of the key.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    fn verify(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::invalid_arg("key", "object key is empty"));
        }
        if key.contains('\\') {
            return Err(Error::invalid_arg(
                "key",
                format!("object key '{key}' contains a backslash"),
            ));
        }
        for component in key.split('/') {
            if component.is_empty() || component == "." || component == ".." {
                return Err(Error::invalid_arg(
                    "key",
                    format!("object key '{key}' has an invalid path component"),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

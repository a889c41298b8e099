//! Content digests for tamper-evident records
//!
//! A record is hashed by feeding its canonical fields, in a fixed order, into
//! SHA-256. Fields are separated by `|` and absent values hash as the empty
//! string, so `None` and `Some("")` produce the same digest.

use crate::error::{Result, TallyError};
use sha2::{Digest, Sha256};

/// Incrementally builds a digest over a sequence of fields
#[derive(Default)]
pub struct FieldDigest {
    hasher: Sha256,
    fields: usize,
}

impl FieldDigest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field to the digest
    pub fn field(mut self, value: impl AsRef<str>) -> Self {
        if self.fields > 0 {
            self.hasher.update(b"|");
        }
        self.hasher.update(value.as_ref().as_bytes());
        self.fields += 1;
        self
    }

    /// Append an optional field; `None` contributes an empty field
    pub fn optional(self, value: Option<impl AsRef<str>>) -> Self {
        match value {
            Some(v) => self.field(v),
            None => self.field(""),
        }
    }

    /// Finish and return the lowercase hex digest
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Compare an expected digest with a freshly computed one
pub fn verify_digest(expected: &str, actual: &str) -> Result<()> {
    if expected.eq_ignore_ascii_case(actual) {
        Ok(())
    } else {
        Err(TallyError::IntegrityMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

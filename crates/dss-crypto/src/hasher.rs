use dss_types::Word;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"dss-snapshot-v1"`) that is
/// prepended to every hash computation, so a snapshot and a layout with
/// identical bytes produce different digests.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for owner snapshots.
    pub const SNAPSHOT: Self = Self {
        domain: "dss-snapshot-v1",
    };
    /// Hasher for module layout fingerprints.
    pub const LAYOUT: Self = Self {
        domain: "dss-layout-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Word {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Word::from_bytes(*hasher.finalize().as_bytes())
    }

    /// Hash a serializable value as JSON with domain separation.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<Word, HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &Word) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

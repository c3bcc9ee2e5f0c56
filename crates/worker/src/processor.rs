use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::WorkerError;

/// Turns a task's input into its result string.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn process(&self, data: &str) -> Result<String, WorkerError>;
}

/// Lowercase hex SHA-256 digest of the UTF-8 input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Processor;

impl Sha256Processor {
    pub fn digest_hex(data: &str) -> String {
        format!("{:x}", Sha256::digest(data.as_bytes()))
    }
}

#[async_trait]
impl Processor for Sha256Processor {
    fn name(&self) -> &str {
        "sha256"
    }

    async fn process(&self, data: &str) -> Result<String, WorkerError> {
        Ok(Self::digest_hex(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_known_inputs() {
        let p = Sha256Processor;
        assert_eq!(
            p.process("Hello, World!").await.unwrap(),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
        assert_eq!(
            p.process("abc").await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_is_lowercase_hex() {
        let hex = Sha256Processor::digest_hex("");
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

//! Configurable content digest (§4.1, `analysis.hash_algorithm`).

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    Sha1,
    Md5,
}

impl HashAlgorithm {
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "sha512" => HashAlgorithm::Sha512,
            "sha1" => HashAlgorithm::Sha1,
            "md5" => HashAlgorithm::Md5,
            _ => HashAlgorithm::Sha256,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Md5 => "md5",
        }
    }

    /// Lower-case hex digest of `bytes` using this algorithm.
    pub fn digest(&self, bytes: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(bytes);
                hex::encode(hasher.finalize())
            }
            HashAlgorithm::Sha512 => {
                let mut hasher = Sha512::new();
                hasher.update(bytes);
                hex::encode(hasher.finalize())
            }
            HashAlgorithm::Sha1 => {
                let mut hasher = Sha1::new();
                hasher.update(bytes);
                hex::encode(hasher.finalize())
            }
            HashAlgorithm::Md5 => {
                let mut hasher = Md5::new();
                hasher.update(bytes);
                hex::encode(hasher.finalize())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_hello_matches_known_digest() {
        let digest = HashAlgorithm::Sha256.digest(b"hello\n");
        assert_eq!(
            digest,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn parse_is_case_insensitive_and_defaults_to_sha256() {
        assert_eq!(HashAlgorithm::parse("SHA512"), HashAlgorithm::Sha512);
        assert_eq!(HashAlgorithm::parse("unknown"), HashAlgorithm::Sha256);
    }

    #[test]
    fn same_bytes_always_produce_same_digest() {
        let a = HashAlgorithm::Sha256.digest(b"hello\n");
        let b = HashAlgorithm::Sha256.digest(b"hello\n");
        assert_eq!(a, b);
        let c = HashAlgorithm::Sha256.digest(b"HELLO\n");
        assert_ne!(a, c);
    }
}

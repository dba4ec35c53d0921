use std::fmt;
use std::str::FromStr;

use md4::Md4;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

/// Algorithm used to turn a caller key into the identifier stored on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Sha224,
    Sha384,
    Sha512,
    Sha1,
    Md5,
    Md4,
    Blake3,
    /// The key itself, unhashed.
    Plain,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown digest algorithm '{0}'")]
pub struct UnknownDigest(pub String);

impl DigestAlgorithm {
    /// Lenient selector lookup: anything unrecognized, including an empty
    /// string, selects the default algorithm.
    pub fn from_selector(selector: &str) -> Self {
        selector.parse().unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha224 => "sha224",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Md4 => "md4",
            DigestAlgorithm::Blake3 => "blake3",
            DigestAlgorithm::Plain => "plain",
        }
    }

    pub fn digest(self, key: &str) -> String {
        let bytes = key.as_bytes();
        match self {
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
            DigestAlgorithm::Sha224 => hex::encode(Sha224::digest(bytes)),
            DigestAlgorithm::Sha384 => hex::encode(Sha384::digest(bytes)),
            DigestAlgorithm::Sha512 => hex::encode(Sha512::digest(bytes)),
            DigestAlgorithm::Sha1 => hex::encode(Sha1::digest(bytes)),
            DigestAlgorithm::Md5 => hex::encode(Md5::digest(bytes)),
            DigestAlgorithm::Md4 => hex::encode(Md4::digest(bytes)),
            DigestAlgorithm::Blake3 => blake3::hash(bytes).to_hex().to_string(),
            DigestAlgorithm::Plain => key.to_string(),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = UnknownDigest;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha224" => Ok(DigestAlgorithm::Sha224),
            "sha384" => Ok(DigestAlgorithm::Sha384),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            "sha1" => Ok(DigestAlgorithm::Sha1),
            "md5" => Ok(DigestAlgorithm::Md5),
            "md4" => Ok(DigestAlgorithm::Md4),
            "blake3" => Ok(DigestAlgorithm::Blake3),
            "plain" => Ok(DigestAlgorithm::Plain),
            _ => Err(UnknownDigest(value.to_string())),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

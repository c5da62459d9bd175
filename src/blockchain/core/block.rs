use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type Sha256Hash = [u8; 32];

pub const GENESIS_DATA: &str = "Genesis Block";

/// An ownership claim as stored inside a block body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarClaim {
    pub owner: String,
    pub star: serde_json::Value,
}

/// Structured form of a block body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockBody {
    Star(StarClaim),
    Genesis { data: String },
}

impl BlockBody {
    pub fn genesis() -> Self {
        BlockBody::Genesis {
            data: GENESIS_DATA.to_string(),
        }
    }

    pub fn star(owner: impl Into<String>, star: serde_json::Value) -> Self {
        BlockBody::Star(StarClaim {
            owner: owner.into(),
            star,
        })
    }

    /// Hex of the JSON form; this is what a block stores.
    pub fn encode(&self) -> Result<String> {
        Ok(hex::encode(serde_json::to_vec(self)?))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded)
            .map_err(|e| LedgerError::Decode(format!("body is not valid hex: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| LedgerError::Decode(format!("body is not a known payload: {}", e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub time: i64,
    #[serde(with = "opt_hex")]
    pub previous_block_hash: Option<Sha256Hash>,
    #[serde(with = "opt_hex")]
    pub hash: Option<Sha256Hash>,
    pub body: String,
}

impl Block {
    /// An unsealed block carrying `body`. Position, time and linkage are
    /// filled in by the ledger when it appends the block.
    pub fn new(body: &BlockBody) -> Result<Self> {
        Ok(Block {
            height: 0,
            time: 0,
            previous_block_hash: None,
            hash: None,
            body: body.encode()?,
        })
    }

    /// Hash over every field except `hash` itself.
    pub fn calculate_hash(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.time.to_le_bytes());
        match &self.previous_block_hash {
            Some(previous) => {
                hasher.update([1u8]);
                hasher.update(previous);
            }
            None => hasher.update([0u8]),
        }
        hasher.update((self.body.len() as u64).to_le_bytes());
        hasher.update(self.body.as_bytes());
        hasher.finalize().into()
    }

    pub fn seal(&mut self) {
        self.hash = Some(self.calculate_hash());
    }

    /// True iff the stored hash matches a recomputation. Unsealed blocks are
    /// never valid.
    pub fn validate(&self) -> bool {
        self.hash == Some(self.calculate_hash())
    }

    pub fn decode_body(&self) -> Result<BlockBody> {
        BlockBody::decode(&self.body)
    }
}

pub fn hash_to_hex(hash: &Sha256Hash) -> String {
    hex::encode(hash)
}

/// Parses a 64-character hex string into a Sha256Hash.
pub fn hash_from_hex(hash_str: &str) -> std::result::Result<Sha256Hash, hex::FromHexError> {
    let mut out = [0u8; 32];
    hex::decode_to_slice(hash_str, &mut out)?;
    Ok(out)
}

/// Hashes travel as lowercase hex, absent ones as `null`.
mod opt_hex {
    use super::{hash_from_hex, Sha256Hash};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Sha256Hash>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(hash) => s.serialize_some(&hex::encode(hash)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Sha256Hash>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| hash_from_hex(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

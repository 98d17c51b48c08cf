//! Node identity — Ed25519 keypairs and self-describing peer ids.
//!
//! A peer id either embeds the public key outright (Ed25519 keys are
//! small enough) or carries a BLAKE3 hash of key material too large to
//! embed. Embedded ids are self-certifying: the key can be recovered
//! from the id alone, with no network access and no third party.
//!
//! Wire/string form: one tag byte followed by 32 payload bytes,
//! hex-encoded (66 characters). Tag 0x01 = embedded, 0x02 = hashed.
//!
//! Secret key material is zeroized on drop.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::Zeroizing;

const TAG_EMBEDDED: u8 = 0x01;
const TAG_HASHED: u8 = 0x02;

/// Tag byte + 32 payload bytes.
pub const PEER_ID_LEN: usize = 33;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("peer id must be {PEER_ID_LEN} bytes, got {0}")]
    BadLength(usize),

    #[error("peer id is not valid hex: {0}")]
    BadHex(#[from] hex::FromHexError),

    #[error("unknown peer id tag 0x{0:02x}")]
    UnknownTag(u8),

    #[error("bytes are not a valid Ed25519 public key")]
    BadKeyMaterial,
}

// ── PublicKey ─────────────────────────────────────────────────────────────────

/// An Ed25519 public key.
///
/// Canonical encoding is the 32-byte compressed point; two keys are
/// equal exactly when their encodings are.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub const ENCODED_LEN: usize = 32;

    /// Decode a key from its canonical 32-byte encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IdentityError::BadKeyMaterial)?;
        let key = VerifyingKey::from_bytes(&arr).map_err(|_| IdentityError::BadKeyMaterial)?;
        Ok(Self(key))
    }

    /// The canonical 32-byte encoding.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Derive the peer id for this key. Ed25519 keys always embed.
    pub fn peer_id(&self) -> PeerId {
        PeerId::Embedded(self.to_bytes())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.to_bytes()[..8]))
    }
}

// ── Keypair ───────────────────────────────────────────────────────────────────

/// A node's long-term Ed25519 identity keypair.
///
/// Generated once per node and persisted as the 32-byte seed. The
/// secret never leaves this struct except via [`Keypair::seed`], which
/// hands it back wrapped in `Zeroizing` for storage.
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Reconstruct a keypair from a stored seed. The public key is
    /// derived deterministically.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(&seed),
        }
    }

    /// The seed bytes for persistent storage (mode 0600 recommended).
    pub fn seed(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing.to_bytes())
    }

    /// The public half.
    pub fn public(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key())
    }

    /// The peer id of this identity.
    pub fn peer_id(&self) -> PeerId {
        self.public().peer_id()
    }
}

// ── PeerId ────────────────────────────────────────────────────────────────────

/// A self-describing peer identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerId {
    /// The 32 public key bytes, embedded directly.
    Embedded([u8; 32]),
    /// BLAKE3-256 of a canonical key encoding too large to embed.
    /// Never derived locally — parsed from identities of foreign peers.
    Hashed([u8; 32]),
}

impl PeerId {
    /// Recover the public key without any I/O.
    ///
    /// Succeeds only for embedded ids whose payload is a valid curve
    /// point. Hashed ids carry no recoverable key material.
    pub fn extract_public_key(&self) -> Option<PublicKey> {
        match self {
            PeerId::Embedded(bytes) => PublicKey::from_bytes(bytes).ok(),
            PeerId::Hashed(_) => None,
        }
    }

    /// Does this id certify the given key?
    pub fn matches(&self, key: &PublicKey) -> bool {
        match self {
            PeerId::Embedded(bytes) => *bytes == key.to_bytes(),
            PeerId::Hashed(digest) => *digest == *blake3::hash(&key.to_bytes()).as_bytes(),
        }
    }

    /// Tag byte + payload.
    pub fn to_bytes(&self) -> [u8; PEER_ID_LEN] {
        let (tag, payload) = match self {
            PeerId::Embedded(bytes) => (TAG_EMBEDDED, bytes),
            PeerId::Hashed(digest) => (TAG_HASHED, digest),
        };
        let mut out = [0u8; PEER_ID_LEN];
        out[0] = tag;
        out[1..].copy_from_slice(payload);
        out
    }

    /// Parse from tag byte + payload.
    ///
    /// The payload of an embedded id is kept opaque here; whether it is
    /// a valid curve point only matters when a key is extracted or
    /// matched against.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        if bytes.len() != PEER_ID_LEN {
            return Err(IdentityError::BadLength(bytes.len()));
        }
        let mut payload = [0u8; 32];
        payload.copy_from_slice(&bytes[1..]);
        match bytes[0] {
            TAG_EMBEDDED => Ok(PeerId::Embedded(payload)),
            TAG_HASHED => Ok(PeerId::Hashed(payload)),
            tag => Err(IdentityError::UnknownTag(tag)),
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            PeerId::Embedded(_) => "embedded",
            PeerId::Hashed(_) => "hashed",
        };
        write!(f, "PeerId({kind}:{})", &self.to_string()[..18])
    }
}

impl FromStr for PeerId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }
}

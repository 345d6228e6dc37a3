//! Tamper-proof encoding of [`AuthenticationProperties`] into the OAuth `state` parameter.
//!
//! [`AeadStateCodec`] seals the serialized properties with AES-256-GCM, binding a purpose string
//! as associated data so values minted for another scheme never decode here. Outputs are tagged
//! `v<version>.` so a [`StateKeyring`] can keep accepting values sealed under retired keys while
//! new values use the current one.

// crates.io
use aes_gcm::{
	Aes256Gcm, Nonce,
	aead::{Aead, KeyInit, Payload},
};
use base64::{
	Engine as _,
	engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use rand::RngCore;
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::AuthenticationProperties,
	error::{ConfigError, StateError},
};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Protects and unprotects the `state` blob.
///
/// Implementations must fail closed: a mutated, truncated, or foreign value yields an error,
/// never a partially decoded bag.
pub trait StateCodec
where
	Self: Send + Sync,
{
	/// Serializes and seals `properties` into an opaque, URL-safe string.
	fn protect(&self, properties: &AuthenticationProperties) -> Result<String, StateError>;

	/// Reverses [`protect`](Self::protect).
	fn unprotect(&self, value: &str) -> Result<AuthenticationProperties, StateError>;
}

/// 256-bit symmetric key used to seal `state`.
#[derive(Clone, PartialEq, Eq)]
pub struct StateKey([u8; KEY_LEN]);
impl StateKey {
	/// Generates a random key.
	pub fn generate() -> Self {
		let mut bytes = [0_u8; KEY_LEN];

		rand::rng().fill_bytes(&mut bytes);

		Self(bytes)
	}

	/// Wraps raw key bytes.
	pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
		Self(bytes)
	}

	/// Decodes a standard base64 key (as stored in host configuration).
	pub fn from_base64(encoded: &str) -> Result<Self, ConfigError> {
		let raw = STANDARD.decode(encoded.trim()).map_err(|_| ConfigError::InvalidStateKey)?;
		let bytes = <[u8; KEY_LEN]>::try_from(raw.as_slice())
			.map_err(|_| ConfigError::InvalidStateKey)?;

		Ok(Self(bytes))
	}

	/// Derives a key from an arbitrary-length host secret, scoped to `purpose`.
	pub fn derive(secret: &[u8], purpose: &str) -> Self {
		let digest = Sha256::new()
			.chain_update(purpose.as_bytes())
			.chain_update([0_u8])
			.chain_update(secret)
			.finalize();
		let mut bytes = [0_u8; KEY_LEN];

		bytes.copy_from_slice(&digest);

		Self(bytes)
	}
}
impl Debug for StateKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("StateKey(<redacted>)")
	}
}

/// Versioned key material: one current key plus retired keys still accepted for unprotection.
#[derive(Clone, Debug)]
pub struct StateKeyring {
	current: u32,
	keys: BTreeMap<u32, StateKey>,
}
impl StateKeyring {
	/// Creates a keyring whose current key is `key` tagged `version`.
	pub fn new(version: u32, key: StateKey) -> Self {
		Self { current: version, keys: BTreeMap::from([(version, key)]) }
	}

	/// Keeps accepting values sealed under a retired key.
	pub fn with_retired(mut self, version: u32, key: StateKey) -> Self {
		if version != self.current {
			self.keys.insert(version, key);
		}

		self
	}

	/// Promotes a new current key; the previous one stays available for unprotection.
	pub fn rotate(mut self, version: u32, key: StateKey) -> Self {
		self.keys.insert(version, key);
		self.current = version;

		self
	}

	/// Version tag stamped on newly protected values.
	pub fn current_version(&self) -> u32 {
		self.current
	}

	/// Drops a retired key so values sealed under it are rejected.
	pub fn retire(mut self, version: u32) -> Self {
		if version != self.current {
			self.keys.remove(&version);
		}

		self
	}
}

/// AES-256-GCM [`StateCodec`].
#[derive(Clone)]
pub struct AeadStateCodec {
	current: u32,
	ciphers: BTreeMap<u32, Aes256Gcm>,
	purpose: String,
}
impl AeadStateCodec {
	/// Builds a codec from `keyring`, binding every value to `purpose`.
	pub fn new(keyring: &StateKeyring, purpose: impl Into<String>) -> Self {
		let ciphers = keyring
			.keys
			.iter()
			.map(|(version, key)| (*version, Aes256Gcm::new((&key.0).into())))
			.collect();

		Self { current: keyring.current, ciphers, purpose: purpose.into() }
	}

	/// Purpose string used as associated data.
	pub fn purpose(&self) -> &str {
		&self.purpose
	}
}
impl StateCodec for AeadStateCodec {
	fn protect(&self, properties: &AuthenticationProperties) -> Result<String, StateError> {
		let version = self.current;
		let cipher = self.ciphers.get(&version).ok_or(StateError::UnknownKeyVersion { version })?;
		let payload = serde_json::to_vec(properties)?;
		let mut nonce = [0_u8; NONCE_LEN];

		rand::rng().fill_bytes(&mut nonce);

		let sealed = cipher
			.encrypt(
				Nonce::from_slice(&nonce),
				Payload { msg: &payload, aad: self.purpose.as_bytes() },
			)
			.map_err(|_| StateError::Encrypt)?;
		let mut raw = Vec::with_capacity(NONCE_LEN + sealed.len());

		raw.extend_from_slice(&nonce);
		raw.extend_from_slice(&sealed);

		Ok(format!("v{version}.{}", URL_SAFE_NO_PAD.encode(raw)))
	}

	fn unprotect(&self, value: &str) -> Result<AuthenticationProperties, StateError> {
		let (version, encoded) =
			value.strip_prefix('v').and_then(|rest| rest.split_once('.')).ok_or(StateError::Malformed)?;

		if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
			return Err(StateError::Malformed);
		}

		let version = version.parse::<u32>().map_err(|_| StateError::Malformed)?;
		let cipher = self.ciphers.get(&version).ok_or(StateError::UnknownKeyVersion { version })?;
		let raw = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| StateError::Malformed)?;

		if raw.len() < NONCE_LEN + TAG_LEN {
			return Err(StateError::Malformed);
		}

		let (nonce, sealed) = raw.split_at(NONCE_LEN);
		let payload = cipher
			.decrypt(Nonce::from_slice(nonce), Payload { msg: sealed, aad: self.purpose.as_bytes() })
			.map_err(|_| StateError::Integrity)?;

		Ok(serde_json::from_slice(&payload)?)
	}
}
impl Debug for AeadStateCodec {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AeadStateCodec")
			.field("current", &self.current)
			.field("versions", &self.ciphers.keys().collect::<Vec<_>>())
			.field("purpose", &self.purpose)
			.finish()
	}
}

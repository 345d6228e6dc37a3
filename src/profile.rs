//! Mapping of the Yammer user/network document into a [`NormalizedIdentity`].

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{NormalizedIdentity, Secret},
	error::ProfileError,
};

/// Read-only provider profile document (`user`, `network`, ...).
///
/// The `access_token` member of the token response is stripped before wrapping so the bearer
/// secret never rides along in `Debug` output.
#[derive(Clone, PartialEq)]
pub struct RawProfile(Value);
impl RawProfile {
	/// Wraps a profile document.
	pub fn new(mut document: Value) -> Self {
		if let Value::Object(map) = &mut document {
			map.remove("access_token");
		}

		Self(document)
	}

	/// Underlying JSON document.
	pub fn as_json(&self) -> &Value {
		&self.0
	}

	/// The `user` object, if present.
	pub fn user(&self) -> Option<&Map<String, Value>> {
		self.0.get("user").and_then(Value::as_object)
	}

	/// The `network` object, if present.
	pub fn network(&self) -> Option<&Map<String, Value>> {
		self.0.get("network").and_then(Value::as_object)
	}

	/// Resolves a JSON pointer (`/user/contact/...`) against the document.
	pub fn pointer(&self, pointer: &str) -> Option<&Value> {
		self.0.pointer(pointer)
	}
}
impl Debug for RawProfile {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RawProfile")
			.field("user_id", &self.pointer("/user/id"))
			.field("network_id", &self.pointer("/network/id"))
			.finish()
	}
}

/// Builds a [`NormalizedIdentity`] from `profile`.
///
/// Only `user.id` is mandatory (string or number); every other field degrades to an empty
/// string or `None`.
pub fn map_profile(
	profile: &RawProfile,
	access_token: Secret,
) -> Result<NormalizedIdentity, ProfileError> {
	let id = profile
		.pointer("/user/id")
		.and_then(scalar_to_string)
		.filter(|id| !id.is_empty())
		.ok_or(ProfileError::MissingUserId)?;
	let email = profile
		.pointer("/user/contact/email_addresses/0/address")
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|email| !email.is_empty())
		.map(ToOwned::to_owned);

	Ok(NormalizedIdentity {
		id,
		name: string_at(profile, "/user/name"),
		full_name: string_at(profile, "/user/full_name"),
		email,
		job_title: string_at(profile, "/user/job_title"),
		network_name: string_at(profile, "/network/name"),
		network_id: profile.pointer("/network/id").and_then(integer),
		access_token,
	})
}

fn string_at(profile: &RawProfile, pointer: &str) -> String {
	profile.pointer(pointer).and_then(scalar_to_string).unwrap_or_default()
}

fn scalar_to_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

fn integer(value: &Value) -> Option<i64> {
	match value {
		Value::Number(n) => n.as_i64(),
		Value::String(s) => s.trim().parse().ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn token() -> Secret {
		Secret::new("tok1")
	}

	#[test]
	fn maps_full_profile() {
		let profile = RawProfile::new(json!({
			"access_token": { "token": "tok1" },
			"user": {
				"id": 1_488_374_236_u64,
				"name": "alice",
				"full_name": "Alice Example",
				"job_title": "Engineer",
				"contact": { "email_addresses": [
					{ "address": "alice@acme.test", "type": "primary" },
					{ "address": "alt@acme.test", "type": "other" }
				] }
			},
			"network": { "id": 7, "name": "Acme" }
		}));
		let identity = map_profile(&profile, token()).expect("Full profile should map.");

		assert_eq!(identity.id, "1488374236");
		assert_eq!(identity.name, "alice");
		assert_eq!(identity.full_name, "Alice Example");
		assert_eq!(identity.job_title, "Engineer");
		assert_eq!(identity.email.as_deref(), Some("alice@acme.test"));
		assert_eq!(identity.network_name, "Acme");
		assert_eq!(identity.network_id, Some(7));
		assert_eq!(identity.access_token.expose(), "tok1");
		assert!(profile.pointer("/access_token").is_none(), "Bearer token must be stripped.");
	}

	#[test]
	fn missing_user_id_is_fatal() {
		for document in [
			json!({ "user": { "name": "alice" }, "network": { "id": 7 } }),
			json!({ "user": { "id": null } }),
			json!({ "user": { "id": "" } }),
			json!({ "network": { "id": 7 } }),
			json!([]),
		] {
			assert_eq!(
				map_profile(&RawProfile::new(document), token()),
				Err(ProfileError::MissingUserId)
			);
		}
	}

	#[test]
	fn optional_fields_degrade() {
		let profile = RawProfile::new(json!({ "user": { "id": "42", "contact": {} } }));
		let identity = map_profile(&profile, token()).expect("Minimal profile should map.");

		assert_eq!(identity.id, "42");
		assert_eq!(identity.email, None);
		assert_eq!(identity.name, "");
		assert_eq!(identity.network_name, "");
		assert_eq!(identity.network_id, None);
	}

	#[test]
	fn debug_omits_profile_body() {
		let profile = RawProfile::new(json!({ "user": { "id": "42", "name": "secretive" } }));
		let rendered = format!("{profile:?}");

		assert!(rendered.contains("42"));
		assert!(!rendered.contains("secretive"));
	}
}

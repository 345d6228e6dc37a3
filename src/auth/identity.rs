//! Normalized identity materialized from a Yammer profile.

// self
use crate::{
	_prelude::*,
	auth::{Claim, ClaimType, ClaimsIdentity, Secret},
};

/// Provider-independent view of an authenticated Yammer user.
///
/// Created once per successful callback and never cached; the bearer token travels with it so
/// the `authenticated` hook can call the Yammer API on the user's behalf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedIdentity {
	/// Stable user identifier (`user.id`).
	pub id: String,
	/// User name (`user.name`).
	pub name: String,
	/// Display name (`user.full_name`).
	pub full_name: String,
	/// Primary email address, when the profile exposes one.
	pub email: Option<String>,
	/// Job title (`user.job_title`).
	pub job_title: String,
	/// Network name (`network.name`).
	pub network_name: String,
	/// Network identifier (`network.id`).
	pub network_id: Option<i64>,
	/// Bearer access token returned by the exchange.
	pub access_token: Secret,
}
impl NormalizedIdentity {
	/// Builds the claims issued for this identity under `authentication_type`.
	///
	/// The email claim is only emitted when an address is present and non-blank.
	pub fn to_claims_identity(&self, authentication_type: &str) -> ClaimsIdentity {
		let network_id = self.network_id.map(|id| id.to_string()).unwrap_or_default();
		let mut identity = ClaimsIdentity::new(authentication_type);

		for (kind, value) in [
			(ClaimType::NameIdentifier, self.id.as_str()),
			(ClaimType::Name, self.name.as_str()),
			(ClaimType::YammerId, self.id.as_str()),
			(ClaimType::YammerName, self.name.as_str()),
			(ClaimType::YammerNetworkName, self.network_name.as_str()),
			(ClaimType::YammerNetworkId, network_id.as_str()),
			(ClaimType::YammerJobTitle, self.job_title.as_str()),
		] {
			identity.add_claim(Claim::new(kind.as_str(), value, authentication_type));
		}

		if let Some(email) = self.email.as_deref().filter(|email| !email.trim().is_empty()) {
			identity.add_claim(Claim::new(ClaimType::Email.as_str(), email, authentication_type));
		}

		identity
	}
}

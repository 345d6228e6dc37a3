//! Claims-bearing identities consumed by the host's sign-in mechanism.

// self
use crate::_prelude::*;

/// Value type attached to every string claim.
pub const XML_SCHEMA_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Claim kinds emitted for a Yammer identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimType {
	/// Stable user identifier.
	NameIdentifier,
	/// User name.
	Name,
	/// Primary email address.
	Email,
	/// Yammer user id.
	YammerId,
	/// Yammer user name.
	YammerName,
	/// Yammer network name.
	YammerNetworkName,
	/// Yammer network id.
	YammerNetworkId,
	/// Yammer job title.
	YammerJobTitle,
}
impl ClaimType {
	/// Returns the claim type URI.
	pub const fn as_str(self) -> &'static str {
		match self {
			ClaimType::NameIdentifier =>
				"http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier",
			ClaimType::Name => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name",
			ClaimType::Email => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress",
			ClaimType::YammerId => "urn:yammer:id",
			ClaimType::YammerName => "urn:yammer:name",
			ClaimType::YammerNetworkName => "urn:yammer:networkname",
			ClaimType::YammerNetworkId => "urn:yammer:networkid",
			ClaimType::YammerJobTitle => "urn:yammer:jobtitle",
		}
	}
}
impl Display for ClaimType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Single key/value assertion about an identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
	/// Claim type URI.
	pub kind: String,
	/// Claim value.
	pub value: String,
	/// Claim value type URI.
	pub value_type: String,
	/// Authority that issued the claim.
	pub issuer: String,
}
impl Claim {
	/// Creates a string-typed claim.
	pub fn new(kind: impl Into<String>, value: impl Into<String>, issuer: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			value: value.into(),
			value_type: XML_SCHEMA_STRING.into(),
			issuer: issuer.into(),
		}
	}
}

/// Set of claims tagged with the authentication type that produced them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsIdentity {
	/// Authentication type (scheme) that issued the identity.
	pub authentication_type: String,
	/// Claims in issue order.
	pub claims: Vec<Claim>,
}
impl ClaimsIdentity {
	/// Creates an empty identity for `authentication_type`.
	pub fn new(authentication_type: impl Into<String>) -> Self {
		Self { authentication_type: authentication_type.into(), claims: Vec::new() }
	}

	/// Appends a claim.
	pub fn add_claim(&mut self, claim: Claim) {
		self.claims.push(claim);
	}

	/// Returns the first claim value of `kind`.
	pub fn find_first(&self, kind: &str) -> Option<&str> {
		self.claims.iter().find(|claim| claim.kind == kind).map(|claim| claim.value.as_str())
	}

	/// Value of the name claim.
	pub fn name(&self) -> Option<&str> {
		self.find_first(ClaimType::Name.as_str())
	}

	/// Copies the claims under a different authentication type.
	pub fn retyped(&self, authentication_type: impl Into<String>) -> Self {
		Self { authentication_type: authentication_type.into(), claims: self.claims.clone() }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn find_first_returns_earliest_claim() {
		let mut identity = ClaimsIdentity::new("Yammer");

		identity.add_claim(Claim::new(ClaimType::Name.as_str(), "alice", "Yammer"));
		identity.add_claim(Claim::new(ClaimType::Name.as_str(), "bob", "Yammer"));

		assert_eq!(identity.name(), Some("alice"));
		assert_eq!(identity.claims[0].value_type, XML_SCHEMA_STRING);
		assert_eq!(identity.find_first(ClaimType::Email.as_str()), None);
	}

	#[test]
	fn retyped_keeps_claims() {
		let mut identity = ClaimsIdentity::new("Yammer");

		identity.add_claim(Claim::new(ClaimType::YammerId.as_str(), "42", "Yammer"));

		let retyped = identity.retyped("ExternalCookie");

		assert_eq!(retyped.authentication_type, "ExternalCookie");
		assert_eq!(retyped.claims, identity.claims);
	}
}

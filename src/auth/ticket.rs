//! Terminal artifact of the callback phase.

// self
use crate::{
	_prelude::*,
	auth::{AuthenticationProperties, ClaimsIdentity},
};

/// Pairing of an optional claims identity with the properties recovered from `state`.
///
/// A ticket without identity is an explicit rejection: the provider answered, but the flow
/// refused to sign the user in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticationTicket {
	/// Issued identity; `None` when the flow rejected the callback.
	pub identity: Option<ClaimsIdentity>,
	/// Properties recovered from `state`.
	pub properties: AuthenticationProperties,
}
impl AuthenticationTicket {
	/// Creates a ticket carrying an identity.
	pub fn authenticated(identity: ClaimsIdentity, properties: AuthenticationProperties) -> Self {
		Self { identity: Some(identity), properties }
	}

	/// Creates a ticket that carries properties but no identity.
	pub fn rejected(properties: AuthenticationProperties) -> Self {
		Self { identity: None, properties }
	}

	/// Returns true when the ticket carries an identity.
	pub fn is_authenticated(&self) -> bool {
		self.identity.is_some()
	}
}

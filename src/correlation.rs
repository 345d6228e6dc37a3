//! Single-use correlation tokens binding a callback to the challenge that started it.

// crates.io
use oauth2::CsrfToken;
use subtle::ConstantTimeEq;
// self
use crate::{
	_prelude::*,
	auth::AuthenticationProperties,
	host::{InboundRequest, ResponseSink},
};

const TOKEN_BYTES: u32 = 32;

/// Issues and validates correlation tokens under a fixed side-channel name.
#[derive(Clone, Debug)]
pub struct CorrelationGuard {
	name: String,
}
impl CorrelationGuard {
	/// Creates a guard retaining tokens under `name`.
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into() }
	}

	/// Side-channel name the token is retained under.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Generates a fresh token, embeds it in `properties`, and retains a copy through `response`.
	pub fn issue(&self, properties: &mut AuthenticationProperties, response: &mut dyn ResponseSink) {
		let token = CsrfToken::new_random_len(TOKEN_BYTES);

		response.retain_correlation(&self.name, token.secret());
		properties.set_correlation_id(token.into_secret());
	}

	/// Checks the embedded token against the retained copy.
	///
	/// The retained copy is discarded whatever the outcome and the embedded token is removed from
	/// `properties`, so a token can never validate twice.
	pub fn validate(
		&self,
		properties: &mut AuthenticationProperties,
		request: &dyn InboundRequest,
		response: &mut dyn ResponseSink,
	) -> bool {
		let retained = request.correlation(&self.name);
		let embedded = properties.take_correlation_id();

		response.discard_correlation(&self.name);

		match (retained, embedded) {
			(Some(retained), Some(embedded)) if !retained.is_empty() =>
				bool::from(retained.as_bytes().ct_eq(embedded.as_bytes())),
			_ => false,
		}
	}
}

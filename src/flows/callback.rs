//! Callback phase: validate `state`, exchange the code, and issue the identity.

// std
use std::mem;
// self
use crate::{
	_prelude::*,
	auth::{AuthenticationProperties, AuthenticationTicket, ClaimsIdentity},
	error::CallbackError,
	events::AuthenticatedContext,
	exchange::{TokenRequest, TransportErrorMapper},
	flows::{SignInHandler, common},
	host::{InboundRequest, ResponseSink},
	http::TokenHttpClient,
	obs::{self, FlowOutcome, FlowSpan, FlowStage},
	profile,
};

const STAGE: FlowStage = FlowStage::Callback;

impl<C, M> SignInHandler<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Authenticates a provider callback.
	///
	/// - `None`: `state` is missing, repeated, or fails to unprotect.
	/// - Ticket without identity: correlation mismatch, malformed `code`, or any exchange,
	///   profile, or hook failure.
	/// - Ticket with identity: the user is authenticated.
	///
	/// Failures are logged and never returned; the correlation value is consumed in every case
	/// where `state` could be read.
	pub async fn authenticate(
		&self,
		request: &dyn InboundRequest,
		response: &mut dyn ResponseSink,
	) -> Option<AuthenticationTicket> {
		let span = FlowSpan::new(STAGE);

		span.instrument(self.authenticate_callback(request, response)).await
	}

	async fn authenticate_callback(
		&self,
		request: &dyn InboundRequest,
		response: &mut dyn ResponseSink,
	) -> Option<AuthenticationTicket> {
		obs::log_stage(STAGE, "Authenticating provider callback.");
		obs::record_flow_outcome(STAGE, FlowOutcome::Attempt);

		let state = match common::single_query_value(request, "state") {
			Ok(state) => state,
			Err(e) => {
				obs::log_failure(STAGE, "Callback carries no usable state.", &e);
				obs::record_flow_outcome(STAGE, FlowOutcome::Aborted);

				return None;
			},
		};
		let mut properties = match self.state_codec.unprotect(&state) {
			Ok(properties) => properties,
			Err(e) => {
				obs::log_failure(STAGE, "Callback state failed to unprotect.", &e);
				obs::record_flow_outcome(STAGE, FlowOutcome::Aborted);

				return None;
			},
		};

		if !self.correlation.validate(&mut properties, request, response) {
			obs::log_failure(STAGE, "Callback rejected.", &Error::CorrelationMismatch);
			obs::record_flow_outcome(STAGE, FlowOutcome::Rejected);

			return Some(AuthenticationTicket::rejected(properties));
		}

		match self.issue_identity(request, &mut properties).await {
			Ok(identity) => {
				obs::record_flow_outcome(STAGE, FlowOutcome::Success);

				Some(AuthenticationTicket::authenticated(identity, properties))
			},
			Err(e) => {
				obs::log_failure(STAGE, "Authentication failed.", &e);
				obs::record_flow_outcome(STAGE, FlowOutcome::Rejected);

				Some(AuthenticationTicket::rejected(properties))
			},
		}
	}

	async fn issue_identity(
		&self,
		request: &dyn InboundRequest,
		properties: &mut AuthenticationProperties,
	) -> Result<ClaimsIdentity> {
		let code = common::single_query_value(request, "code").map_err(|e| {
			match request.query_values("error").into_iter().next() {
				Some(error) => CallbackError::ProviderError { error },
				None => e,
			}
		})?;
		let redirect_uri = common::redirect_uri(request, &self.options.callback_path);

		obs::log_stage(STAGE, "Exchanging authorization code.");

		let token = self
			.exchange
			.exchange(
				TokenRequest {
					code: &code,
					redirect_uri: &redirect_uri,
					client_id: &self.options.client_id,
					client_secret: &self.options.client_secret,
				},
				&request.cancellation(),
			)
			.await?;
		let identity = profile::map_profile(&token.profile, token.access_token)?;
		let claims = identity.to_claims_identity(&self.options.authentication_type);
		let mut context =
			AuthenticatedContext { identity, claims, properties: mem::take(properties) };
		let outcome = self.events.authenticated(&mut context).await;

		*properties = context.properties;

		outcome.map_err(Error::hook)?;

		Ok(context.claims)
	}
}

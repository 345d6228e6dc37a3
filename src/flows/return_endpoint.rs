//! Return phase: hook dispatch, sign-in, and the final redirect.

// self
use crate::{
	auth::AuthenticationTicket,
	events::ReturnEndpointContext,
	exchange::TransportErrorMapper,
	flows::{SignInHandler, common},
	host::{InboundRequest, ResponseSink},
	http::TokenHttpClient,
	obs::{self, FlowOutcome, FlowSpan, FlowStage},
};

const STAGE: FlowStage = FlowStage::ReturnEndpoint;

impl<C, M> SignInHandler<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Handles the request when it targets the callback path.
	///
	/// Returns `false` without touching `response` for every other path; otherwise returns
	/// whether the callback completed the request.
	pub async fn invoke(&self, request: &dyn InboundRequest, response: &mut dyn ResponseSink) -> bool {
		if request.path() != self.options.callback_path {
			return false;
		}

		self.invoke_return_path(request, response).await
	}

	/// Authenticates the callback and completes it with sign-in and a redirect.
	///
	/// A rejected callback redirects to the original target with `error=access_denied`
	/// appended. When `state` could not be recovered there is no target; the response is left
	/// alone and `false` is returned unless the `return_endpoint` hook completes the request.
	pub async fn invoke_return_path(
		&self,
		request: &dyn InboundRequest,
		response: &mut dyn ResponseSink,
	) -> bool {
		let ticket = self.authenticate(request, response).await;
		let span = FlowSpan::new(STAGE);

		span.instrument(self.complete_return(ticket, response)).await
	}

	async fn complete_return(
		&self,
		ticket: Option<AuthenticationTicket>,
		response: &mut dyn ResponseSink,
	) -> bool {
		obs::record_flow_outcome(STAGE, FlowOutcome::Attempt);

		let (identity, properties) = match ticket {
			Some(ticket) => (ticket.identity, Some(ticket.properties)),
			None => (None, None),
		};
		let mut context = ReturnEndpointContext::new(identity, properties, self.options.sign_in_as());

		if let Err(e) = self.events.return_endpoint(&mut context).await {
			obs::log_failure(STAGE, "Return endpoint hook failed.", e.as_ref());
		}
		if !context.is_request_completed() {
			if let (Some(identity), Some(sign_in_as)) =
				(context.identity.as_ref(), context.sign_in_as.as_deref())
			{
				let identity = if identity.authentication_type == sign_in_as {
					identity.clone()
				} else {
					identity.retyped(sign_in_as)
				};

				response.sign_in(identity, context.properties.clone().unwrap_or_default());
			}
			if let Some(target) = context.redirect_uri.take() {
				let location = if context.identity.is_none() {
					common::add_query_string(&target, "error", "access_denied")
				} else {
					target
				};

				response.redirect(&location);
				context.redirect_uri = Some(location);
				context.complete();
			}
		}

		let completed = context.is_request_completed();

		if completed {
			obs::record_flow_outcome(STAGE, FlowOutcome::Success);
		} else {
			obs::log_stage(STAGE, "Callback left the request to the host.");
			obs::record_flow_outcome(STAGE, FlowOutcome::Aborted);
		}

		completed
	}
}

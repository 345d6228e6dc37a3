//! Application hooks invoked during the callback phase.
//!
//! Implement [`AuthenticationEvents`] to inspect or enrich an issued identity and to take over the
//! final redirect. Both methods default to no-ops, so [`DefaultAuthenticationEvents`] is the
//! implementation used when the host registers nothing.

// self
use crate::{
	_prelude::*,
	auth::{AuthenticationProperties, ClaimsIdentity, NormalizedIdentity},
	error::BoxError,
};

/// Future returned by [`AuthenticationEvents`] hooks.
pub type EventFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BoxError>> + 'a + Send>>;

/// Hooks the embedding application can override.
pub trait AuthenticationEvents
where
	Self: Send + Sync,
{
	/// Runs once per successful exchange, before the ticket is produced.
	///
	/// Claims added to [`AuthenticatedContext::claims`] land on the issued identity. Returning an
	/// error rejects the callback.
	fn authenticated<'a>(&'a self, _context: &'a mut AuthenticatedContext) -> EventFuture<'a> {
		Box::pin(async { Ok(()) })
	}

	/// Runs once per callback after the ticket is produced, before sign-in and the final redirect.
	///
	/// Errors are logged and otherwise ignored.
	fn return_endpoint<'a>(&'a self, _context: &'a mut ReturnEndpointContext) -> EventFuture<'a> {
		Box::pin(async { Ok(()) })
	}
}

impl<T> AuthenticationEvents for Arc<T>
where
	T: ?Sized + AuthenticationEvents,
{
	fn authenticated<'a>(&'a self, context: &'a mut AuthenticatedContext) -> EventFuture<'a> {
		(**self).authenticated(context)
	}

	fn return_endpoint<'a>(&'a self, context: &'a mut ReturnEndpointContext) -> EventFuture<'a> {
		(**self).return_endpoint(context)
	}
}

/// No-op hooks.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAuthenticationEvents;
impl AuthenticationEvents for DefaultAuthenticationEvents {}

/// State handed to [`AuthenticationEvents::authenticated`].
#[derive(Clone, Debug)]
pub struct AuthenticatedContext {
	/// Identity mapped from the provider profile, bearer token included.
	pub identity: NormalizedIdentity,
	/// Claims that will be issued.
	pub claims: ClaimsIdentity,
	/// Properties recovered from `state`.
	pub properties: AuthenticationProperties,
}

/// State handed to [`AuthenticationEvents::return_endpoint`].
#[derive(Clone, Debug)]
pub struct ReturnEndpointContext {
	/// Issued identity, or `None` when the callback was rejected.
	pub identity: Option<ClaimsIdentity>,
	/// Properties recovered from `state`, with the redirect target moved into
	/// [`redirect_uri`](Self::redirect_uri). `None` when `state` could not be recovered.
	pub properties: Option<AuthenticationProperties>,
	/// Authentication type the identity is signed in as; clear it to skip sign-in.
	pub sign_in_as: Option<String>,
	/// Final redirect target; override it to send the user elsewhere.
	pub redirect_uri: Option<String>,
	request_completed: bool,
}
impl ReturnEndpointContext {
	pub(crate) fn new(
		identity: Option<ClaimsIdentity>,
		properties: Option<AuthenticationProperties>,
		sign_in_as: impl Into<String>,
	) -> Self {
		let mut properties = properties;
		let redirect_uri = properties.as_mut().and_then(|properties| properties.redirect_uri.take());

		Self {
			identity,
			properties,
			sign_in_as: Some(sign_in_as.into()),
			redirect_uri,
			request_completed: false,
		}
	}

	/// Marks the request as fully handled; the handler then neither signs in nor redirects.
	pub fn complete(&mut self) {
		self.request_completed = true;
	}

	/// Whether [`complete`](Self::complete) was called.
	pub fn is_request_completed(&self) -> bool {
		self.request_completed
	}
}

//! Sign-in handler orchestrating the challenge, callback, and return phases.

mod callback;
mod challenge;
mod common;
mod return_endpoint;

pub use common::add_query_string;

// self
use crate::{
	_prelude::*,
	config::SignInOptions,
	correlation::CorrelationGuard,
	events::{AuthenticationEvents, DefaultAuthenticationEvents},
	exchange::{TokenExchangeClient, TransportErrorMapper},
	http::TokenHttpClient,
	state::{AeadStateCodec, StateCodec, StateKeyring},
};
#[cfg(feature = "reqwest")]
use crate::{exchange::ReqwestTransportErrorMapper, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Handler specialized for the crate's default reqwest transport stack.
pub type ReqwestSignInHandler = SignInHandler<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Yammer sign-in handler.
///
/// One handler serves every request for a single authentication type. It holds only read-only
/// configuration, key material, and the shared backchannel transport, so it can be cloned or
/// wrapped in an [`Arc`] and used concurrently.
pub struct SignInHandler<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	options: Arc<SignInOptions>,
	state_codec: Arc<dyn StateCodec>,
	events: Arc<dyn AuthenticationEvents>,
	exchange: Arc<TokenExchangeClient<C, M>>,
	correlation: CorrelationGuard,
}
impl<C, M> SignInHandler<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a handler that reuses the caller-provided transport + mapper pair.
	///
	/// `options` are validated here; this is the only place a [`ConfigError`] can surface.
	///
	/// [`ConfigError`]: crate::error::ConfigError
	pub fn with_http_client(
		options: SignInOptions,
		keyring: StateKeyring,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		options.validate()?;

		let exchange = TokenExchangeClient::new(options.endpoints.token.clone(), http_client, mapper)
			.with_timeout(options.backchannel_timeout)
			.with_max_response_bytes(options.max_response_bytes);

		Ok(Self {
			state_codec: Arc::new(AeadStateCodec::new(&keyring, options.state_purpose())),
			events: Arc::new(DefaultAuthenticationEvents),
			exchange: Arc::new(exchange),
			correlation: CorrelationGuard::new(options.correlation_name()),
			options: Arc::new(options),
		})
	}

	/// Installs application hooks.
	pub fn with_events(mut self, events: impl 'static + AuthenticationEvents) -> Self {
		self.events = Arc::new(events);

		self
	}

	/// Replaces the default AES-GCM state codec.
	pub fn with_state_codec(mut self, codec: impl 'static + StateCodec) -> Self {
		self.state_codec = Arc::new(codec);

		self
	}

	/// Validated options the handler runs with.
	pub fn options(&self) -> &SignInOptions {
		&self.options
	}
}
#[cfg(feature = "reqwest")]
impl SignInHandler<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a handler with its own reqwest transport built from `options`.
	pub fn new(options: SignInOptions, keyring: StateKeyring) -> Result<Self> {
		let http_client = ReqwestHttpClient::from_options(&options)?;

		Self::with_http_client(options, keyring, http_client, Arc::new(ReqwestTransportErrorMapper))
	}
}
impl<C, M> Clone for SignInHandler<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			options: Arc::clone(&self.options),
			state_codec: Arc::clone(&self.state_codec),
			events: Arc::clone(&self.events),
			exchange: Arc::clone(&self.exchange),
			correlation: self.correlation.clone(),
		}
	}
}
impl<C, M> Debug for SignInHandler<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignInHandler")
			.field("authentication_type", &self.options.authentication_type)
			.field("client_id", &self.options.client_id)
			.field("callback_path", &self.options.callback_path)
			.field("exchange", &self.exchange)
			.finish()
	}
}

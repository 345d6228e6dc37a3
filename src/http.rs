//! Backchannel transport primitives for the token exchange.
//!
//! The module exposes [`TokenHttpClient`] alongside [`ResponseMetadata`] and
//! [`ResponseMetadataSlot`] so hosts can plug in their own HTTP stack without losing the
//! exchange's error classification. Implementations call [`ResponseMetadataSlot::take`] before
//! dispatching a request and [`ResponseMetadataSlot::store`] once an HTTP status is known or the
//! body cap trips, letting the [`TransportErrorMapper`](crate::exchange::TransportErrorMapper)
//! classify failures with consistent metadata.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")]
use crate::{
	config::{DEFAULT_MAX_RESPONSE_BYTES, SignInOptions},
	error::ConfigError,
};

/// Abstraction over HTTP transports capable of executing the backchannel token exchange.
///
/// The trait is the handler's only dependency on an HTTP stack. Implementations are shared
/// across concurrent requests (`Send + Sync + 'static`) and configured once at startup; each
/// exchange asks for a short-lived [`AsyncHttpClient`] handle carrying a fresh
/// [`ResponseMetadataSlot`]. Handles must own whatever state they need so request futures stay
/// `Send`.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting the HTTP request.
	/// - Once a response provides a status, or the body exceeds the transport's cap, save it with
	///   [`ResponseMetadataSlot::store`].
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if available.
	pub status: Option<u16>,
	/// Body cap that the response exceeded, if the transport aborted the read.
	pub body_limit_exceeded: Option<usize>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Reqwest-backed [`TokenHttpClient`] with a response body cap.
///
/// Token endpoints answer directly, so the client built by [`ReqwestHttpClient::from_options`]
/// never follows redirects; configure any custom [`ReqwestClient`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient {
	client: ReqwestClient,
	max_response_bytes: usize,
}
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`] with the default body cap.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES }
	}

	/// Builds the backchannel client described by `options` (timeout, certificate validation,
	/// body cap, no redirects).
	pub fn from_options(options: &SignInOptions) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(options.backchannel_timeout.unsigned_abs())
			.redirect(reqwest::redirect::Policy::none())
			.danger_accept_invalid_certs(options.backchannel_accept_invalid_certs)
			.build()?;

		Ok(Self { client, max_response_bytes: options.max_response_bytes })
	}

	/// Overrides the body cap.
	pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
		self.max_response_bytes = limit;

		self
	}

	/// Body cap applied while reading responses.
	pub fn max_response_bytes(&self) -> usize {
		self.max_response_bytes
	}
}
#[cfg(feature = "reqwest")]
impl Default for ReqwestHttpClient {
	fn default() -> Self {
		Self::with_client(ReqwestClient::default())
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.client
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.client
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		InstrumentedHandle(Arc::new(InstrumentedHttpClient {
			client: self.client.clone(),
			max_response_bytes: self.max_response_bytes,
			slot,
		}))
	}
}

#[cfg(feature = "reqwest")]
struct InstrumentedHttpClient {
	client: ReqwestClient,
	max_response_bytes: usize,
	slot: ResponseMetadataSlot,
}

/// Handle returned by [`ReqwestHttpClient`] that satisfies [`TokenHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let mut response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let limit = client.max_response_bytes;
			let exceeded = |slot: &ResponseMetadataSlot| {
				slot.store(ResponseMetadata {
					status: Some(status.as_u16()),
					body_limit_exceeded: Some(limit),
				});

				HttpClientError::Other(format!("Response body exceeds {limit} bytes."))
			};

			if response.content_length().is_some_and(|len| len > limit as u64) {
				return Err(exceeded(&client.slot));
			}

			let mut body = Vec::new();

			while let Some(chunk) = response.chunk().await.map_err(Box::new)? {
				if body.len() + chunk.len() > limit {
					return Err(exceeded(&client.slot));
				}

				body.extend_from_slice(&chunk);
			}

			client
				.slot
				.store(ResponseMetadata { status: Some(status.as_u16()), body_limit_exceeded: None });

			let mut response_new = HttpResponse::new(body);

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

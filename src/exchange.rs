//! Backchannel authorization-code exchange against the token endpoint.
//!
//! [`TokenExchangeClient`] posts the form-encoded grant through a [`TokenHttpClient`] handle,
//! racing the inbound request's cancellation signal and the configured timeout. Every failure
//! is surfaced as a [`TokenExchangeError`] whose variant records the cause for logging; the
//! flow treats all of them alike.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
use serde_json::Value;
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::Secret,
	error::TokenExchangeError,
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	profile::RawProfile,
};

/// Maps HTTP transport failures into [`TokenExchangeError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> TokenExchangeError;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> TokenExchangeError {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => TokenExchangeError::Request(inner),
			HttpClientError::Io(inner) => TokenExchangeError::transport(inner),
			HttpClientError::Other(message) => TokenExchangeError::transport(format!(
				"HTTP client error occurred while calling the token endpoint: {message}."
			)),
			_ => TokenExchangeError::transport(
				"HTTP client error occurred while calling the token endpoint.",
			),
		}
	}
}

/// Parameters of a single authorization-code exchange.
#[derive(Clone, Copy, Debug)]
pub struct TokenRequest<'a> {
	/// Authorization code from the callback.
	pub code: &'a str,
	/// Redirect URI, byte-for-byte identical to the one sent at challenge time.
	pub redirect_uri: &'a str,
	/// OAuth 2.0 client identifier.
	pub client_id: &'a str,
	/// OAuth 2.0 client secret.
	pub client_secret: &'a Secret,
}

/// Parsed token endpoint response.
#[derive(Clone, Debug)]
pub struct TokenResponse {
	/// Bearer access token (`access_token.token`).
	pub access_token: Secret,
	/// Token type, when the provider reports one.
	pub token_type: Option<String>,
	/// Provider-formatted expiry, when the provider reports one.
	pub expires_at: Option<String>,
	/// User/network profile document delivered alongside the token.
	pub profile: RawProfile,
}

/// Performs the backchannel `authorization_code` grant.
pub struct TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	token_endpoint: Url,
	timeout: Duration,
	max_response_bytes: usize,
}
impl<C, M> TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client posting to `token_endpoint`.
	pub fn new(
		token_endpoint: Url,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
			token_endpoint,
			timeout: crate::config::DEFAULT_BACKCHANNEL_TIMEOUT,
			max_response_bytes: crate::config::DEFAULT_MAX_RESPONSE_BYTES,
		}
	}

	/// Overrides the timeout applied to each exchange.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the response body cap.
	pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
		self.max_response_bytes = limit;

		self
	}

	/// Exchanges `request.code` for an access token.
	///
	/// The call resolves early with [`TokenExchangeError::Cancelled`] once `cancellation` fires,
	/// and with [`TokenExchangeError::Timeout`] once the configured timeout elapses, whichever
	/// comes first.
	pub async fn exchange(
		&self,
		request: TokenRequest<'_>,
		cancellation: &CancellationToken,
	) -> Result<TokenResponse, TokenExchangeError> {
		let body = form_urlencoded::Serializer::new(String::new())
			.append_pair("client_id", request.client_id)
			.append_pair("client_secret", request.client_secret.expose())
			.append_pair("grant_type", "authorization_code")
			.append_pair("redirect_uri", request.redirect_uri)
			.append_pair("code", request.code)
			.finish();
		let http_request = Request::builder()
			.method(Method::POST)
			.uri(self.token_endpoint.as_str())
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.header(ACCEPT, "application/json")
			.body(body.into_bytes())?;
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let outcome = tokio::select! {
			biased;
			_ = cancellation.cancelled() => return Err(TokenExchangeError::Cancelled),
			outcome = tokio::time::timeout(self.timeout.unsigned_abs(), handle.call(http_request)) =>
				outcome,
		};
		let response = match outcome {
			Ok(Ok(response)) => response,
			Ok(Err(err)) => return Err(self.map_request_error(meta.take(), err)),
			Err(_) => return Err(TokenExchangeError::Timeout { timeout: Some(self.timeout) }),
		};

		parse_token_response(&response, self.max_response_bytes)
	}

	fn map_request_error(
		&self,
		meta: Option<ResponseMetadata>,
		err: HttpClientError<C::TransportError>,
	) -> TokenExchangeError {
		if let Some(limit) = meta.as_ref().and_then(|value| value.body_limit_exceeded) {
			return TokenExchangeError::ResponseTooLarge { limit };
		}

		self.error_mapper.map_transport_error(meta.as_ref(), err)
	}
}
impl<C, M> Debug for TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchangeClient")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("timeout", &self.timeout)
			.field("max_response_bytes", &self.max_response_bytes)
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenDocument {
	access_token: Option<AccessTokenBody>,
}

#[derive(Deserialize)]
struct AccessTokenBody {
	token: Option<String>,
	token_type: Option<String>,
	expires_at: Option<Value>,
}

/// Validates and parses a raw token endpoint response.
pub fn parse_token_response(
	response: &HttpResponse,
	max_response_bytes: usize,
) -> Result<TokenResponse, TokenExchangeError> {
	let status = response.status();

	if !status.is_success() {
		return Err(TokenExchangeError::Status { status: status.as_u16() });
	}
	if response.body().len() > max_response_bytes {
		return Err(TokenExchangeError::ResponseTooLarge { limit: max_response_bytes });
	}

	let parse_error =
		|source| TokenExchangeError::Parse { source, status: Some(status.as_u16()) };
	let document: Value = serde_path_to_error::deserialize(
		&mut serde_json::Deserializer::from_slice(response.body()),
	)
	.map_err(parse_error)?;
	let typed: TokenDocument = serde_path_to_error::deserialize(&document).map_err(parse_error)?;
	let body = typed.access_token.ok_or(TokenExchangeError::MissingAccessToken)?;
	let token = body
		.token
		.filter(|token| !token.trim().is_empty())
		.ok_or(TokenExchangeError::MissingAccessToken)?;
	let expires_at = body.expires_at.and_then(|value| match value {
		Value::String(s) => Some(s),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	});

	Ok(TokenResponse {
		access_token: Secret::new(token),
		token_type: body.token_type,
		expires_at,
		profile: RawProfile::new(document),
	})
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> TokenExchangeError {
	if err.is_timeout() {
		return TokenExchangeError::Timeout { timeout: None };
	}
	let status = meta.and_then(|value| value.status).or_else(|| err.status().map(|s| s.as_u16()));

	if let Some(status) = status.filter(|status| !(200..300).contains(status)) {
		return TokenExchangeError::Status { status };
	}

	TokenExchangeError::transport(err)
}

//! Sign-in error types shared across the challenge, callback, and return phases.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error used for transport and hook failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical sign-in error exposed by public APIs.
///
/// Only [`Error::Config`] ever reaches the host; every other variant is raised inside the callback
/// phase, logged, and converted into a ticket without identity.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Callback query string is malformed.
	#[error(transparent)]
	Callback(#[from] CallbackError),
	/// The `state` parameter could not be unprotected.
	#[error(transparent)]
	State(#[from] StateError),
	/// Backchannel code exchange failed.
	#[error(transparent)]
	TokenExchange(#[from] TokenExchangeError),
	/// Provider profile lacks mandatory fields.
	#[error(transparent)]
	Profile(#[from] ProfileError),

	/// Correlation token embedded in the state does not match the retained copy.
	#[error("Correlation token validation failed.")]
	CorrelationMismatch,
	/// The `authenticated` hook rejected the identity.
	#[error("Authentication hook failed.")]
	Hook {
		/// Failure returned by the hook.
		#[source]
		source: BoxError,
	},
}
impl Error {
	/// Wraps a hook failure.
	pub fn hook(src: impl Into<BoxError>) -> Self {
		Self::Hook { source: src.into() }
	}
}

/// Configuration and validation failures raised while constructing a handler.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// `client_id` is blank.
	#[error("The client_id option must be provided.")]
	MissingClientId,
	/// `client_secret` is blank.
	#[error("The client_secret option must be provided.")]
	MissingClientSecret,
	/// `authentication_type` is blank.
	#[error("The authentication_type option must be provided.")]
	MissingAuthenticationType,
	/// Callback path is not an absolute path.
	#[error("Callback path must start with `/`: {path}.")]
	InvalidCallbackPath {
		/// Offending callback path.
		path: String,
	},
	/// Provider endpoint must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Backchannel timeout is zero or negative.
	#[error("The backchannel timeout must be positive.")]
	NonPositiveTimeout,
	/// Response size cap is zero.
	#[error("The backchannel response size cap must be positive.")]
	ZeroResponseCap,
	/// State key material is not 32 bytes of base64.
	#[error("State key must be 32 bytes encoded as base64.")]
	InvalidStateKey,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Malformed callback query strings.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CallbackError {
	/// Parameter absent from the query string.
	#[error("Callback is missing the `{name}` parameter.")]
	MissingParameter {
		/// Parameter name.
		name: &'static str,
	},
	/// Parameter supplied more than once.
	#[error("Callback supplied the `{name}` parameter {count} times.")]
	DuplicateParameter {
		/// Parameter name.
		name: &'static str,
		/// Number of occurrences.
		count: usize,
	},
	/// Provider redirected back with an `error` instead of a code.
	#[error("Provider returned `{error}` instead of an authorization code.")]
	ProviderError {
		/// Value of the `error` parameter.
		error: String,
	},
}

/// Failures raised while protecting or unprotecting the `state` parameter.
#[derive(Debug, ThisError)]
pub enum StateError {
	/// Value does not follow the `v<version>.<payload>` layout.
	#[error("State value is malformed.")]
	Malformed,
	/// Value was protected with a key version this keyring does not hold.
	#[error("State was protected with unknown key version {version}.")]
	UnknownKeyVersion {
		/// Version tag carried by the value.
		version: u32,
	},
	/// Authenticated decryption failed (tampered or foreign value).
	#[error("State failed integrity validation.")]
	Integrity,
	/// Encryption failed.
	#[error("State could not be encrypted.")]
	Encrypt,
	/// Properties could not be (de)serialized.
	#[error("State payload could not be (de)serialized.")]
	Payload(#[from] serde_json::Error),
}

/// Backchannel token exchange failures.
#[derive(Debug, ThisError)]
pub enum TokenExchangeError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Transport {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request could not be assembled.
	#[error("Token request could not be built.")]
	Request(#[from] oauth2::http::Error),
	/// Backchannel timeout elapsed.
	#[error("Token endpoint did not respond in time.")]
	Timeout {
		/// Timeout that elapsed, when the layer enforcing it knows the value.
		timeout: Option<Duration>,
	},
	/// Inbound request was cancelled while the exchange was in flight.
	#[error("Token exchange was cancelled.")]
	Cancelled,
	/// Token endpoint answered with a non-success status.
	#[error("Token endpoint returned HTTP status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
	},
	/// Token endpoint body exceeded the configured cap.
	#[error("Token endpoint response exceeds {limit} bytes.")]
	ResponseTooLarge {
		/// Configured cap in bytes.
		limit: usize,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint response lacks `access_token.token` or it is blank.
	#[error("Token endpoint response is missing the access token.")]
	MissingAccessToken,
}
impl TokenExchangeError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl Into<BoxError>) -> Self {
		Self::Transport { source: src.into() }
	}
}

/// Provider profile documents missing mandatory fields.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProfileError {
	/// `user.id` is absent or not a string/number.
	#[error("The user does not have an id.")]
	MissingUserId,
}

//! Handler configuration.
//!
//! [`SignInOptions`] deserializes from host configuration (every field except the client
//! credentials has a default) or is assembled with [`SignInOptions::builder`]. Validation runs
//! once when the handler is constructed; nothing is re-checked per request.

// self
use crate::{_prelude::*, auth::ScopeSet, auth::Secret, error::ConfigError};

/// Default scheme name stamped on issued identities.
pub const DEFAULT_AUTHENTICATION_TYPE: &str = "Yammer";
/// Default callback path the provider redirects back to.
pub const DEFAULT_CALLBACK_PATH: &str = "/signin-provider";
/// Default backchannel timeout.
pub const DEFAULT_BACKCHANNEL_TIMEOUT: Duration = Duration::seconds(60);
/// Default cap on the token endpoint response body.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 15_000_000;

const YAMMER_AUTHORIZATION_ENDPOINT: &str = "https://www.yammer.com/dialog/oauth";
const YAMMER_TOKEN_ENDPOINT: &str = "https://www.yammer.com/oauth2/access_token.json";

/// Provider endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Browser-facing authorization endpoint.
	pub authorization: Url,
	/// Backchannel token endpoint.
	pub token: Url,
}
impl ProviderEndpoints {
	/// Yammer's production endpoints.
	pub fn yammer() -> Self {
		Self {
			authorization: Url::parse(YAMMER_AUTHORIZATION_ENDPOINT)
				.expect("Yammer authorization endpoint constant should parse."),
			token: Url::parse(YAMMER_TOKEN_ENDPOINT)
				.expect("Yammer token endpoint constant should parse."),
		}
	}
}
impl Default for ProviderEndpoints {
	fn default() -> Self {
		Self::yammer()
	}
}

/// Options consumed by [`SignInHandler`](crate::flows::SignInHandler).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignInOptions {
	/// Scheme name stamped on issued identities and used to scope state and correlation.
	pub authentication_type: String,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: Secret,
	/// Path (relative to the request's path base) the provider redirects back to.
	pub callback_path: String,
	/// Provider endpoints.
	pub endpoints: ProviderEndpoints,
	/// Upper bound on a single backchannel exchange.
	pub backchannel_timeout: Duration,
	/// Upper bound on the token endpoint response body.
	pub max_response_bytes: usize,
	/// Skips TLS certificate validation on the backchannel. Only for development proxies.
	pub backchannel_accept_invalid_certs: bool,
	/// Authentication type the host signs the identity in as; defaults to
	/// [`authentication_type`](Self::authentication_type).
	pub sign_in_as_authentication_type: Option<String>,
	/// Requested scopes; omitted from the authorization request when empty.
	pub scope: ScopeSet,
}
impl SignInOptions {
	/// Starts a builder with the mandatory client credentials.
	pub fn builder(
		client_id: impl Into<String>,
		client_secret: impl Into<Secret>,
	) -> SignInOptionsBuilder {
		SignInOptionsBuilder::new(client_id, client_secret)
	}

	/// Validates invariants for the options.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingClientId);
		}
		if self.client_secret.is_blank() {
			return Err(ConfigError::MissingClientSecret);
		}
		if self.authentication_type.trim().is_empty() {
			return Err(ConfigError::MissingAuthenticationType);
		}
		if !self.callback_path.starts_with('/') {
			return Err(ConfigError::InvalidCallbackPath { path: self.callback_path.clone() });
		}
		if !self.backchannel_timeout.is_positive() {
			return Err(ConfigError::NonPositiveTimeout);
		}
		if self.max_response_bytes == 0 {
			return Err(ConfigError::ZeroResponseCap);
		}

		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;

		Ok(())
	}

	/// Authentication type used when signing the identity in.
	pub fn sign_in_as(&self) -> &str {
		self.sign_in_as_authentication_type.as_deref().unwrap_or(&self.authentication_type)
	}

	/// Name of the correlation value retained in the host session.
	pub fn correlation_name(&self) -> String {
		format!(".yammer-signin.correlation.{}", self.authentication_type)
	}

	/// Associated data bound into every protected `state`.
	pub fn state_purpose(&self) -> String {
		format!("yammer-signin.state.{}", self.authentication_type)
	}
}
impl Default for SignInOptions {
	fn default() -> Self {
		Self {
			authentication_type: DEFAULT_AUTHENTICATION_TYPE.into(),
			client_id: String::new(),
			client_secret: Secret::default(),
			callback_path: DEFAULT_CALLBACK_PATH.into(),
			endpoints: ProviderEndpoints::default(),
			backchannel_timeout: DEFAULT_BACKCHANNEL_TIMEOUT,
			max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
			backchannel_accept_invalid_certs: false,
			sign_in_as_authentication_type: None,
			scope: ScopeSet::default(),
		}
	}
}

/// Builder for [`SignInOptions`] values.
#[derive(Debug)]
pub struct SignInOptionsBuilder {
	options: SignInOptions,
}
impl SignInOptionsBuilder {
	/// Creates a builder seeded with defaults and the client credentials.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<Secret>) -> Self {
		Self {
			options: SignInOptions {
				client_id: client_id.into(),
				client_secret: client_secret.into(),
				..Default::default()
			},
		}
	}

	/// Overrides the scheme name.
	pub fn authentication_type(mut self, value: impl Into<String>) -> Self {
		self.options.authentication_type = value.into();

		self
	}

	/// Overrides the callback path.
	pub fn callback_path(mut self, path: impl Into<String>) -> Self {
		self.options.callback_path = path.into();

		self
	}

	/// Overrides the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.options.endpoints.authorization = url;

		self
	}

	/// Overrides the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.options.endpoints.token = url;

		self
	}

	/// Overrides the backchannel timeout.
	pub fn backchannel_timeout(mut self, timeout: Duration) -> Self {
		self.options.backchannel_timeout = timeout;

		self
	}

	/// Overrides the response size cap.
	pub fn max_response_bytes(mut self, limit: usize) -> Self {
		self.options.max_response_bytes = limit;

		self
	}

	/// Disables TLS certificate validation on the backchannel.
	pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
		self.options.backchannel_accept_invalid_certs = accept;

		self
	}

	/// Signs identities in under a different authentication type.
	pub fn sign_in_as(mut self, authentication_type: impl Into<String>) -> Self {
		self.options.sign_in_as_authentication_type = Some(authentication_type.into());

		self
	}

	/// Sets the requested scopes.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.options.scope = scope;

		self
	}

	/// Validates and returns the options.
	pub fn build(self) -> Result<SignInOptions, ConfigError> {
		self.options.validate()?;

		Ok(self.options)
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	let loopback = match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	};

	if url.scheme() == "https" || loopback {
		Ok(())
	} else {
		Err(ConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}

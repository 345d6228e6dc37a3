//! Narrow request/response contracts the sign-in core depends on.
//!
//! Hosts adapt their own request model to [`InboundRequest`] and [`ResponseSink`]. The
//! correlation side channel (`correlation` / `retain_correlation` / `discard_correlation`) is
//! owned by the host's session mechanism, typically a short-lived cookie, and is scoped to one
//! user agent rather than the process. [`HostRequest`] and [`HostResponse`] are owned
//! implementations suitable for adapters and tests.

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{AuthenticationProperties, ClaimsIdentity},
};

/// Read-only view of the inbound HTTP request.
pub trait InboundRequest
where
	Self: Send + Sync,
{
	/// HTTP method.
	fn method(&self) -> &str;

	/// URI scheme (`http` or `https`).
	fn scheme(&self) -> &str;

	/// Host header value, including the port when non-default.
	fn host(&self) -> &str;

	/// Mount point of the application; empty or starting with `/`.
	fn path_base(&self) -> &str;

	/// Request path relative to [`path_base`](Self::path_base).
	fn path(&self) -> &str;

	/// Raw query string without the leading `?`.
	fn query(&self) -> &str;

	/// Correlation value retained for `name` by the host session, if any.
	fn correlation(&self, name: &str) -> Option<&str>;

	/// Cancellation signal tied to the end-user request.
	fn cancellation(&self) -> CancellationToken;

	/// Decoded values of the query parameter `name`, in order of appearance.
	fn query_values(&self, name: &str) -> Vec<String> {
		form_urlencoded::parse(self.query().as_bytes())
			.filter(|(key, _)| key == name)
			.map(|(_, value)| value.into_owned())
			.collect()
	}

	/// `scheme://host` + path base, the prefix shared by every absolute URI built for the request.
	fn base_uri(&self) -> String {
		format!("{}://{}{}", self.scheme(), self.host(), self.path_base())
	}

	/// Absolute URI of the current request, query included.
	fn current_uri(&self) -> String {
		let query = self.query();

		if query.is_empty() {
			format!("{}{}", self.base_uri(), self.path())
		} else {
			format!("{}{}?{query}", self.base_uri(), self.path())
		}
	}
}

/// Mutable sink for the outbound HTTP response.
pub trait ResponseSink
where
	Self: Send,
{
	/// Current status code.
	fn status(&self) -> u16;

	/// Overrides the status code.
	fn set_status(&mut self, status: u16);

	/// Sets (replaces) a response header.
	fn set_header(&mut self, name: &str, value: &str);

	/// Retains `value` under `name` in the host session for the next request.
	fn retain_correlation(&mut self, name: &str, value: &str);

	/// Discards the value retained under `name`.
	fn discard_correlation(&mut self, name: &str);

	/// Hands an authenticated identity to the host's sign-in mechanism.
	fn sign_in(&mut self, identity: ClaimsIdentity, properties: AuthenticationProperties);

	/// Issues a `302 Found` redirect to `location`.
	fn redirect(&mut self, location: &str) {
		self.set_status(302);
		self.set_header("Location", location);
	}
}

/// Owned [`InboundRequest`] implementation.
#[derive(Clone, Debug)]
pub struct HostRequest {
	/// HTTP method.
	pub method: String,
	/// URI scheme.
	pub scheme: String,
	/// Host (and port).
	pub host: String,
	/// Application mount point.
	pub path_base: String,
	/// Request path.
	pub path: String,
	/// Raw query string without `?`.
	pub query: String,
	/// Correlation values retained by the host session.
	pub correlations: HashMap<String, String>,
	/// Cancellation signal.
	pub cancellation: CancellationToken,
}
impl HostRequest {
	/// Creates a `GET` request for `scheme://host/path`.
	pub fn get(scheme: impl Into<String>, host: impl Into<String>, path: impl Into<String>) -> Self {
		Self {
			method: "GET".into(),
			scheme: scheme.into(),
			host: host.into(),
			path_base: String::new(),
			path: path.into(),
			query: String::new(),
			correlations: HashMap::new(),
			cancellation: CancellationToken::new(),
		}
	}

	/// Builds a `GET` request from an absolute URL.
	pub fn from_url(url: &Url) -> Self {
		let host = match url.port() {
			Some(port) => format!("{}:{port}", url.host_str().unwrap_or_default()),
			None => url.host_str().unwrap_or_default().to_owned(),
		};

		Self::get(url.scheme(), host, url.path()).with_query(url.query().unwrap_or_default())
	}

	/// Sets the application mount point.
	pub fn with_path_base(mut self, path_base: impl Into<String>) -> Self {
		self.path_base = path_base.into();

		self
	}

	/// Sets the raw query string.
	pub fn with_query(mut self, query: impl Into<String>) -> Self {
		self.query = query.into();

		self
	}

	/// Seeds a correlation value, as the host session would on a follow-up request.
	pub fn with_correlation(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.correlations.insert(name.into(), value.into());

		self
	}

	/// Replaces the cancellation signal.
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancellation = token;

		self
	}
}
impl InboundRequest for HostRequest {
	fn method(&self) -> &str {
		&self.method
	}

	fn scheme(&self) -> &str {
		&self.scheme
	}

	fn host(&self) -> &str {
		&self.host
	}

	fn path_base(&self) -> &str {
		&self.path_base
	}

	fn path(&self) -> &str {
		&self.path
	}

	fn query(&self) -> &str {
		&self.query
	}

	fn correlation(&self, name: &str) -> Option<&str> {
		self.correlations.get(name).map(String::as_str)
	}

	fn cancellation(&self) -> CancellationToken {
		self.cancellation.clone()
	}
}

/// Recording [`ResponseSink`] implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostResponse {
	/// Status code.
	pub status: u16,
	/// Response headers.
	pub headers: BTreeMap<String, String>,
	/// Correlation values the next request should carry.
	pub correlations: BTreeMap<String, String>,
	/// Correlation names discarded during this response.
	pub discarded: Vec<String>,
	/// Identity handed to the sign-in mechanism, if any.
	pub signed_in: Option<(ClaimsIdentity, AuthenticationProperties)>,
}
impl HostResponse {
	/// Creates a response carrying `status`.
	pub fn with_status(status: u16) -> Self {
		Self {
			status,
			headers: BTreeMap::new(),
			correlations: BTreeMap::new(),
			discarded: Vec::new(),
			signed_in: None,
		}
	}

	/// Value of the `Location` header.
	pub fn location(&self) -> Option<&str> {
		self.headers.get("Location").map(String::as_str)
	}
}
impl Default for HostResponse {
	fn default() -> Self {
		Self::with_status(200)
	}
}
impl ResponseSink for HostResponse {
	fn status(&self) -> u16 {
		self.status
	}

	fn set_status(&mut self, status: u16) {
		self.status = status;
	}

	fn set_header(&mut self, name: &str, value: &str) {
		self.headers.insert(name.to_owned(), value.to_owned());
	}

	fn retain_correlation(&mut self, name: &str, value: &str) {
		self.correlations.insert(name.to_owned(), value.to_owned());
	}

	fn discard_correlation(&mut self, name: &str) {
		self.correlations.remove(name);
		self.discarded.push(name.to_owned());
	}

	fn sign_in(&mut self, identity: ClaimsIdentity, properties: AuthenticationProperties) {
		self.signed_in = Some((identity, properties));
	}
}

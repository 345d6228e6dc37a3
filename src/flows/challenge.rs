//! Challenge phase: redirect the user agent to the authorization endpoint.

// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
// self
use crate::{
	_prelude::*,
	auth::AuthenticationProperties,
	exchange::TransportErrorMapper,
	flows::{SignInHandler, common},
	host::{InboundRequest, ResponseSink},
	http::TokenHttpClient,
	obs::{self, FlowOutcome, FlowSpan, FlowStage},
};

const STAGE: FlowStage = FlowStage::Challenge;
// RFC 3986 unreserved characters stay literal; spaces become `%20`, never `+`.
const QUERY_VALUE: &AsciiSet =
	&NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

impl<C, M> SignInHandler<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Turns a pending `401` into a redirect to the authorization endpoint.
	///
	/// `challenge` carries the properties of the host's challenge for this authentication type;
	/// `None` means the host issued no such challenge. The redirect target defaults to the current
	/// request URI. Returns `Ok(true)` once a `302` has been written, `Ok(false)` when there was
	/// nothing to do. No network call is made.
	pub fn apply_challenge(
		&self,
		request: &dyn InboundRequest,
		response: &mut dyn ResponseSink,
		challenge: Option<AuthenticationProperties>,
	) -> Result<bool> {
		if response.status() != 401 {
			return Ok(false);
		}

		let Some(mut properties) = challenge else {
			return Ok(false);
		};
		let _guard = FlowSpan::new(STAGE).entered();

		obs::log_stage(STAGE, "Issuing authorization challenge.");
		obs::record_flow_outcome(STAGE, FlowOutcome::Attempt);

		if properties.redirect_uri.as_deref().is_none_or(str::is_empty) {
			properties.redirect_uri = Some(request.current_uri());
		}

		self.correlation.issue(&mut properties, response);

		let state = match self.state_codec.protect(&properties) {
			Ok(state) => state,
			Err(e) => {
				obs::log_failure(STAGE, "State could not be protected.", &e);
				obs::record_flow_outcome(STAGE, FlowOutcome::Aborted);

				return Err(e.into());
			},
		};
		let redirect_uri = common::redirect_uri(request, &self.options.callback_path);
		let location = self.authorization_url(&redirect_uri, &state);

		response.redirect(location.as_str());
		obs::record_flow_outcome(STAGE, FlowOutcome::Success);

		Ok(true)
	}

	/// Authorization endpoint URL carrying the client credentials, `redirect_uri`, and `state`.
	pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Url {
		let mut url = self.options.endpoints.authorization.clone();
		let mut query = url.query().map(str::to_owned).unwrap_or_default();
		let mut append = |name: &str, value: &str| {
			if !query.is_empty() {
				query.push('&');
			}

			query.push_str(name);
			query.push('=');
			query.extend(utf8_percent_encode(value, QUERY_VALUE));
		};

		append("client_id", &self.options.client_id);
		append("client_secret", self.options.client_secret.expose());
		append("response_type", "code");
		append("redirect_uri", redirect_uri);
		append("state", state);

		if !self.options.scope.is_empty() {
			append("scope", &self.options.scope.normalized());
		}

		url.set_query(Some(&query));

		url
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		auth::ScopeSet,
		config::SignInOptions,
		host::{HostRequest, HostResponse},
	};

	fn handler(scope: Option<ScopeSet>) -> ReqwestTestHandler {
		let mut builder = SignInOptions::builder("client id", "s3cret");

		if let Some(scope) = scope {
			builder = builder.scope(scope);
		}

		build_reqwest_test_handler(builder.build().expect("Options should validate."))
	}

	#[test]
	fn ignores_non_401_and_foreign_challenges() {
		let handler = handler(None);
		let request = HostRequest::get("https", "app.test", "/protected");
		let mut ok = HostResponse::default();

		assert!(!handler
			.apply_challenge(&request, &mut ok, Some(AuthenticationProperties::default()))
			.expect("Challenge should not fail."));
		assert_eq!(ok, HostResponse::default());

		let mut unauthorized = HostResponse::with_status(401);

		assert!(!handler
			.apply_challenge(&request, &mut unauthorized, None)
			.expect("Challenge should not fail."));
		assert_eq!(unauthorized, HostResponse::with_status(401));
	}

	#[test]
	fn authorization_url_encodes_parameters() {
		let handler = handler(None);
		let url = handler.authorization_url("https://app.test/signin-provider", "v1.a&b");
		let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();

		assert!(url.as_str().starts_with("https://www.yammer.com/dialog/oauth?client_id=client%20id&"));
		assert!(url.as_str().contains("&redirect_uri=https%3A%2F%2Fapp.test%2Fsignin-provider&"));
		assert!(url.as_str().contains("&state=v1.a%26b"));
		assert_eq!(pairs.get("client_secret").map(String::as_str), Some("s3cret"));
		assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(pairs.get("state").map(String::as_str), Some("v1.a&b"));
		assert!(!pairs.contains_key("scope"));
	}

	#[test]
	fn scope_is_appended_when_configured() {
		let scope = ScopeSet::new(["messages", "groups"]).expect("Scope should be valid.");
		let url = handler(Some(scope)).authorization_url("https://app.test/signin-provider", "s");
		let scope = url
			.query_pairs()
			.find(|(key, _)| key == "scope")
			.map(|(_, value)| value.into_owned());

		assert_eq!(scope.as_deref(), Some("groups messages"));
		assert!(url.as_str().ends_with("&scope=groups%20messages"));
	}

	#[test]
	fn explicit_redirect_target_is_kept() {
		let handler = handler(None);
		let request = HostRequest::get("https", "app.test", "/protected");
		let mut response = HostResponse::with_status(401);

		assert!(handler
			.apply_challenge(
				&request,
				&mut response,
				Some(AuthenticationProperties::with_redirect_uri("/dashboard")),
			)
			.expect("Challenge should succeed."));

		let location = Url::parse(response.location().expect("Location should be set."))
			.expect("Location should be absolute.");
		let state = location
			.query_pairs()
			.find(|(key, _)| key == "state")
			.map(|(_, value)| value.into_owned())
			.expect("State should be present.");
		let codec = crate::state::AeadStateCodec::new(&test_keyring(), handler.options().state_purpose());
		let properties =
			crate::state::StateCodec::unprotect(&codec, &state).expect("State should unprotect.");

		assert_eq!(properties.redirect_uri.as_deref(), Some("/dashboard"));
		assert_eq!(
			properties.correlation_id(),
			response.correlations.get(&handler.options().correlation_name()).map(String::as_str)
		);
	}
}

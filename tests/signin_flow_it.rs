#![cfg(all(feature = "reqwest", feature = "test"))]

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// crates.io
use httpmock::prelude::*;
// self
use yammer_signin::{
	_preludet::*,
	auth::{AuthenticationProperties, Claim, ClaimType},
	config::SignInOptions,
	events::{AuthenticatedContext, AuthenticationEvents, EventFuture, ReturnEndpointContext},
	host::{HostRequest, HostResponse},
};

const CLIENT_ID: &str = "client-it";
const CLIENT_SECRET: &str = "secret-it";
const TOKEN_PATH: &str = "/oauth2/access_token.json";
const AUTHORIZE_PATH: &str = "/dialog/oauth";
const PROFILE_BODY: &str = "{\"access_token\":{\"token\":\"tok1\"},\"user\":{\"id\":\"42\",\"name\":\"alice\"},\"network\":{\"id\":7,\"name\":\"Acme\"}}";

#[derive(Default)]
struct RecordingEvents {
	authenticated: AtomicUsize,
	returned: AtomicUsize,
	reject: bool,
	complete_on_return: bool,
	clear_sign_in: bool,
	redirect_override: Option<&'static str>,
	fail_on_return: bool,
}
impl AuthenticationEvents for RecordingEvents {
	fn authenticated<'a>(&'a self, context: &'a mut AuthenticatedContext) -> EventFuture<'a> {
		Box::pin(async move {
			self.authenticated.fetch_add(1, Ordering::SeqCst);

			if self.reject {
				return Err("Network is blocked.".into());
			}

			context.claims.add_claim(Claim::new("urn:test:network", "Acme", "Test"));

			Ok(())
		})
	}

	fn return_endpoint<'a>(&'a self, context: &'a mut ReturnEndpointContext) -> EventFuture<'a> {
		Box::pin(async move {
			self.returned.fetch_add(1, Ordering::SeqCst);

			if self.complete_on_return {
				context.complete();
			}
			if self.clear_sign_in {
				context.sign_in_as = None;
			}
			if let Some(target) = self.redirect_override {
				context.redirect_uri = Some(target.into());
			}
			if self.fail_on_return {
				return Err("Audit sink is unavailable.".into());
			}

			Ok(())
		})
	}
}

fn options(server: &MockServer) -> SignInOptions {
	SignInOptions::builder(CLIENT_ID, CLIENT_SECRET)
		.authorization_endpoint(
			Url::parse(&server.url(AUTHORIZE_PATH))
				.expect("Mock authorization endpoint should parse successfully."),
		)
		.token_endpoint(
			Url::parse(&server.url(TOKEN_PATH)).expect("Mock token endpoint should parse successfully."),
		)
		.build()
		.expect("Sign-in options should validate.")
}

fn query_value(url: &Url, name: &str) -> Option<String> {
	url.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
}

/// Challenges `/protected?tab=1` and returns the issued `state` plus the retained correlation.
fn challenge(handler: &ReqwestTestHandler) -> (String, String) {
	let request = HostRequest::get("https", "app.test", "/protected").with_query("tab=1");
	let mut response = HostResponse::with_status(401);

	assert!(
		handler
			.apply_challenge(&request, &mut response, Some(AuthenticationProperties::default()))
			.expect("Challenge should succeed."),
		"A 401 with a matching challenge must redirect."
	);

	let location = Url::parse(response.location().expect("Challenge should set Location."))
		.expect("Location should be an absolute URL.");
	let state = query_value(&location, "state").expect("Authorization URL should carry state.");
	let correlation = response
		.correlations
		.get(&handler.options().correlation_name())
		.cloned()
		.expect("Challenge should retain a correlation value.");

	(state, correlation)
}

fn callback(handler: &ReqwestTestHandler, query: String, correlation: Option<&str>) -> HostRequest {
	let request = HostRequest::get("https", "app.test", "/signin-provider").with_query(query);

	match correlation {
		Some(value) => request.with_correlation(handler.options().correlation_name(), value),
		None => request,
	}
}

fn state_query(code: &str, state: &str) -> String {
	url::form_urlencoded::Serializer::new(String::new())
		.append_pair("code", code)
		.append_pair("state", state)
		.finish()
}

#[tokio::test]
async fn challenge_redirects_to_authorization_endpoint() {
	let server = MockServer::start_async().await;
	let handler = build_reqwest_test_handler(options(&server));
	let request = HostRequest::get("https", "app.test", "/protected");
	let mut response = HostResponse::with_status(401);

	assert!(
		handler
			.apply_challenge(&request, &mut response, Some(AuthenticationProperties::default()))
			.expect("Challenge should succeed.")
	);
	assert_eq!(response.status, 302);

	let location = Url::parse(response.location().expect("Challenge should set Location."))
		.expect("Location should be an absolute URL.");

	assert!(location.as_str().starts_with(&server.url(AUTHORIZE_PATH)));
	assert_eq!(query_value(&location, "client_id").as_deref(), Some(CLIENT_ID));
	assert_eq!(query_value(&location, "client_secret").as_deref(), Some(CLIENT_SECRET));
	assert_eq!(query_value(&location, "response_type").as_deref(), Some("code"));
	assert_eq!(
		query_value(&location, "redirect_uri").as_deref(),
		Some("https://app.test/signin-provider")
	);
	assert!(query_value(&location, "state").is_some_and(|state| !state.is_empty()));
	assert!(query_value(&location, "scope").is_none());
}

#[tokio::test]
async fn callback_issues_identity_and_redirects_to_original_target() {
	let server = MockServer::start_async().await;
	let events = Arc::new(RecordingEvents::default());
	let handler = build_reqwest_test_handler(options(&server)).with_events(events.clone());
	let (state, correlation) = challenge(&handler);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("content-type", "application/x-www-form-urlencoded")
				.header("accept", "application/json")
				.body_includes("grant_type=authorization_code")
				.body_includes("code=abc")
				.body_includes("redirect_uri=https%3A%2F%2Fapp.test%2Fsignin-provider");
			then.status(200).header("content-type", "application/json").body(PROFILE_BODY);
		})
		.await;
	let request = callback(&handler, state_query("abc", &state), Some(&correlation));
	let mut response = HostResponse::default();

	assert!(handler.invoke(&request, &mut response).await, "Callback should complete the request.");

	mock.assert_async().await;

	assert_eq!(events.authenticated.load(Ordering::SeqCst), 1);
	assert_eq!(events.returned.load(Ordering::SeqCst), 1);
	assert_eq!(response.status, 302);
	assert_eq!(response.location(), Some("https://app.test/protected?tab=1"));
	assert_eq!(response.discarded, vec![handler.options().correlation_name()]);

	let (identity, properties) = response.signed_in.expect("Identity should be signed in.");

	assert_eq!(identity.authentication_type, "Yammer");
	assert_eq!(identity.find_first(ClaimType::YammerId.as_str()), Some("42"));
	assert_eq!(identity.name(), Some("alice"));
	assert_eq!(identity.find_first(ClaimType::YammerNetworkId.as_str()), Some("7"));
	assert_eq!(identity.find_first(ClaimType::Email.as_str()), None);
	assert_eq!(identity.find_first("urn:test:network"), Some("Acme"));
	assert_eq!(properties.redirect_uri, None);
	assert_eq!(properties.correlation_id(), None);
}

#[tokio::test]
async fn token_endpoint_rejection_redirects_with_access_denied() {
	for (status, body) in [
		(401, "{\"error\":\"unauthorized\"}"),
		(500, "oops"),
		(200, "{\"access_token\":{\"token\":\"\"},\"user\":{\"id\":\"42\"}}"),
		(200, "{\"access_token\":{\"token\":\"tok1\"},\"user\":{\"name\":\"alice\"}}"),
		(200, "not json"),
	] {
		let server = MockServer::start_async().await;
		let events = Arc::new(RecordingEvents::default());
		let handler =
			build_reqwest_test_handler(options(&server)).with_events(events.clone());
		let (state, correlation) = challenge(&handler);
		let mock = server
			.mock_async(|when, then| {
				when.method(POST).path(TOKEN_PATH);
				then.status(status).header("content-type", "application/json").body(body);
			})
			.await;
		let request = callback(&handler, state_query("abc", &state), Some(&correlation));
		let mut response = HostResponse::default();

		assert!(handler.invoke(&request, &mut response).await);

		mock.assert_async().await;

		assert_eq!(events.authenticated.load(Ordering::SeqCst), 0, "Hook must not run for {body}.");
		assert_eq!(response.signed_in, None);
		assert_eq!(response.location(), Some("https://app.test/protected?tab=1&error=access_denied"));
	}
}

#[tokio::test]
async fn correlation_mismatch_rejects_without_calling_backchannel() {
	let server = MockServer::start_async().await;
	let handler = build_reqwest_test_handler(options(&server));
	let (state, _) = challenge(&handler);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(PROFILE_BODY);
		})
		.await;

	for correlation in [Some("forged-value"), None] {
		let request = callback(&handler, state_query("abc", &state), correlation);
		let mut response = HostResponse::default();
		let ticket = handler
			.authenticate(&request, &mut response)
			.await
			.expect("A valid state should still yield a ticket.");

		assert!(!ticket.is_authenticated());
		assert_eq!(ticket.properties.redirect_uri.as_deref(), Some("https://app.test/protected?tab=1"));
		assert_eq!(response.discarded, vec![handler.options().correlation_name()]);
	}

	mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn malformed_callbacks_never_reach_backchannel() {
	let server = MockServer::start_async().await;
	let handler = build_reqwest_test_handler(options(&server));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(PROFILE_BODY);
		})
		.await;
	let (state, correlation) = challenge(&handler);
	let encoded_state = state_query("x", &state).split_once('&').map(|(_, s)| s.to_owned());
	let encoded_state = encoded_state.expect("State pair should be present.");

	for query in [
		encoded_state.clone(),
		format!("code=a&code=b&{encoded_state}"),
		format!("error=access_denied&{encoded_state}"),
	] {
		let request = callback(&handler, query.clone(), Some(&correlation));
		let mut response = HostResponse::default();
		let ticket = handler
			.authenticate(&request, &mut response)
			.await
			.expect("A valid state should yield a rejection ticket.");

		assert!(!ticket.is_authenticated(), "Query {query} must not authenticate.");
	}
	for query in [
		"code=abc".to_owned(),
		format!("code=abc&{encoded_state}&{encoded_state}"),
		"code=abc&state=v1.tampered".to_owned(),
	] {
		let request = callback(&handler, query.clone(), Some(&correlation));
		let mut response = HostResponse::default();

		assert!(handler.authenticate(&request, &mut response).await.is_none());
		assert!(
			!handler.invoke(&request, &mut response).await,
			"Without state there is no redirect target for {query}."
		);
		assert_eq!(response.location(), None);
	}

	mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn failing_authenticated_hook_rejects_the_callback() {
	let server = MockServer::start_async().await;
	let events = Arc::new(RecordingEvents { reject: true, ..Default::default() });
	let handler = build_reqwest_test_handler(options(&server)).with_events(events.clone());
	let (state, correlation) = challenge(&handler);
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(PROFILE_BODY);
		})
		.await;
	let request = callback(&handler, state_query("abc", &state), Some(&correlation));
	let mut response = HostResponse::default();

	assert!(handler.invoke(&request, &mut response).await);
	assert_eq!(events.authenticated.load(Ordering::SeqCst), 1);
	assert_eq!(response.signed_in, None);
	assert_eq!(response.location(), Some("https://app.test/protected?tab=1&error=access_denied"));
}

#[tokio::test]
async fn return_hook_can_take_over_the_response() {
	let server = MockServer::start_async().await;
	let events = Arc::new(RecordingEvents { complete_on_return: true, ..Default::default() });
	let handler = build_reqwest_test_handler(options(&server)).with_events(events.clone());
	let (state, correlation) = challenge(&handler);
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(PROFILE_BODY);
		})
		.await;
	let request = callback(&handler, state_query("abc", &state), Some(&correlation));
	let mut response = HostResponse::default();

	assert!(handler.invoke(&request, &mut response).await);
	assert_eq!(response.status, 200);
	assert_eq!(response.location(), None);
	assert_eq!(response.signed_in, None);
}

#[tokio::test]
async fn return_hook_redirect_override_survives_hook_failure() {
	let server = MockServer::start_async().await;
	let events = Arc::new(RecordingEvents {
		redirect_override: Some("/override"),
		fail_on_return: true,
		..Default::default()
	});
	let handler = build_reqwest_test_handler(options(&server)).with_events(events.clone());
	let (state, correlation) = challenge(&handler);
	let request = callback(&handler, state_query("abc", &state), Some(&correlation));
	let mut response = HostResponse::default();

	assert!(handler.invoke(&request, &mut response).await, "Hook errors must not abort the redirect.");
	assert_eq!(events.returned.load(Ordering::SeqCst), 1);
	assert_eq!(response.signed_in, None);
	assert_eq!(response.location(), Some("/override?error=access_denied"));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(PROFILE_BODY);
		})
		.await;
	let (state, correlation) = challenge(&handler);
	let request = callback(&handler, state_query("abc", &state), Some(&correlation));
	let mut response = HostResponse::default();

	assert!(handler.invoke(&request, &mut response).await);

	mock.assert_async().await;

	assert!(response.signed_in.is_some(), "Hook errors must not undo the sign-in.");
	assert_eq!(response.location(), Some("/override"));
}

#[tokio::test]
async fn return_hook_can_complete_a_callback_with_unrecoverable_state() {
	let server = MockServer::start_async().await;
	let events = Arc::new(RecordingEvents { complete_on_return: true, ..Default::default() });
	let handler = build_reqwest_test_handler(options(&server)).with_events(events.clone());
	let (_, correlation) = challenge(&handler);
	let request = callback(&handler, "code=abc&state=v1.tampered".to_owned(), Some(&correlation));
	let mut response = HostResponse::default();

	assert!(handler.invoke(&request, &mut response).await, "The hook completed the request.");
	assert_eq!(events.returned.load(Ordering::SeqCst), 1);
	assert_eq!(events.authenticated.load(Ordering::SeqCst), 0);
	assert_eq!(response.status, 200);
	assert_eq!(response.location(), None);
	assert_eq!(response.signed_in, None);
}

#[tokio::test]
async fn sign_in_as_retypes_or_suppresses_the_identity() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(PROFILE_BODY);
		})
		.await;
	let mut options = options(&server);

	options.sign_in_as_authentication_type = Some("ExternalCookie".into());

	let handler = build_reqwest_test_handler(options.clone());
	let (state, correlation) = challenge(&handler);
	let request = callback(&handler, state_query("abc", &state), Some(&correlation));
	let mut response = HostResponse::default();

	assert!(handler.invoke(&request, &mut response).await);

	let (identity, _) = response.signed_in.expect("Identity should be signed in.");

	assert_eq!(identity.authentication_type, "ExternalCookie");
	assert_eq!(identity.claims[0].issuer, "Yammer");

	let events = Arc::new(RecordingEvents { clear_sign_in: true, ..Default::default() });
	let handler = build_reqwest_test_handler(options).with_events(events);
	let (state, correlation) = challenge(&handler);
	let request = callback(&handler, state_query("abc", &state), Some(&correlation));
	let mut response = HostResponse::default();

	assert!(handler.invoke(&request, &mut response).await);
	assert_eq!(response.signed_in, None);
	assert_eq!(response.location(), Some("https://app.test/protected?tab=1"));
}

#[tokio::test]
async fn invoke_ignores_other_paths() {
	let server = MockServer::start_async().await;
	let handler = build_reqwest_test_handler(options(&server));
	let request = HostRequest::get("https", "app.test", "/protected").with_query("code=abc&state=s");
	let mut response = HostResponse::default();

	assert!(!handler.invoke(&request, &mut response).await);
	assert_eq!(response, HostResponse::default());

	let request =
		HostRequest::get("https", "app.test", "/SIGNIN-PROVIDER").with_query("code=abc&state=s");

	assert!(!handler.invoke(&request, &mut response).await, "Path matching is exact.");
	assert_eq!(response, HostResponse::default());
}

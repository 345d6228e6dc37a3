//! Walks through a challenge redirect and shows how a callback carrying a forged correlation value
//! is turned into an `error=access_denied` redirect without touching the token endpoint.

// crates.io
use color_eyre::Result;
// self
use yammer_signin::{
	auth::{AuthenticationProperties, ScopeSet},
	config::SignInOptions,
	flows::SignInHandler,
	host::{HostRequest, HostResponse},
	state::{StateKey, StateKeyring},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let options = SignInOptions::builder("demo-client", "demo-secret")
		.scope(ScopeSet::new(["messages"])?)
		.build()?;
	let keyring = StateKeyring::new(1, StateKey::derive(b"demo host secret", "yammer-signin"));
	let handler = SignInHandler::new(options, keyring)?;
	let request = HostRequest::get("https", "app.example.com", "/reports").with_query("year=2024");
	let mut response = HostResponse::with_status(401);

	handler.apply_challenge(&request, &mut response, Some(AuthenticationProperties::default()))?;

	let location = response.location().unwrap_or_default().to_owned();

	println!("Send your user to {location}.");

	let state = url::Url::parse(&location)?
		.query_pairs()
		.find(|(key, _)| key == "state")
		.map(|(_, value)| value.into_owned())
		.unwrap_or_default();
	let query = url::form_urlencoded::Serializer::new(String::new())
		.append_pair("code", "demo-code")
		.append_pair("state", &state)
		.finish();
	// The browser comes back without the retained correlation value.
	let callback = HostRequest::get("https", "app.example.com", "/signin-provider")
		.with_query(query)
		.with_correlation(handler.options().correlation_name(), "forged");
	let mut callback_response = HostResponse::default();
	let handled = handler.invoke(&callback, &mut callback_response).await;

	println!(
		"Callback handled: {handled}; redirected to {}.",
		callback_response.location().unwrap_or("nowhere")
	);

	Ok(())
}

//! Yammer OAuth 2.0 sign-in for any HTTP host: CSRF-bound authorization redirects, backchannel
//! code exchanges, and normalized claims handed back through pluggable hooks.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod correlation;
pub mod error;
pub mod events;
pub mod exchange;
pub mod flows;
pub mod host;
pub mod http;
pub mod obs;
pub mod profile;
pub mod state;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::SignInOptions,
		exchange::ReqwestTransportErrorMapper,
		flows::SignInHandler,
		http::ReqwestHttpClient,
		state::{StateKey, StateKeyring},
	};

	/// Handler type alias used by reqwest-backed integration tests.
	pub type ReqwestTestHandler = SignInHandler<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Deterministic keyring so tests can protect and unprotect state across handlers.
	pub fn test_keyring() -> StateKeyring {
		StateKeyring::new(1, StateKey::from_bytes([7; 32]))
	}

	/// Constructs a [`SignInHandler`] backed by the insecure test transport and
	/// [`test_keyring`].
	pub fn build_reqwest_test_handler(options: SignInOptions) -> ReqwestTestHandler {
		SignInHandler::with_http_client(
			options,
			test_keyring(),
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
		.expect("Test handler options should validate.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::Duration;
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};

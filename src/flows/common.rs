//! Helpers shared by the flow phases.

// crates.io
use url::form_urlencoded;
// self
use crate::{error::CallbackError, host::InboundRequest};

/// Absolute callback URI for `request`; identical at challenge time and at exchange time.
pub(crate) fn redirect_uri(request: &dyn InboundRequest, callback_path: &str) -> String {
	format!("{}{callback_path}", request.base_uri())
}

/// Reads a query parameter that must appear exactly once.
pub(crate) fn single_query_value(
	request: &dyn InboundRequest,
	name: &'static str,
) -> Result<String, CallbackError> {
	let mut values = request.query_values(name);

	match values.len() {
		0 => Err(CallbackError::MissingParameter { name }),
		1 => Ok(values.remove(0)),
		count => Err(CallbackError::DuplicateParameter { name, count }),
	}
}

/// Appends `name=value` to the query of `uri`, keeping any fragment last.
pub fn add_query_string(uri: &str, name: &str, value: &str) -> String {
	let (base, fragment) = match uri.find('#') {
		Some(idx) => uri.split_at(idx),
		None => (uri, ""),
	};
	let separator = if base.contains('?') { '&' } else { '?' };
	let pair = form_urlencoded::Serializer::new(String::new()).append_pair(name, value).finish();

	format!("{base}{separator}{pair}{fragment}")
}

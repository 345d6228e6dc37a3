//! Application-supplied properties that round-trip through the provider inside `state`.

// self
use crate::_prelude::*;

/// Opaque bag carried from the challenge to the callback.
///
/// The `correlation_id` slot is reserved for [`CorrelationGuard`](crate::correlation::CorrelationGuard);
/// everything else belongs to the embedding application.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationProperties {
	/// Where the user agent should land after the flow completes.
	pub redirect_uri: Option<String>,
	/// Whether the host should persist the resulting sign-in across browser sessions.
	pub is_persistent: bool,
	/// Arbitrary application data.
	pub items: BTreeMap<String, String>,
	correlation_id: Option<String>,
}
impl AuthenticationProperties {
	/// Creates properties targeting `redirect_uri`.
	pub fn with_redirect_uri(redirect_uri: impl Into<String>) -> Self {
		Self { redirect_uri: Some(redirect_uri.into()), ..Default::default() }
	}

	/// Marks the sign-in as persistent.
	pub fn persistent(mut self, is_persistent: bool) -> Self {
		self.is_persistent = is_persistent;

		self
	}

	/// Inserts an application item, returning the updated bag.
	pub fn with_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.items.insert(key.into(), value.into());

		self
	}

	/// Correlation token embedded at challenge time, if any.
	pub fn correlation_id(&self) -> Option<&str> {
		self.correlation_id.as_deref()
	}

	pub(crate) fn set_correlation_id(&mut self, token: impl Into<String>) {
		self.correlation_id = Some(token.into());
	}

	pub(crate) fn take_correlation_id(&mut self) -> Option<String> {
		self.correlation_id.take()
	}
}

//! Optional observability helpers for the sign-in phases.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `yammer_signin.flow` with a `stage` field,
//!   plus `debug!` stage transitions and `warn!` failure events carrying the error chain.
//! - Enable `metrics` to increment the `yammer_signin_flow_total` counter for every
//!   attempt/outcome, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Sign-in phases observed by the handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowStage {
	/// Redirect to the authorization endpoint.
	Challenge,
	/// Provider callback and backchannel exchange.
	Callback,
	/// Post-callback hook dispatch, sign-in, and final redirect.
	ReturnEndpoint,
}
impl FlowStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowStage::Challenge => "challenge",
			FlowStage::Callback => "callback",
			FlowStage::ReturnEndpoint => "return_endpoint",
		}
	}
}
impl Display for FlowStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a stage.
	Attempt,
	/// The stage did its work (redirect issued, identity issued, request completed).
	Success,
	/// The callback produced a ticket without identity.
	Rejected,
	/// The stage gave up without producing anything.
	Aborted,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Rejected => "rejected",
			FlowOutcome::Aborted => "aborted",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Renders `err` and its sources as `outer: inner: root`.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
	let mut rendered = err.to_string();
	let mut source = err.source();

	while let Some(inner) = source {
		rendered.push_str(": ");
		rendered.push_str(&inner.to_string());

		source = inner.source();
	}

	rendered
}

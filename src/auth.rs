//! Auth-domain models: properties, identities, claims, tickets, scopes, and secrets.

pub mod claims;
pub mod identity;
pub mod properties;
pub mod scope;
pub mod secret;
pub mod ticket;

pub use claims::*;
pub use identity::*;
pub use properties::*;
pub use scope::*;
pub use secret::*;
pub use ticket::*;

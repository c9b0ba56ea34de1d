//! Role-based access rules for the rental backend.
//!
//! Every function takes the calling [`Actor`] explicitly. Nothing here reads
//! ambient request state.

pub mod actor;
pub mod dashboard;
pub mod error;
pub mod ledger;
pub mod notifications;
pub mod permissions;
pub mod validation;
pub mod visibility;

#[cfg(test)]
pub(crate) mod test_support;

pub use actor::Actor;
pub use error::{PolicyError, Result};
pub use permissions::{Action, Resource, authorize, authorize_owner, can, is_owner_or_oneself};
pub use visibility::{Scoped, Visibility, fetch_visible, find_visible, visible};

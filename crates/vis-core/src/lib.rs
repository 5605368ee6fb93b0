//! vis-core - Core traits and types for the VIS bridge
//!
//! This crate provides the abstractions that connect the gateway to the
//! components around it: the per-connection [`Channel`] context and the
//! collaborator traits the gateway and daemon are wired with. The gateway
//! never depends on a concrete processor, authenticator, or subscription
//! store - only on these seams.

pub mod channel;
pub mod collaborators;
pub mod error;

pub use channel::{Channel, ConnectionId};
pub use collaborators::{
    AccessChecker, Authenticator, CommandProcessor, SignalStore, SubscriptionHandler,
};
pub use error::{AuthError, StoreError};

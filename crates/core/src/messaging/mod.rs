//! # Builder Messaging
//!
//! Typed envelopes exchanged between the build subsystem and the
//! coordination layer, plus the delivery capability.

pub mod coordinator;
pub mod messages;

pub use coordinator::{BuilderMessage, ChannelCoordinator, MessageCoordinator};
pub use messages::{unique_id, BuilderErrorMessage, BuilderNotificationMessage};

//! Notification delivery for Lectern.
//!
//! [`Dispatcher`] owns the Notification lifecycle (persist `pending`, one
//! delivery attempt, persist the terminal status) and the fan-out of new
//! assignments to course rosters. The channel senders behind
//! [`sender::ChannelSender`] are swappable collaborators; the shipped ones
//! speak to HTTP delivery APIs.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
#![allow(async_fn_in_trait)]

pub mod dispatcher;
pub mod error;
pub mod sender;

pub use dispatcher::{Dispatcher, FanOut};
pub use error::{Error, Result};

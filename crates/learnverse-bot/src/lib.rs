//! # learnverse-bot
//!
//! The Learnverse bot process.
//!
//! The [`poller`] long-polls the platform and hands each update to the
//! [`dispatcher`], which routes commands, navigation callbacks and group
//! chatter. Group messages pass the [`gate`] (flags, per-user classifier
//! quota, confidence threshold) before a reply is considered; every reply
//! then passes the per-conversation quota. Private conversations are logged
//! through the [`audit`] trail. A small [`server`] exposes liveness and
//! health for the hosting platform.

#![deny(unsafe_code)]

pub mod audit;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod logging;
pub mod poller;
pub mod replies;
pub mod server;
pub mod shutdown;

pub use audit::{AuditTrail, AuditingPlatform};
pub use dispatcher::{Command, Dispatcher, Services};
pub use error::{BotError, Result};
pub use gate::{BackpressureGate, Dispatch, DropReason, Screening};
pub use poller::{Poller, UpdateSource};
pub use replies::Replies;
pub use server::{AppState, HealthResponse};
pub use shutdown::{DEFAULT_DRAIN_TIMEOUT, ShutdownCoordinator};

//! # learnverse-ratelimit
//!
//! Per-key token buckets with a small scheduler on top.
//!
//! A [`RateLimitRegistry`] is bound to one [`Policy`] and hands out
//! [`Permit`]s per [`RateLimitKey`]. [`acquire`](RateLimitRegistry::acquire)
//! never waits: it either consumes quota and reserves a queue position or
//! refuses. [`Permit::run`] then waits for a concurrency slot and the
//! policy's minimum spacing. [`schedule`](RateLimitRegistry::schedule) does
//! both.

#![deny(unsafe_code)]

pub mod error;
mod limiter;
pub mod policy;
pub mod registry;

pub use error::{RateLimited, Rejected};
pub use limiter::Permit;
pub use policy::{Policy, RateLimitKey};
pub use registry::{DEFAULT_IDLE_EVICTION, RateLimitRegistry, RegistryStats};

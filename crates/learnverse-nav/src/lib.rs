//! # learnverse-nav
//!
//! Stateless traversal of the catalog through inline controls.
//!
//! - [`token`]: the compact token each control carries
//! - [`machine`]: turns a token into the next [`Screen`]
//! - [`render`]: turns a screen into an outgoing message with controls
//!
//! Nothing is stored between requests. Each token names the screen it opens
//! plus at most one ancestor; anything further up is recovered from the
//! parent references the catalog returns.

#![deny(unsafe_code)]

pub mod error;
pub mod machine;
pub mod render;
pub mod screen;
pub mod token;

pub use error::NavError;
pub use machine::Navigator;
pub use render::{RenderContext, render};
pub use screen::{Failure, NavState, Notice, Screen};
pub use token::{Level, MAX_TOKEN_BYTES, NavToken};

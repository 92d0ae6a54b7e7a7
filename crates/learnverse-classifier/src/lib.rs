//! # learnverse-classifier
//!
//! Decides whether a group-chat message is asking for study material.
//!
//! [`GeminiClassifier`] sends one prompt per message and parses the JSON
//! verdict leniently; unreadable output becomes a negative verdict instead
//! of an error. [`DisabledClassifier`] stands in when no API key is set.

#![deny(unsafe_code)]

pub mod error;
pub mod fixed;
pub mod gemini;
pub mod parse;
pub mod prompt;
pub mod types;

pub use error::ClassifierError;
pub use fixed::{DisabledClassifier, NOT_CONFIGURED_REASON, Scripted, ScriptedClassifier};
pub use gemini::{GeminiClassifier, GeminiConfig};
pub use types::{Classification, QueryClassifier};

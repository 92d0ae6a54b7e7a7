//! # learnverse-catalog
//!
//! Domain types for the study-material catalog (Branch → Year → Syllabus →
//! Subject → materials) and the [`Catalog`] trait the navigation layer reads
//! through. [`HttpCatalog`] talks to the catalog REST API;
//! [`InMemoryCatalog`] serves fixed documents.

#![deny(unsafe_code)]

mod de;

pub mod client;
pub mod error;
pub mod memory;
pub mod types;

pub use client::{Catalog, HttpCatalog};
pub use error::{CatalogError, Result};
pub use memory::InMemoryCatalog;
pub use types::*;

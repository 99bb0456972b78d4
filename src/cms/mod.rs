//! CMS integration.
//!
//! # Responsibilities
//! - Fetch a site's composition with the current bearer token
//! - Select the landing page (first navigation page by index)
//! - Classify failures: transport, status, malformed body
//!
//! Only consulted when a cached site has no landing page yet.

pub mod client;
pub mod types;

pub use client::{CmsClient, PageResolver};
pub use types::{Composition, Page, PageMetadata, ResolveError};

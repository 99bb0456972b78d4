//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → classifier.rs (passthrough predicate, pure)
//!     → engine.rs (site cache lookup, landing page resolution)
//!     → inflight.rs (optional sharing of concurrent resolutions)
//!     → Return: RoutingDecision
//! ```
//!
//! # Design Decisions
//! - Classification never touches the cache
//! - The engine owns its collaborators; no module-level state
//! - Every failure becomes a `ServerError` decision, never a panic

pub mod classifier;
pub mod engine;
pub mod inflight;

pub use classifier::classify;
pub use engine::{landing_path, RouteError, RoutingDecision, RoutingEngine};
pub use inflight::InflightResolutions;

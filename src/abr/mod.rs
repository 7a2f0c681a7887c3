//! Adaptive bitrate selection.
//!
//! # Data Flow
//! ```text
//! fragment report arrives
//!     → throughput.rs (fold into the client's EWMA)
//! segment request arrives
//!     → catalog.rs (bitrates the path advertises, cache-on-miss)
//!     → selector.rs (highest rate sustainable at estimate / 1.5)
//!     → rewritten request goes to the origin
//! ```
//!
//! # Design Decisions
//! - Throughput state is keyed by the client's token, not its socket, so an
//!   estimate survives reconnects within one playback session
//! - The catalog is populated once per path and assumed static for the run

pub mod catalog;
pub mod selector;
pub mod throughput;

pub use catalog::BitrateCatalog;
pub use throughput::ThroughputTracker;

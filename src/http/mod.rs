//! The mini-HTTP surface the proxy understands.
//!
//! Only the header/body split and four request shapes carry meaning here;
//! everything else on the wire is opaque passthrough.

pub mod message;
pub mod recognize;

pub use message::Message;

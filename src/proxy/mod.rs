//! The relay proxy core.

pub mod engine;
pub mod pair;

pub use engine::{OriginTarget, ProxyEngine};

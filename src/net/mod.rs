//! Wire-level plumbing shared by both binaries.

pub mod framing;

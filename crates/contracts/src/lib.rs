//! # Contracts
//!
//! Frozen interface contracts, defining the data structures and traits shared
//! by the funnel crates. All business crates can only depend on this crate,
//! reverse dependencies are prohibited.
//!
//! ## Data Model
//! - A [`Chunk`] is an immutable payload plus its [`Encoding`] tag
//! - A [`Bucket`] is a swappable sink; one is filled at a time
//! - A [`ShutoffValve`] decides per chunk whether the current bucket is capped

mod bucket;
mod chunk;
mod config;
mod error;
mod ready;
mod upstream;
mod valve;

pub use bucket::*;
pub use chunk::*;
pub use config::*;
pub use error::*;
pub use ready::ReadySignal;
pub use upstream::{ChannelUpstream, LocalUpstream, Upstream};
pub use valve::*;

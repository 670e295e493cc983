//! Tick Feed Adapters
//!
//! Implementations of the [`TickSource`](crate::application::ports::TickSource)
//! port: a bulk replay loader for historical record files and a synthetic
//! random-walk generator for demos and soak runs. The production live
//! transport is an external collaborator speaking the same port.

mod replay;
mod synthetic;

pub use replay::ReplayFeed;
pub use synthetic::{SyntheticFeed, SyntheticFeedConfig};

//! Test doubles for the Solace crates: scripted completion backends and
//! a recording outbound sink.

mod completion;
mod sink;

pub use completion::{FailingCompletion, FixedCompletion};
pub use sink::RecordingSink;

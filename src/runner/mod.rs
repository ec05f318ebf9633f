//! Launching the trainer and streaming its output.
//!
//! `ProcessRunner` is the seam between sequencing and process handling:
//! `ChildRunner` spawns a real process, `MockRunner` plays back a script.

pub mod child;
pub mod mock;
pub mod traits;

pub use child::{ChildRunner, OutputLines};
pub use mock::{MockRun, MockRunner};
pub use traits::{ConsoleSink, LineSink, ProcessRunner, RunTarget, VecSink};

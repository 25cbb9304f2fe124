//! Minimal dataflow executor for block pipelines
//!
//! A pipeline is a chain of stages connected by channels. Each stage runs on
//! its own scoped thread (or a small set of threads for stateless stages) and
//! terminates when its input edge disconnects, which cascades down the chain
//! once the source hangs up. There is no scheduler beyond the operating
//! system: stages that have nothing to do park on a channel receive.

mod sequencer;
mod stage;

pub use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
pub use sequencer::Sequencer;
pub use stage::{parallel, serial, serial_tagged};

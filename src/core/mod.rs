//! Core value types shared across the engine.
//!
//! These types carry no behavior beyond construction and formatting, so
//! every other module can depend on them without pulling in providers or
//! async plumbing.

pub mod events;
pub mod mode;
pub mod priority;
pub mod request;

pub use events::{EventRecorder, LifecycleEvent};
pub use mode::{CognitiveLevel, Mode};
pub use priority::Priority;
pub use request::{Request, Response, ResponseMetrics, SamplingParams};

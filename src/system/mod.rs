// Module system - OS scheduling requests

pub mod priority;

pub use priority::{RealtimeRequest, SchedulingClass};

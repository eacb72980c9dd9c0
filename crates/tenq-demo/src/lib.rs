//! Step-driven harness for the `tenq-core` queues.
//!
//! A [`Scenario`] is a list of steps, each a burst of messages. [`drive`]
//! feeds one step per iteration and consumes at most one message per
//! iteration, and [`render_pattern`] turns the recorded counts into one
//! ASCII row per tenant.

mod harness;
mod render;
mod scenario;

pub use harness::{RunReport, Timeline, drive};
pub use render::render_pattern;
pub use scenario::{Scenario, ScenarioError, ScenarioFile};

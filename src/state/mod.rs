//! Direction state for the interpreting session
//!
//! Three headings, no terminal state:
//! - Neutral: stationary; left/right turn on the spot
//! - Forward: driving forward; left/right become leftforward/rightforward
//! - Back: reversing; left/right become leftback/rightback

mod machine;

pub use machine::{Direction, DirectionStateMachine};

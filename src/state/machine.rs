//! Direction state machine
//!
//! Tracks the last commanded heading (Neutral, Forward, Back) and turns
//! plain left/right requests into the compound command matching that
//! heading.

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::command::{MotionCommand, PrimitiveCommand};
use crate::events::InterpreterEvent;

/// Last commanded net heading of the car
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Not moving, or turning on the spot
    #[default]
    Neutral,
    /// Driving forward
    Forward,
    /// Reversing
    Back,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Neutral => write!(f, "Neutral"),
            Direction::Forward => write!(f, "Forward"),
            Direction::Back => write!(f, "Back"),
        }
    }
}

/// Resolve a primitive into the command to dispatch, updating `direction`
///
/// Forward, Back and Stop set the heading; Left and Right leave it alone and
/// pick the compound variant for the current heading. `None` yields `None`
/// and leaves `direction` untouched.
pub fn resolve(
    primitive: Option<PrimitiveCommand>,
    direction: &mut Direction,
) -> Option<MotionCommand> {
    let command = match primitive? {
        PrimitiveCommand::Forward => {
            *direction = Direction::Forward;
            MotionCommand::Forward
        }
        PrimitiveCommand::Back => {
            *direction = Direction::Back;
            MotionCommand::Back
        }
        PrimitiveCommand::Stop => {
            *direction = Direction::Neutral;
            MotionCommand::Stop
        }
        PrimitiveCommand::Left => match direction {
            Direction::Neutral => MotionCommand::Left,
            Direction::Forward => MotionCommand::LeftForward,
            Direction::Back => MotionCommand::LeftBack,
        },
        PrimitiveCommand::Right => match direction {
            Direction::Neutral => MotionCommand::Right,
            Direction::Forward => MotionCommand::RightForward,
            Direction::Back => MotionCommand::RightBack,
        },
    };

    Some(command)
}

/// Owns the direction for one interpreting session and reports changes
pub struct DirectionStateMachine {
    /// Current heading
    direction: Direction,
    /// Channel for emitting direction events
    event_tx: broadcast::Sender<InterpreterEvent>,
}

impl DirectionStateMachine {
    /// Create a state machine starting in Neutral
    pub fn new(event_tx: broadcast::Sender<InterpreterEvent>) -> Self {
        Self {
            direction: Direction::Neutral,
            event_tx,
        }
    }

    /// Get the current heading
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Resolve a primitive against the current heading
    pub fn resolve(&mut self, primitive: Option<PrimitiveCommand>) -> Option<MotionCommand> {
        let old = self.direction;
        let resolved = resolve(primitive, &mut self.direction);

        match resolved {
            Some(command) => debug!(?primitive, %command, "command resolved"),
            None => debug!("no command to resolve"),
        }

        if self.direction != old {
            self.transition(old, self.direction);
        }

        resolved
    }

    fn transition(&self, from: Direction, to: Direction) {
        info!(from = %from, to = %to, "direction changed");

        let _ = self
            .event_tx
            .send(InterpreterEvent::DirectionChanged { from, to });
    }
}

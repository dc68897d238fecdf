//! Motion command definitions and their wire tokens

use serde::{Deserialize, Serialize};

/// Commands produced directly by keyword matching, before direction is
/// taken into account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveCommand {
    Forward,
    Back,
    Left,
    Right,
    Stop,
}

impl PrimitiveCommand {
    /// Rank used to break ties between matches at the same offset.
    /// Higher wins.
    pub fn priority(self) -> u8 {
        match self {
            PrimitiveCommand::Stop => 4,
            PrimitiveCommand::Back => 3,
            PrimitiveCommand::Forward => 2,
            PrimitiveCommand::Left => 1,
            PrimitiveCommand::Right => 0,
        }
    }
}

impl std::fmt::Display for PrimitiveCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&MotionCommand::from(*self), f)
    }
}

/// Dispatch-ready command sent to the car controller.
///
/// "No command" is modelled as `Option::<MotionCommand>::None` and never
/// reaches the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionCommand {
    Stop,
    Forward,
    Back,
    Left,
    Right,
    /// Turn left while moving forward
    LeftForward,
    /// Turn right while moving forward
    RightForward,
    /// Turn left while reversing
    LeftBack,
    /// Turn right while reversing
    RightBack,
}

impl MotionCommand {
    /// Path segment appended to the controller endpoint
    pub fn wire_token(self) -> &'static str {
        match self {
            MotionCommand::Stop => "stop",
            MotionCommand::Forward => "forward",
            MotionCommand::Back => "back",
            MotionCommand::Left => "left",
            MotionCommand::Right => "right",
            MotionCommand::LeftForward => "leftforward",
            MotionCommand::RightForward => "rightforward",
            MotionCommand::LeftBack => "leftback",
            MotionCommand::RightBack => "rightback",
        }
    }
}

impl From<PrimitiveCommand> for MotionCommand {
    fn from(primitive: PrimitiveCommand) -> Self {
        match primitive {
            PrimitiveCommand::Forward => MotionCommand::Forward,
            PrimitiveCommand::Back => MotionCommand::Back,
            PrimitiveCommand::Left => MotionCommand::Left,
            PrimitiveCommand::Right => MotionCommand::Right,
            PrimitiveCommand::Stop => MotionCommand::Stop,
        }
    }
}

impl std::fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tokens() {
        assert_eq!(MotionCommand::Stop.wire_token(), "stop");
        assert_eq!(MotionCommand::LeftForward.wire_token(), "leftforward");
        assert_eq!(MotionCommand::RightBack.wire_token(), "rightback");
    }

    #[test]
    fn test_serde_uses_wire_token() {
        let json = serde_json::to_string(&MotionCommand::LeftBack).unwrap();
        assert_eq!(json, "\"leftback\"");
    }

    #[test]
    fn test_stop_outranks_everything() {
        for other in [
            PrimitiveCommand::Forward,
            PrimitiveCommand::Back,
            PrimitiveCommand::Left,
            PrimitiveCommand::Right,
        ] {
            assert!(PrimitiveCommand::Stop.priority() > other.priority());
        }
    }
}

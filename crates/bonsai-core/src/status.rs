#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Status of a behaviour node, as returned by `run` and surfaced by the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Status {
    /// Not entered, or torn down without reaching a terminal status.
    #[default]
    Inactive,
    Running,
    Success,
    Failure,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Success | Status::Failure)
    }

    pub fn is_running(self) -> bool {
        self == Status::Running
    }

    /// Swaps `Success` and `Failure`; other statuses pass through.
    pub fn invert(self) -> Self {
        match self {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            other => other,
        }
    }

    pub fn from_bool(ok: bool) -> Self {
        if ok {
            Status::Success
        } else {
            Status::Failure
        }
    }
}

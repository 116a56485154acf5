//! Swipe-to-act gesture resolution for task rows.
//!
//! One canonical state machine: the action fires when a drag is released
//! past the threshold (confirm-before-act). Swiping toward the end edits,
//! swiping toward the start deletes.

use crate::model::task::TaskId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fraction of the row width a drag must cover to trigger an action.
pub const DEFAULT_SWIPE_THRESHOLD: f32 = 0.5;

pub const SWIPE_DIRECTION_START_TO_END: &str = "start_to_end";
pub const SWIPE_DIRECTION_END_TO_START: &str = "end_to_start";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    StartToEnd,
    EndToStart,
}

impl SwipeDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartToEnd => SWIPE_DIRECTION_START_TO_END,
            Self::EndToStart => SWIPE_DIRECTION_END_TO_START,
        }
    }

    /// Action bound to this direction.
    pub fn action(self) -> SwipeAction {
        match self {
            Self::StartToEnd => SwipeAction::Edit,
            Self::EndToStart => SwipeAction::Delete,
        }
    }
}

/// Parses a direction from its stable string id.
pub fn parse_swipe_direction(value: &str) -> Result<SwipeDirection, SwipeDirectionError> {
    match value.trim() {
        SWIPE_DIRECTION_START_TO_END => Ok(SwipeDirection::StartToEnd),
        SWIPE_DIRECTION_END_TO_START => Ok(SwipeDirection::EndToStart),
        other => Err(SwipeDirectionError(other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeDirectionError(pub String);

impl Display for SwipeDirectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported swipe direction `{}`; expected {SWIPE_DIRECTION_START_TO_END}|{SWIPE_DIRECTION_END_TO_START}",
            self.0
        )
    }
}

impl Error for SwipeDirectionError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeAction {
    Edit,
    Delete,
}

/// Action confirmed for one task row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeIntent {
    pub task_id: TaskId,
    pub action: SwipeAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwipeState {
    Idle,
    Dragging {
        direction: SwipeDirection,
        /// Covered fraction of the row width, clamped to `0.0..=1.0`.
        progress: f32,
    },
    Settled(SwipeIntent),
}

/// Gesture tracker for a single task row.
#[derive(Debug, Clone)]
pub struct SwipeTracker {
    task_id: TaskId,
    threshold: f32,
    state: SwipeState,
}

impl SwipeTracker {
    pub fn new(task_id: impl Into<TaskId>) -> Self {
        Self::with_threshold(task_id, DEFAULT_SWIPE_THRESHOLD)
    }

    pub fn with_threshold(task_id: impl Into<TaskId>, threshold: f32) -> Self {
        Self {
            task_id: task_id.into(),
            threshold: threshold.clamp(0.0, 1.0),
            state: SwipeState::Idle,
        }
    }

    pub fn state(&self) -> &SwipeState {
        &self.state
    }

    /// Updates the drag by a signed horizontal offset.
    ///
    /// Positive offsets move toward the end edge. Ignored once settled or
    /// when `row_width` is not positive.
    pub fn drag(&mut self, offset: f32, row_width: f32) {
        if matches!(self.state, SwipeState::Settled(_)) || row_width <= 0.0 {
            return;
        }
        self.state = if offset == 0.0 || offset.is_nan() {
            SwipeState::Idle
        } else {
            let direction = if offset > 0.0 {
                SwipeDirection::StartToEnd
            } else {
                SwipeDirection::EndToStart
            };
            SwipeState::Dragging {
                direction,
                progress: (offset.abs() / row_width).min(1.0),
            }
        };
    }

    /// Action a release would trigger right now (background hint).
    pub fn pending_action(&self) -> Option<SwipeAction> {
        match &self.state {
            SwipeState::Dragging {
                direction,
                progress,
            } if *progress >= self.threshold => Some(direction.action()),
            _ => None,
        }
    }

    /// Ends the drag: settles on an intent past the threshold, otherwise
    /// snaps back to idle.
    pub fn release(&mut self) -> Option<SwipeIntent> {
        match self.pending_action() {
            Some(action) => {
                let intent = SwipeIntent {
                    task_id: self.task_id.clone(),
                    action,
                };
                self.state = SwipeState::Settled(intent.clone());
                Some(intent)
            }
            None => {
                if !matches!(self.state, SwipeState::Settled(_)) {
                    self.state = SwipeState::Idle;
                }
                None
            }
        }
    }

    /// Returns the row to idle, e.g. after a failed delete or after editing.
    pub fn reset(&mut self) {
        self.state = SwipeState::Idle;
    }
}

//! Status notifications sent from the render thread to the user-facing layer.

use std::fmt;
use std::sync::mpsc::Sender;

use crate::engine_state::buffer_layout::{StorageMode, StrideMode};
use crate::engine_state::geometry::CubeFactor;

/// The phase of a regeneration that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    /// Building the vertex arrays on the worker
    Compute,
    /// Building the layout on the render thread
    Install,
}

/// Something the user-facing layer should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    StorageMode(StorageMode),
    StrideMode(StrideMode),
    CubeCount(CubeFactor),
    /// A regeneration ran out of memory
    GenerationFailed {
        phase: FailurePhase,
        cube_factor: CubeFactor,
    },
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::StorageMode(mode) => write!(f, "{}", mode),
            StatusEvent::StrideMode(mode) => write!(f, "{}", mode),
            StatusEvent::CubeCount(factor) => write!(f, "{} cubes", factor),
            StatusEvent::GenerationFailed {
                phase: FailurePhase::Compute,
                cube_factor,
            } => write!(f, "OOM generating {} cubes", cube_factor),
            StatusEvent::GenerationFailed {
                phase: FailurePhase::Install,
                cube_factor,
            } => write!(f, "Out of memory uploading {} cubes; try again", cube_factor),
        }
    }
}

/// Receives status events. Implementations hop to whatever thread displays them.
pub trait StatusSink {
    fn publish(&self, event: StatusEvent);
}

impl StatusSink for Sender<StatusEvent> {
    fn publish(&self, event: StatusEvent) {
        if self.send(event).is_err() {
            log::debug!("Status receiver gone, dropping {:?}", event);
        }
    }
}


/// Observable capture state of a session.
///
/// State transitions:
/// ```text
/// idle ⇄ capturing      (driven by the state-change worker)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing,
}

impl CaptureState {
    pub fn from_capturing(capturing: bool) -> Self {
        if capturing {
            Self::Capturing
        } else {
            Self::Idle
        }
    }

    pub fn is_capturing(self) -> bool {
        matches!(self, Self::Capturing)
    }
}

/// Coalesced enable/disable request waiting behind the in-flight transition.
///
/// Only the latest request survives; intermediate ones are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureRequest {
    #[default]
    NoChange,
    Enable,
    Disable,
}

impl CaptureRequest {
    /// The state this request drives toward, if any.
    pub fn target(self) -> Option<CaptureState> {
        match self {
            Self::NoChange => None,
            Self::Enable => Some(CaptureState::Capturing),
            Self::Disable => Some(CaptureState::Idle),
        }
    }

    /// Swap out the pending request, leaving `NoChange` behind.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

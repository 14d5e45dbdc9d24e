use serde::Serialize;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle ──start──▶ recording ──pause──▶ paused
///   ▲                │  ▲                 │
///   │                │  └─────resume──────┘
///   └──────stop──────┴──────────stop──────┘
/// ```
///
/// `stop` on an idle session is accepted and leaves it idle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    #[default]
    Idle,
    Recording,
    Paused,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Recording or paused: a capture file is open.
    pub fn is_active(&self) -> bool {
        !self.is_idle()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }
}

//! Role and mode transitions driven by the button

use core::fmt;

use crate::ports::ButtonEvent;

/// Role of the node in the sync domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Renders locally, listens for leaders
    Standalone,
    /// Inside an election round
    Electing,
    /// Renders locally and broadcasts every frame
    Leader,
    /// Displays the leader's frames
    Follower,
}

impl NodeRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Standalone => "STANDALONE",
            Self::Electing => "ELECTING",
            Self::Leader => "LEADER",
            Self::Follower => "FOLLOWER",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// User-selected rendering mode, orthogonal to the role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingMode {
    /// Fixed brightness and speed
    #[default]
    Plain,
    /// Brightness and speed follow the microphone
    AudioReactive,
}

impl OperatingMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::AudioReactive => "AUDIO",
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Plain => 0,
            Self::AudioReactive => 1,
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Plain),
            1 => Some(Self::AudioReactive),
            _ => None,
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Plain => Self::AudioReactive,
            Self::AudioReactive => Self::Plain,
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a button event asks the node to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Switch between plain and audio-reactive rendering
    ToggleMode,
    /// Become leader, subject to the conflict check
    RequestLeader,
    /// Leave the leader role
    StepDown,
    /// Nothing to do in this role
    Ignore,
}

/// Map a button event to an action for the current role
pub const fn button_action(role: NodeRole, event: ButtonEvent) -> ButtonAction {
    match (event, role) {
        (ButtonEvent::ShortPress, NodeRole::Standalone | NodeRole::Leader) => {
            ButtonAction::ToggleMode
        }
        (ButtonEvent::LongPress, NodeRole::Standalone) => ButtonAction::RequestLeader,
        (ButtonEvent::LongPress, NodeRole::Leader) => ButtonAction::StepDown,
        _ => ButtonAction::Ignore,
    }
}

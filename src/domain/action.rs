use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

/// Lowest AC setpoint offered by the catalog (°C)
pub const AC_MIN_TARGET_C: u8 = 19;
/// Highest AC setpoint offered by the catalog (°C)
pub const AC_MAX_TARGET_C: u8 = 30;

/// One controllable configuration of the AC and the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// AC off, window closed
    Idle,
    /// AC off, window open
    WindowOpen,
    /// AC on at the given setpoint, window closed
    AcOn { target: u8 },
}

impl Action {
    pub fn ac_status(&self) -> u8 {
        match self {
            Action::AcOn { .. } => 1,
            _ => 0,
        }
    }

    pub fn window_status(&self) -> u8 {
        match self {
            Action::WindowOpen => 1,
            _ => 0,
        }
    }

    pub fn ac_target(&self) -> Option<u8> {
        match self {
            Action::AcOn { target } => Some(*target),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Idle => write!(f, "idle"),
            Action::WindowOpen => write!(f, "window_open"),
            Action::AcOn { target } => write!(f, "ac_on({target})"),
        }
    }
}

/// Wire shape: `{"ac": 0|1, "ac_temp": number|null, "window": 0|1}`
impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Action", 3)?;
        s.serialize_field("ac", &self.ac_status())?;
        s.serialize_field("ac_temp", &self.ac_target())?;
        s.serialize_field("window", &self.window_status())?;
        s.end()
    }
}

/// The fixed, ordered set of actions a policy can choose from.
///
/// Index 0 is [`Action::Idle`], index 1 is [`Action::WindowOpen`], and
/// indices 2..=13 are [`Action::AcOn`] for setpoints 19..=30 °C.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCatalog {
    actions: Vec<Action>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        let mut actions = vec![Action::Idle, Action::WindowOpen];
        actions.extend((AC_MIN_TARGET_C..=AC_MAX_TARGET_C).map(|target| Action::AcOn { target }));
        Self { actions }
    }

    pub fn get(&self, index: usize) -> Option<Action> {
        self.actions.get(index).copied()
    }

    pub fn index_of(&self, action: Action) -> Option<usize> {
        self.actions.iter().position(|a| *a == action)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

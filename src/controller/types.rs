//! Backend-neutral identifiers, controls and events
//!
//! Everything the dispatcher and the snapshot builder see of the input
//! subsystem is expressed with these types, so the registry logic never
//! touches a gilrs type directly.

use std::fmt;

/// Identifier assigned by the backend on every physical attach
///
/// A device that is unplugged and plugged back in gets a fresh instance id,
/// which makes it the only safe registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub u32);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Enumeration index reported with attach events
///
/// Only used as a display ordinal. Indices can be reused after a detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceIndex(pub usize);

impl fmt::Display for DeviceIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Canonical controller axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    TriggerLeft,
    TriggerRight,
}

impl ControllerAxis {
    pub const ALL: [ControllerAxis; 6] = [
        ControllerAxis::LeftX,
        ControllerAxis::LeftY,
        ControllerAxis::RightX,
        ControllerAxis::RightY,
        ControllerAxis::TriggerLeft,
        ControllerAxis::TriggerRight,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ControllerAxis::LeftX => "Left_X",
            ControllerAxis::LeftY => "Left_Y",
            ControllerAxis::RightX => "Right_X",
            ControllerAxis::RightY => "Right_Y",
            ControllerAxis::TriggerLeft => "L_Trigger",
            ControllerAxis::TriggerRight => "R_Trigger",
        }
    }
}

// Canonical controller buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerButton {
    A,
    B,
    X,
    Y,
    Back,
    Guide,
    Start,
    LeftStick,
    RightStick,
    LeftShoulder,
    RightShoulder,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
}

impl ControllerButton {
    pub const ALL: [ControllerButton; 15] = [
        ControllerButton::A,
        ControllerButton::B,
        ControllerButton::X,
        ControllerButton::Y,
        ControllerButton::Back,
        ControllerButton::Guide,
        ControllerButton::Start,
        ControllerButton::LeftStick,
        ControllerButton::RightStick,
        ControllerButton::LeftShoulder,
        ControllerButton::RightShoulder,
        ControllerButton::DPadUp,
        ControllerButton::DPadDown,
        ControllerButton::DPadLeft,
        ControllerButton::DPadRight,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ControllerButton::A => "A",
            ControllerButton::B => "B",
            ControllerButton::X => "X",
            ControllerButton::Y => "Y",
            ControllerButton::Back => "BACK",
            ControllerButton::Guide => "GUIDE",
            ControllerButton::Start => "START",
            ControllerButton::LeftStick => "L_STICK",
            ControllerButton::RightStick => "R_STICK",
            ControllerButton::LeftShoulder => "L_SHOULDER",
            ControllerButton::RightShoulder => "R_SHOULDER",
            ControllerButton::DPadUp => "UP",
            ControllerButton::DPadDown => "DOWN",
            ControllerButton::DPadLeft => "LEFT",
            ControllerButton::DPadRight => "RIGHT",
        }
    }
}

/// What the backend knows about a device opened as a controller
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerInfo {
    pub device_index: DeviceIndex,
    /// Instance id the backend opened the device under
    pub instance_id: InstanceId,
    pub name: String,
    /// SDL-layout GUID, 32 lowercase hex characters
    pub guid: String,
}

/// Raw joystick description, available for any attached device
#[derive(Debug, Clone, PartialEq)]
pub struct JoystickInfo {
    pub device_index: DeviceIndex,
    pub instance_id: InstanceId,
    pub name: String,
    pub guid: String,
    /// Whether the device already has a canonical controller mapping
    pub is_controller: bool,
}

/// Events surfaced by the input backend, consumed once per frame in order
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    JoystickAdded {
        device_index: DeviceIndex,
    },
    JoystickRemoved {
        instance_id: InstanceId,
    },
    JoystickAxis {
        instance_id: InstanceId,
        code: u32,
        value: f32,
    },
    JoystickButton {
        instance_id: InstanceId,
        code: u32,
        pressed: bool,
    },
    ControllerAdded {
        device_index: DeviceIndex,
    },
    ControllerRemoved {
        instance_id: InstanceId,
    },
    ControllerRemapped {
        instance_id: InstanceId,
    },
    ControllerAxis {
        instance_id: InstanceId,
        axis: ControllerAxis,
        value: f32,
    },
    ControllerButton {
        instance_id: InstanceId,
        button: ControllerButton,
        pressed: bool,
    },
}

/// Formats a 16 byte device uuid the way SDL mapping files spell GUIDs
pub fn guid_string(uuid: &[u8; 16]) -> String {
    uuid.iter().map(|b| format!("{:02x}", b)).collect()
}

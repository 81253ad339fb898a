//! Seam between the dispatcher and the input subsystem
//!
//! The dispatcher only ever talks to an [`InputBackend`]. The production
//! implementation wraps gilrs ([`super::gilrs_backend::GilrsInput`]); tests
//! drive the dispatcher through the scripted [`mock::MockBackend`].

#[cfg(test)]
pub mod mock;

use crate::config::RumbleConfig;

use super::types::{
    ControllerAxis, ControllerButton, ControllerInfo, DeviceEvent, DeviceIndex, InstanceId,
    JoystickInfo,
};

/// Errors reported by the input subsystem for a single device
///
/// None of these are fatal to the display loop; the dispatcher logs them
/// and drops the event that caused them.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to initialize input subsystem: {0}")]
    Init(String),

    #[error("No device at index {0}")]
    DeviceNotFound(DeviceIndex),

    #[error("Device at index {0} is not a controller")]
    NotAController(DeviceIndex),

    #[error("No mapping found for GUID {0}")]
    NoMapping(String),

    #[error("Mapping for GUID {0} exists but was not applied")]
    MappingRejected(String),

    #[error("Force feedback error: {0}")]
    ForceFeedback(String),
}

impl InputError {
    /// Short error kind used in log lines next to the message
    pub fn kind(&self) -> &'static str {
        match self {
            InputError::Init(_) => "Init",
            InputError::DeviceNotFound(_) => "DeviceNotFound",
            InputError::NotAController(_) => "NotAController",
            InputError::NoMapping(_) => "NoMapping",
            InputError::MappingRejected(_) => "MappingRejected",
            InputError::ForceFeedback(_) => "ForceFeedback",
        }
    }
}

pub trait InputBackend {
    /// Drains every event queued since the last call, oldest first
    fn poll_events(&mut self) -> Vec<DeviceEvent>;

    fn joystick_info(&self, device_index: DeviceIndex) -> Option<JoystickInfo>;

    /// Opens the device at `device_index` as a controller
    fn open_controller(&mut self, device_index: DeviceIndex) -> Result<ControllerInfo, InputError>;

    /// Best-effort promotion of a raw joystick to a controller
    ///
    /// On success the backend announces the device with a
    /// [`DeviceEvent::ControllerAdded`] on a later poll.
    fn convert_joystick(&mut self, device_index: DeviceIndex)
        -> Result<ControllerInfo, InputError>;

    /// Asks the backend to re-announce the device mapping
    ///
    /// Surfaces as a [`DeviceEvent::ControllerRemapped`] on a later poll.
    fn request_remap(&mut self, device_index: DeviceIndex);

    /// Mapping string of the device, if the backend has one
    fn mapping(&self, instance_id: InstanceId) -> Option<String>;

    /// Fires a rumble effect, returns whether the device accepted it
    fn rumble(&mut self, instance_id: InstanceId, settings: &RumbleConfig) -> bool;

    fn axis(&self, instance_id: InstanceId, axis: ControllerAxis) -> f32;

    fn button(&self, instance_id: InstanceId, button: ControllerButton) -> bool;

    fn attached(&self, instance_id: InstanceId) -> bool;

    /// Number of attached devices the backend recognizes as controllers
    fn controller_count(&self) -> usize;

    fn description(&self) -> String;

    fn shutdown(&mut self);
}

//! Event dispatcher
//!
//! Drains the backend once per frame and keeps the [`Registry`] in step with
//! what is physically attached. Every failure is logged and skips only the
//! event that caused it; nothing here can stop the display loop.
//!
//! ```text
//! Backend ──► poll_events ──► handle_event ──► Registry ──► StatusSnapshot
//!                 (once per frame, arrival order)
//! ```

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::config::{AttachPolicy, RumbleConfig};

use super::backend::InputBackend;
use super::registry::{ControllerHandle, Registry};
use super::snapshot::{DisplaySelection, StatusSnapshot};
use super::types::{DeviceEvent, DeviceIndex, InstanceId};

/// What a single event did to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Controller entered the registry under this id
    Registered(InstanceId),
    /// Controller opened and queued until its remap arrives
    Pending(DeviceIndex),
    /// Attach for a device that is already registered or pending
    AlreadyTracked(InstanceId),
    OpenFailed(DeviceIndex),
    Refreshed(InstanceId),
    UnknownRemap(InstanceId),
    /// Remap for a device whose detach has already been seen
    StaleRemap(InstanceId),
    Removed(InstanceId),
    PendingDropped(InstanceId),
    UnknownRemoval(InstanceId),
    JoystickSeen(DeviceIndex),
    JoystickMissing(DeviceIndex),
    Converted(DeviceIndex),
    ConversionFailed(DeviceIndex),
    JoystickGone(InstanceId),
    Motion { instance_id: InstanceId, known: bool },
}

pub struct EventDispatcher<B: InputBackend> {
    backend: B,
    registry: Registry,
    policy: AttachPolicy,
    rumble: RumbleConfig,
    last_event: Option<DateTime<Local>>,
    shut_down: bool,
}

impl<B: InputBackend> EventDispatcher<B> {
    pub fn new(backend: B, policy: AttachPolicy, rumble: RumbleConfig) -> Self {
        info!("Event dispatcher ready ({:?} attach policy)", policy);
        Self {
            backend,
            registry: Registry::new(),
            policy,
            rumble,
            last_event: None,
            shut_down: false,
        }
    }

    /// Processes every event queued since the last frame, returns how many
    pub fn process_frame(&mut self) -> usize {
        let events = self.backend.poll_events();
        if events.is_empty() {
            return 0;
        }

        self.last_event = Some(Local::now());
        let count = events.len();
        for event in events {
            let outcome = self.handle_event(event);
            debug!("Dispatched: {:?}", outcome);
        }
        count
    }

    pub fn handle_event(&mut self, event: DeviceEvent) -> Dispatch {
        match event {
            DeviceEvent::ControllerAdded { device_index } => self.on_controller_added(device_index),
            DeviceEvent::ControllerRemapped { instance_id } => self.on_remapped(instance_id),
            DeviceEvent::ControllerRemoved { instance_id } => self.on_removed(instance_id),
            DeviceEvent::JoystickAdded { device_index } => self.on_joystick_added(device_index),
            DeviceEvent::JoystickRemoved { instance_id } => {
                debug!("Joystick II-{} removed.", instance_id);
                Dispatch::JoystickGone(instance_id)
            }
            DeviceEvent::JoystickAxis {
                instance_id,
                code,
                value,
            } => {
                debug!("Joystick II-{} Axis {}: {:.4}", instance_id, code, value);
                self.motion(instance_id)
            }
            DeviceEvent::JoystickButton {
                instance_id,
                code,
                pressed,
            } => {
                debug!(
                    "Joystick II-{} Button {}: {}",
                    instance_id,
                    code,
                    if pressed { "down" } else { "up" }
                );
                self.motion(instance_id)
            }
            DeviceEvent::ControllerAxis {
                instance_id,
                axis,
                value,
            } => {
                debug!(
                    "Controller {} Axis {}: {:.4}",
                    self.identity(instance_id),
                    axis.label(),
                    value
                );
                self.motion(instance_id)
            }
            DeviceEvent::ControllerButton {
                instance_id,
                button,
                pressed,
            } => {
                debug!(
                    "Controller {} Button {} {}",
                    self.identity(instance_id),
                    button.label(),
                    if pressed { "down" } else { "up" }
                );
                self.motion(instance_id)
            }
        }
    }

    fn on_controller_added(&mut self, device_index: DeviceIndex) -> Dispatch {
        let info = match self.backend.open_controller(device_index) {
            Ok(info) => info,
            Err(e) => {
                let joystick = self.backend.joystick_info(device_index);
                warn!("Controller DI-{} could not be initialized.", device_index);
                warn!(
                    "is_controller: {}",
                    joystick.as_ref().map(|j| j.is_controller).unwrap_or(false)
                );
                warn!(
                    "GUID: {}",
                    joystick
                        .map(|j| j.guid)
                        .unwrap_or_else(|| "unknown".to_string())
                );
                warn!("{}: {}", e.kind(), e);
                return Dispatch::OpenFailed(device_index);
            }
        };

        let instance_id = info.instance_id;
        if self.registry.contains(instance_id)
            || self.registry.pending().any(|p| p.instance_id == instance_id)
        {
            debug!(
                "Controller DI-{} II-{} already tracked, ignoring repeated attach.",
                device_index, instance_id
            );
            return Dispatch::AlreadyTracked(instance_id);
        }

        info!("Controller DI-{} \"{}\" found.", info.device_index, info.name);
        info!("GUID: {}", info.guid);

        match self.policy {
            AttachPolicy::Deferred => {
                self.registry.push_pending(info);
                self.backend.request_remap(device_index);
                Dispatch::Pending(device_index)
            }
            AttachPolicy::Immediate => {
                self.register(ControllerHandle::bind(info, instance_id));
                Dispatch::Registered(instance_id)
            }
        }
    }

    fn on_remapped(&mut self, instance_id: InstanceId) -> Dispatch {
        if let Some(device_index) = self.registry.get(instance_id).map(|h| h.device_index) {
            // Refresh what the backend reports for the device now
            if let Some(joystick) = self.backend.joystick_info(device_index) {
                if joystick.instance_id == instance_id {
                    if let Some(handle) = self.registry.get_mut(instance_id) {
                        handle.name = joystick.name;
                        handle.guid = joystick.guid;
                    }
                }
            }
            info!("Controller {} remapped.", self.identity(instance_id));
            info!("Mapping: {}", self.mapping(instance_id));
            return Dispatch::Refreshed(instance_id);
        }

        if self.registry.pending_len() == 0 {
            info!("Controller DI-?? II-{} \"UNKNOWN\" remapped.", instance_id);
            return Dispatch::UnknownRemap(instance_id);
        }

        let info = match self.registry.remove_pending(instance_id) {
            Some(info) => info,
            None if !self.backend.attached(instance_id) => {
                info!(
                    "Controller DI-?? II-{} \"UNKNOWN\" remapped after detach, ignored.",
                    instance_id
                );
                return Dispatch::StaleRemap(instance_id);
            }
            None => match self.registry.pop_pending() {
                Some(info) => {
                    warn!(
                        "Pending controller DI-{} opened as II-{} bound to II-{}.",
                        info.device_index, info.instance_id, instance_id
                    );
                    info
                }
                None => return Dispatch::UnknownRemap(instance_id),
            },
        };

        self.register(ControllerHandle::bind(info, instance_id));
        Dispatch::Registered(instance_id)
    }

    fn on_removed(&mut self, instance_id: InstanceId) -> Dispatch {
        if let Some((handle, _)) = self.registry.remove(instance_id) {
            info!(
                "Controller DI-{} II-{} \"{}\" removed.",
                handle.device_index, instance_id, handle.name
            );
            return Dispatch::Removed(instance_id);
        }

        if let Some(info) = self.registry.remove_pending(instance_id) {
            info!(
                "Pending controller DI-{} II-{} \"{}\" removed before its remap.",
                info.device_index, instance_id, info.name
            );
            return Dispatch::PendingDropped(instance_id);
        }

        info!("Controller DI-?? II-{} \"UNKNOWN\" removed.", instance_id);
        Dispatch::UnknownRemoval(instance_id)
    }

    fn on_joystick_added(&mut self, device_index: DeviceIndex) -> Dispatch {
        let Some(joystick) = self.backend.joystick_info(device_index) else {
            warn!(
                "Joystick DI-{} disappeared before it could be inspected.",
                device_index
            );
            return Dispatch::JoystickMissing(device_index);
        };

        if joystick.is_controller {
            debug!(
                "Joystick DI-{} II-{} \"{}\" added (Controller).",
                device_index, joystick.instance_id, joystick.name
            );
            debug!("GUID: {}", joystick.guid);
            return Dispatch::JoystickSeen(device_index);
        }

        info!(
            "Joystick DI-{} II-{} \"{}\" added (Joystick).",
            device_index, joystick.instance_id, joystick.name
        );
        info!("GUID: {}", joystick.guid);
        info!("Attempting to convert joystick...");

        match self.backend.convert_joystick(device_index) {
            Ok(converted) => {
                let rumble = self.backend.rumble(converted.instance_id, &self.rumble);
                info!(
                    "Converted DI-{} \"{}\". Rumble: {}",
                    converted.device_index, converted.name, rumble
                );
                info!("Mapping: {}", self.mapping(converted.instance_id));
                Dispatch::Converted(device_index)
            }
            Err(e) => {
                warn!(
                    "Failed to convert Joystick DI-{} II-{} \"{}\"",
                    device_index, joystick.instance_id, joystick.name
                );
                warn!("{}: {}", e.kind(), e);
                Dispatch::ConversionFailed(device_index)
            }
        }
    }

    fn register(&mut self, handle: ControllerHandle) {
        let instance_id = handle.instance_id;
        let rumble = self.backend.rumble(instance_id, &self.rumble);
        if let Some(previous) = self.registry.insert(handle, rumble) {
            warn!(
                "Controller II-{} replaced previous entry \"{}\".",
                instance_id, previous.name
            );
        }
        info!(
            "Controller {} added. Rumble: {}",
            self.identity(instance_id),
            rumble
        );
        info!("Mapping: {}", self.mapping(instance_id));
    }

    fn motion(&self, instance_id: InstanceId) -> Dispatch {
        Dispatch::Motion {
            instance_id,
            known: self.registry.contains(instance_id),
        }
    }

    /// `DI-n II-m "name"`, with placeholders for unregistered ids
    fn identity(&self, instance_id: InstanceId) -> String {
        match self.registry.get(instance_id) {
            Some(handle) => format!(
                "DI-{} II-{} \"{}\"",
                handle.device_index, instance_id, handle.name
            ),
            None => format!("DI-?? II-{} \"UNKNOWN\"", instance_id),
        }
    }

    fn mapping(&self, instance_id: InstanceId) -> String {
        self.backend
            .mapping(instance_id)
            .unwrap_or_else(|| "<none>".to_string())
    }

    /// Fires a rumble test on every registered controller and records the
    /// results
    pub fn rumble_all(&mut self) {
        for instance_id in self.registry.instance_ids() {
            let supported = self.backend.rumble(instance_id, &self.rumble);
            self.registry.set_rumble(instance_id, supported);
            info!(
                "Rumble test Controller {}: {}",
                self.identity(instance_id),
                supported
            );
        }
    }

    pub fn snapshot(&self, selection: &mut DisplaySelection) -> StatusSnapshot {
        selection.clamp(self.registry.len());
        StatusSnapshot::build(&self.backend, &self.registry, self.last_event, selection)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn description(&self) -> String {
        self.backend.description()
    }

    /// Shuts the input subsystem down; later calls are no-ops
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        info!(
            "Shutting down input subsystem with {} controller(s) registered",
            self.registry.len()
        );
        self.backend.shutdown();
        self.shut_down = true;
    }
}

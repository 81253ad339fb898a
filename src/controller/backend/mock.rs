use super::{InputBackend, InputError};
use crate::config::RumbleConfig;
use crate::controller::types::{
    ControllerAxis, ControllerButton, ControllerInfo, DeviceEvent, DeviceIndex, InstanceId,
    JoystickInfo,
};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
pub struct MockDevice {
    pub instance_id: InstanceId,
    pub name: String,
    pub guid: String,
    pub is_controller: bool,
    pub convertible: bool,
    pub rumble: bool,
    pub attached: bool,
    pub axes: HashMap<ControllerAxis, f32>,
    pub buttons: HashSet<ControllerButton>,
}

impl MockDevice {
    pub fn controller(instance_id: u32, name: &str) -> Self {
        Self {
            instance_id: InstanceId(instance_id),
            name: name.to_string(),
            guid: format!("{:032x}", instance_id),
            is_controller: true,
            convertible: false,
            rumble: true,
            attached: true,
            axes: HashMap::new(),
            buttons: HashSet::new(),
        }
    }

    pub fn joystick(instance_id: u32, name: &str, convertible: bool) -> Self {
        Self {
            is_controller: false,
            convertible,
            rumble: false,
            ..Self::controller(instance_id, name)
        }
    }
}

/// Scripted backend: devices are registered up front, events are queued by
/// the test and drained by `poll_events` exactly like the real one.
#[derive(Debug, Default)]
pub struct MockBackend {
    devices: HashMap<DeviceIndex, MockDevice>,
    queue: VecDeque<DeviceEvent>,
    pub remap_requests: Vec<DeviceIndex>,
    pub rumble_calls: Vec<InstanceId>,
    pub shut_down: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&mut self, index: usize, device: MockDevice) {
        self.devices.insert(DeviceIndex(index), device);
    }

    pub fn device(&self, index: usize) -> Option<&MockDevice> {
        self.devices.get(&DeviceIndex(index))
    }

    pub fn device_mut(&mut self, index: usize) -> Option<&mut MockDevice> {
        self.devices.get_mut(&DeviceIndex(index))
    }

    pub fn push(&mut self, event: DeviceEvent) {
        self.queue.push_back(event);
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn by_instance(&self, instance_id: InstanceId) -> Option<&MockDevice> {
        self.devices
            .values()
            .find(|device| device.instance_id == instance_id)
    }

    fn info(index: DeviceIndex, device: &MockDevice) -> ControllerInfo {
        ControllerInfo {
            device_index: index,
            instance_id: device.instance_id,
            name: device.name.clone(),
            guid: device.guid.clone(),
        }
    }
}

impl InputBackend for MockBackend {
    fn poll_events(&mut self) -> Vec<DeviceEvent> {
        self.queue.drain(..).collect()
    }

    fn joystick_info(&self, device_index: DeviceIndex) -> Option<JoystickInfo> {
        self.devices.get(&device_index).map(|device| JoystickInfo {
            device_index,
            instance_id: device.instance_id,
            name: device.name.clone(),
            guid: device.guid.clone(),
            is_controller: device.is_controller,
        })
    }

    fn open_controller(&mut self, device_index: DeviceIndex) -> Result<ControllerInfo, InputError> {
        let device = self
            .devices
            .get(&device_index)
            .filter(|device| device.attached)
            .ok_or(InputError::DeviceNotFound(device_index))?;
        if !device.is_controller {
            return Err(InputError::NotAController(device_index));
        }
        Ok(Self::info(device_index, device))
    }

    fn convert_joystick(
        &mut self,
        device_index: DeviceIndex,
    ) -> Result<ControllerInfo, InputError> {
        let device = self
            .devices
            .get_mut(&device_index)
            .ok_or(InputError::DeviceNotFound(device_index))?;
        if !device.convertible {
            return Err(InputError::NoMapping(device.guid.clone()));
        }
        device.is_controller = true;
        let info = Self::info(device_index, device);
        self.queue
            .push_back(DeviceEvent::ControllerAdded { device_index });
        Ok(info)
    }

    fn request_remap(&mut self, device_index: DeviceIndex) {
        self.remap_requests.push(device_index);
        if let Some(device) = self.devices.get(&device_index) {
            self.queue.push_back(DeviceEvent::ControllerRemapped {
                instance_id: device.instance_id,
            });
        }
    }

    fn mapping(&self, instance_id: InstanceId) -> Option<String> {
        self.by_instance(instance_id)
            .map(|device| format!("{},{},a:b0,b:b1,", device.guid, device.name))
    }

    fn rumble(&mut self, instance_id: InstanceId, _settings: &RumbleConfig) -> bool {
        self.rumble_calls.push(instance_id);
        self.by_instance(instance_id)
            .map(|device| device.attached && device.rumble)
            .unwrap_or(false)
    }

    fn axis(&self, instance_id: InstanceId, axis: ControllerAxis) -> f32 {
        self.by_instance(instance_id)
            .and_then(|device| device.axes.get(&axis).copied())
            .unwrap_or(0.0)
    }

    fn button(&self, instance_id: InstanceId, button: ControllerButton) -> bool {
        self.by_instance(instance_id)
            .map(|device| device.buttons.contains(&button))
            .unwrap_or(false)
    }

    fn attached(&self, instance_id: InstanceId) -> bool {
        self.by_instance(instance_id)
            .map(|device| device.attached)
            .unwrap_or(false)
    }

    fn controller_count(&self) -> usize {
        self.devices
            .values()
            .filter(|device| device.attached && device.is_controller)
            .count()
    }

    fn description(&self) -> String {
        "mock backend".to_string()
    }

    fn shutdown(&mut self) {
        self.queue.clear();
        self.shut_down = true;
    }
}

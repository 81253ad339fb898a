use gilrs::ff::{BaseEffect, BaseEffectType, Effect, EffectBuilder, Replay, Ticks};
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs, GilrsBuilder, MappingSource};
use statum::{machine, state};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::config::{InputConfig, RumbleConfig};

use super::backend::{InputBackend, InputError};
use super::mapping_db::{sdl_platform, MappingDatabase};
use super::types::{
    guid_string, ControllerAxis, ControllerButton, ControllerInfo, DeviceEvent, DeviceIndex,
    InstanceId, JoystickInfo,
};

// Define backend states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum InputState {
    Initializing,
    Polling,
}

#[machine]
pub struct GilrsInput<S: InputState> {
    // Gilrs context
    gilrs: Gilrs,

    // Mappings the context was built with
    mappings: MappingDatabase,

    // Next instance id to hand out
    next_instance: u32,

    // Live gamepads and their instance ids
    instances: HashMap<GamepadId, InstanceId>,
    gamepads: HashMap<InstanceId, GamepadId>,

    // Instances announced as controllers
    controllers: HashSet<InstanceId>,

    // Events raised by the backend itself, delivered before gilrs events
    synthetic: VecDeque<DeviceEvent>,

    // Running rumble effects, kept alive until they expire
    effects: Vec<(Effect, Instant)>,
}

// Implementation of methods available in all states
impl<S: InputState> GilrsInput<S> {
    fn announce(&mut self, id: GamepadId, out: &mut Vec<DeviceEvent>) {
        if self.instances.contains_key(&id) {
            debug!("Gamepad {} already announced", id);
            return;
        }

        let instance_id = InstanceId(self.next_instance);
        self.next_instance += 1;
        self.instances.insert(id, instance_id);
        self.gamepads.insert(instance_id, id);

        let device_index = DeviceIndex(usize::from(id));
        out.push(DeviceEvent::JoystickAdded { device_index });

        let gamepad = self.gilrs.gamepad(id);
        if is_controller(&gamepad) {
            self.controllers.insert(instance_id);
            out.push(DeviceEvent::ControllerAdded { device_index });
        }
        debug!(
            "Announced gamepad {} as II-{} ({:?} mapping)",
            id,
            instance_id,
            gamepad.mapping_source()
        );
    }
}

// Implementation for Initializing state
impl GilrsInput<Initializing> {
    /// Builds the gilrs context with the configured mapping database
    pub fn create(config: &InputConfig) -> Result<Self, InputError> {
        let path = config.mapping_database_path();
        let mappings = match MappingDatabase::load(&path, sdl_platform()) {
            Ok(db) => db,
            Err(e) => {
                warn!("{}, continuing without extra mappings", e);
                MappingDatabase::default()
            }
        };

        info!("Initializing gilrs controller interface");
        if mappings.is_empty() {
            warn!("No controller mappings loaded, gamepads will only appear as joysticks");
        }
        let builder = GilrsBuilder::new()
            .add_included_mappings(false)
            .add_env_mappings(false)
            .add_mappings(&mappings.to_sdl_mappings());

        let gilrs = match builder.build() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(gilrs::Error::NotImplemented(dummy)) => {
                warn!("Current platform is not supported by gilrs, no devices will appear");
                dummy
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(InputError::Init(e.to_string()));
            }
        };

        Ok(Self::new(
            gilrs,
            mappings,
            1,
            HashMap::new(),
            HashMap::new(),
            HashSet::new(),
            VecDeque::new(),
            Vec::new(),
        ))
    }

    /// Announces gamepads that were present before the first poll and
    /// transitions to Polling
    pub fn initialize(mut self) -> GilrsInput<Polling> {
        let present: Vec<GamepadId> = self.gilrs.gamepads().map(|(id, _)| id).collect();
        info!("Found {} gamepad(s) at startup", present.len());

        let mut events = Vec::new();
        for id in present {
            self.announce(id, &mut events);
        }
        self.synthetic.extend(events);

        self.transition()
    }
}

// Implementation for the Polling state
impl GilrsInput<Polling> {
    fn gamepad_for(&self, instance_id: InstanceId) -> Option<Gamepad<'_>> {
        let id = *self.gamepads.get(&instance_id)?;
        self.gilrs.connected_gamepad(id)
    }

    fn gamepad_at(&self, device_index: DeviceIndex) -> Option<(GamepadId, Gamepad<'_>)> {
        self.gilrs
            .gamepads()
            .find(|(id, _)| usize::from(*id) == device_index.0)
    }

    fn controller_info(&self, device_index: DeviceIndex) -> Result<ControllerInfo, InputError> {
        let (id, gamepad) = self
            .gamepad_at(device_index)
            .ok_or(InputError::DeviceNotFound(device_index))?;
        let instance_id = *self
            .instances
            .get(&id)
            .ok_or(InputError::DeviceNotFound(device_index))?;
        Ok(ControllerInfo {
            device_index,
            instance_id,
            name: gamepad.name().to_string(),
            guid: guid_string(&gamepad.uuid()),
        })
    }

    fn translate(&mut self, event: Event, out: &mut Vec<DeviceEvent>) {
        let Event { id, event, .. } = event;

        if let EventType::Connected = event {
            self.announce(id, out);
            return;
        }

        let Some(&instance_id) = self.instances.get(&id) else {
            trace!("Dropping {:?} from unannounced gamepad {}", event, id);
            return;
        };
        let controller = self.controllers.contains(&instance_id);

        let input = RawInput::from(event);
        if let RawInput::Disconnected = input {
            self.instances.remove(&id);
            self.gamepads.remove(&instance_id);
            self.controllers.remove(&instance_id);
        }

        let events = device_events(instance_id, controller, input);
        if events.is_empty() {
            trace!("Ignoring {:?} from II-{}", event, instance_id);
        }
        out.extend(events);
    }
}

impl InputBackend for GilrsInput<Polling> {
    fn poll_events(&mut self) -> Vec<DeviceEvent> {
        let now = Instant::now();
        self.effects.retain(|(_, until)| *until > now);

        let mut events: Vec<DeviceEvent> = self.synthetic.drain(..).collect();
        while let Some(event) = self.gilrs.next_event() {
            self.translate(event, &mut events);
        }
        self.gilrs.inc();
        events
    }

    fn joystick_info(&self, device_index: DeviceIndex) -> Option<JoystickInfo> {
        let (id, gamepad) = self.gamepad_at(device_index)?;
        let instance_id = *self.instances.get(&id)?;
        Some(JoystickInfo {
            device_index,
            instance_id,
            name: gamepad.name().to_string(),
            guid: guid_string(&gamepad.uuid()),
            is_controller: self.controllers.contains(&instance_id),
        })
    }

    fn open_controller(&mut self, device_index: DeviceIndex) -> Result<ControllerInfo, InputError> {
        let info = self.controller_info(device_index)?;
        if !self.controllers.contains(&info.instance_id) {
            return Err(InputError::NotAController(device_index));
        }
        Ok(info)
    }

    fn convert_joystick(
        &mut self,
        device_index: DeviceIndex,
    ) -> Result<ControllerInfo, InputError> {
        let info = self.controller_info(device_index)?;
        if self.controllers.contains(&info.instance_id) {
            return Ok(info);
        }

        let (_, gamepad) = self
            .gamepad_at(device_index)
            .ok_or(InputError::DeviceNotFound(device_index))?;
        match gamepad.mapping_source() {
            MappingSource::Driver => {
                // The driver layout is the best mapping available
                self.controllers.insert(info.instance_id);
                self.synthetic
                    .push_back(DeviceEvent::ControllerAdded { device_index });
                Ok(info)
            }
            _ => match self.mappings.get(&info.guid) {
                Some(entry) => {
                    debug!("Mapping \"{}\" for {} was not applied", entry.name, entry.guid);
                    Err(InputError::MappingRejected(info.guid))
                }
                None => Err(InputError::NoMapping(info.guid)),
            },
        }
    }

    fn request_remap(&mut self, device_index: DeviceIndex) {
        let instance_id = self
            .gamepad_at(device_index)
            .and_then(|(id, _)| self.instances.get(&id).copied());
        match instance_id {
            Some(instance_id) => self
                .synthetic
                .push_back(DeviceEvent::ControllerRemapped { instance_id }),
            None => debug!("Remap requested for missing device DI-{}", device_index),
        }
    }

    fn mapping(&self, instance_id: InstanceId) -> Option<String> {
        let gamepad = self.gamepad_for(instance_id)?;
        let guid = guid_string(&gamepad.uuid());
        match self.mappings.get(&guid) {
            Some(entry) => Some(entry.line.clone()),
            None => match gamepad.mapping_source() {
                MappingSource::None => None,
                source => Some(format!("{},{},<{:?} mapping>", guid, gamepad.name(), source)),
            },
        }
    }

    fn rumble(&mut self, instance_id: InstanceId, settings: &RumbleConfig) -> bool {
        let Some(&id) = self.gamepads.get(&instance_id) else {
            return false;
        };
        match self.gilrs.connected_gamepad(id) {
            Some(gamepad) if gamepad.is_ff_supported() => {}
            _ => return false,
        }

        let duration = Ticks::from_ms(settings.duration_ms.min(u32::MAX as u64) as u32);
        let scheduling = Replay {
            play_for: duration,
            ..Default::default()
        };
        let effect = EffectBuilder::new()
            .add_effect(BaseEffect {
                kind: BaseEffectType::Strong {
                    magnitude: RumbleConfig::magnitude(settings.low_frequency),
                },
                scheduling,
                ..Default::default()
            })
            .add_effect(BaseEffect {
                kind: BaseEffectType::Weak {
                    magnitude: RumbleConfig::magnitude(settings.high_frequency),
                },
                scheduling,
                ..Default::default()
            })
            .gamepads(&[id])
            .finish(&mut self.gilrs);

        let played = effect.and_then(|effect| {
            effect.play()?;
            Ok(effect)
        });
        match played {
            Ok(effect) => {
                self.effects
                    .push((effect, Instant::now() + settings.duration()));
                true
            }
            Err(e) => {
                debug!("Rumble on II-{} failed: {}", instance_id, e);
                false
            }
        }
    }

    fn axis(&self, instance_id: InstanceId, axis: ControllerAxis) -> f32 {
        let Some(gamepad) = self.gamepad_for(instance_id) else {
            return 0.0;
        };
        match axis {
            ControllerAxis::LeftX => gamepad.value(Axis::LeftStickX),
            ControllerAxis::LeftY => gamepad.value(Axis::LeftStickY),
            ControllerAxis::RightX => gamepad.value(Axis::RightStickX),
            ControllerAxis::RightY => gamepad.value(Axis::RightStickY),
            ControllerAxis::TriggerLeft => trigger_value(&gamepad, Button::LeftTrigger2, Axis::LeftZ),
            ControllerAxis::TriggerRight => {
                trigger_value(&gamepad, Button::RightTrigger2, Axis::RightZ)
            }
        }
    }

    fn button(&self, instance_id: InstanceId, button: ControllerButton) -> bool {
        self.gamepad_for(instance_id)
            .map(|gamepad| gamepad.is_pressed(to_gilrs_button(button)))
            .unwrap_or(false)
    }

    fn attached(&self, instance_id: InstanceId) -> bool {
        self.gamepad_for(instance_id).is_some()
    }

    fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    fn description(&self) -> String {
        format!(
            "controllertest v{} gilrs ({}), {} mappings",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            self.mappings.len()
        )
    }

    fn shutdown(&mut self) {
        info!(
            "Stopping {} rumble effect(s), releasing {} device(s)",
            self.effects.len(),
            self.instances.len()
        );
        self.effects.clear();
        self.synthetic.clear();
        self.controllers.clear();
        self.instances.clear();
        self.gamepads.clear();
    }
}

fn is_controller(gamepad: &Gamepad<'_>) -> bool {
    gamepad.mapping_source() == MappingSource::SdlMappings
}

fn trigger_value(gamepad: &Gamepad<'_>, button: Button, axis: Axis) -> f32 {
    gamepad
        .button_data(button)
        .map(|data| data.value())
        .unwrap_or_else(|| gamepad.value(axis))
}

/// Gamepad input with the gilrs event code reduced to its number
#[derive(Debug, Clone, Copy, PartialEq)]
enum RawInput {
    Disconnected,
    Axis(Axis, f32, u32),
    Button(Button, bool, u32),
    Analog(Button, f32),
    Other,
}

impl From<EventType> for RawInput {
    fn from(event: EventType) -> Self {
        match event {
            EventType::Disconnected => RawInput::Disconnected,
            EventType::AxisChanged(axis, value, code) => RawInput::Axis(axis, value, code.into_u32()),
            EventType::ButtonPressed(button, code) => RawInput::Button(button, true, code.into_u32()),
            EventType::ButtonReleased(button, code) => {
                RawInput::Button(button, false, code.into_u32())
            }
            EventType::ButtonChanged(button, value, _) => RawInput::Analog(button, value),
            _ => RawInput::Other,
        }
    }
}

/// Device events for input from an announced gamepad. Controllers report
/// canonical axes and buttons, everything else falls back to raw codes.
fn device_events(instance_id: InstanceId, controller: bool, input: RawInput) -> Vec<DeviceEvent> {
    match input {
        RawInput::Disconnected => {
            let mut events = vec![DeviceEvent::JoystickRemoved { instance_id }];
            if controller {
                events.push(DeviceEvent::ControllerRemoved { instance_id });
            }
            events
        }
        RawInput::Axis(axis, value, code) => match map_axis(axis) {
            Some(axis) if controller => vec![DeviceEvent::ControllerAxis {
                instance_id,
                axis,
                value,
            }],
            _ => vec![DeviceEvent::JoystickAxis {
                instance_id,
                code,
                value,
            }],
        },
        RawInput::Button(button, pressed, code) => match map_button(button) {
            Some(button) if controller => vec![DeviceEvent::ControllerButton {
                instance_id,
                button,
                pressed,
            }],
            _ => vec![DeviceEvent::JoystickButton {
                instance_id,
                code,
                pressed,
            }],
        },
        // Analog triggers are axes in the canonical layout
        RawInput::Analog(Button::LeftTrigger2, value) if controller => {
            vec![DeviceEvent::ControllerAxis {
                instance_id,
                axis: ControllerAxis::TriggerLeft,
                value,
            }]
        }
        RawInput::Analog(Button::RightTrigger2, value) if controller => {
            vec![DeviceEvent::ControllerAxis {
                instance_id,
                axis: ControllerAxis::TriggerRight,
                value,
            }]
        }
        RawInput::Analog(..) | RawInput::Other => Vec::new(),
    }
}

// Helper function to map gilrs Axis to our ControllerAxis
fn map_axis(axis: Axis) -> Option<ControllerAxis> {
    match axis {
        Axis::LeftStickX => Some(ControllerAxis::LeftX),
        Axis::LeftStickY => Some(ControllerAxis::LeftY),
        Axis::RightStickX => Some(ControllerAxis::RightX),
        Axis::RightStickY => Some(ControllerAxis::RightY),
        Axis::LeftZ => Some(ControllerAxis::TriggerLeft),
        Axis::RightZ => Some(ControllerAxis::TriggerRight),
        _ => None,
    }
}

// Helper function to map gilrs Button to our ControllerButton
fn map_button(button: Button) -> Option<ControllerButton> {
    match button {
        Button::South => Some(ControllerButton::A),
        Button::East => Some(ControllerButton::B),
        Button::West => Some(ControllerButton::X),
        Button::North => Some(ControllerButton::Y),
        Button::Select => Some(ControllerButton::Back),
        Button::Mode => Some(ControllerButton::Guide),
        Button::Start => Some(ControllerButton::Start),
        Button::LeftThumb => Some(ControllerButton::LeftStick),
        Button::RightThumb => Some(ControllerButton::RightStick),
        Button::LeftTrigger => Some(ControllerButton::LeftShoulder),
        Button::RightTrigger => Some(ControllerButton::RightShoulder),
        Button::DPadUp => Some(ControllerButton::DPadUp),
        Button::DPadDown => Some(ControllerButton::DPadDown),
        Button::DPadLeft => Some(ControllerButton::DPadLeft),
        Button::DPadRight => Some(ControllerButton::DPadRight),
        _ => None,
    }
}

fn to_gilrs_button(button: ControllerButton) -> Button {
    match button {
        ControllerButton::A => Button::South,
        ControllerButton::B => Button::East,
        ControllerButton::X => Button::West,
        ControllerButton::Y => Button::North,
        ControllerButton::Back => Button::Select,
        ControllerButton::Guide => Button::Mode,
        ControllerButton::Start => Button::Start,
        ControllerButton::LeftStick => Button::LeftThumb,
        ControllerButton::RightStick => Button::RightThumb,
        ControllerButton::LeftShoulder => Button::LeftTrigger,
        ControllerButton::RightShoulder => Button::RightTrigger,
        ControllerButton::DPadUp => Button::DPadUp,
        ControllerButton::DPadDown => Button::DPadDown,
        ControllerButton::DPadLeft => Button::DPadLeft,
        ControllerButton::DPadRight => Button::DPadRight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_mapping_round_trips() {
        for button in ControllerButton::ALL {
            assert_eq!(map_button(to_gilrs_button(button)), Some(button));
        }
        assert_eq!(map_button(Button::C), None);
    }

    #[test]
    fn disconnect_of_controller_removes_joystick_and_controller() {
        let id = InstanceId(3);
        assert_eq!(
            device_events(id, true, RawInput::Disconnected),
            vec![
                DeviceEvent::JoystickRemoved { instance_id: id },
                DeviceEvent::ControllerRemoved { instance_id: id },
            ]
        );
        assert_eq!(
            device_events(id, false, RawInput::Disconnected),
            vec![DeviceEvent::JoystickRemoved { instance_id: id }]
        );
    }

    #[test]
    fn analog_trigger_becomes_controller_axis() {
        let id = InstanceId(1);
        assert_eq!(
            device_events(id, true, RawInput::Analog(Button::RightTrigger2, 0.5)),
            vec![DeviceEvent::ControllerAxis {
                instance_id: id,
                axis: ControllerAxis::TriggerRight,
                value: 0.5,
            }]
        );
        assert!(device_events(id, true, RawInput::Analog(Button::South, 1.0)).is_empty());
        assert!(device_events(id, false, RawInput::Analog(Button::LeftTrigger2, 1.0)).is_empty());
    }

    #[test]
    fn joystick_input_keeps_raw_codes() {
        let id = InstanceId(2);
        assert_eq!(
            device_events(id, false, RawInput::Button(Button::South, true, 304)),
            vec![DeviceEvent::JoystickButton {
                instance_id: id,
                code: 304,
                pressed: true,
            }]
        );
        assert_eq!(
            device_events(id, false, RawInput::Axis(Axis::LeftStickX, -1.0, 0)),
            vec![DeviceEvent::JoystickAxis {
                instance_id: id,
                code: 0,
                value: -1.0,
            }]
        );
    }

    #[test]
    fn controller_input_uses_canonical_layout() {
        let id = InstanceId(5);
        assert_eq!(
            device_events(id, true, RawInput::Button(Button::Start, false, 315)),
            vec![DeviceEvent::ControllerButton {
                instance_id: id,
                button: ControllerButton::Start,
                pressed: false,
            }]
        );
        assert_eq!(
            device_events(id, true, RawInput::Axis(Axis::LeftStickY, 0.25, 1)),
            vec![DeviceEvent::ControllerAxis {
                instance_id: id,
                axis: ControllerAxis::LeftY,
                value: 0.25,
            }]
        );
        // Unmapped buttons on a controller still surface as raw input
        assert_eq!(
            device_events(id, true, RawInput::Button(Button::C, true, 306)),
            vec![DeviceEvent::JoystickButton {
                instance_id: id,
                code: 306,
                pressed: true,
            }]
        );
        assert!(device_events(id, true, RawInput::Other).is_empty());
    }

    #[test]
    fn stick_and_trigger_axes_are_mapped() {
        assert_eq!(map_axis(Axis::LeftStickX), Some(ControllerAxis::LeftX));
        assert_eq!(map_axis(Axis::RightZ), Some(ControllerAxis::TriggerRight));
        assert_eq!(map_axis(Axis::DPadX), None);
    }
}

//! Per-frame text snapshot of the registry
//!
//! Live readings come from the backend at build time. Only controllers still
//! in the registry are queried, so a detached handle is never read.

use chrono::{DateTime, Local};
use std::fmt;

use crate::config::DisplayMode;

use super::backend::InputBackend;
use super::registry::{ControllerHandle, Registry};
use super::types::{ControllerAxis, ControllerButton};

/// Which controllers the snapshot shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplaySelection {
    mode: DisplayMode,
    index: usize,
}

impl DisplaySelection {
    pub fn new(mode: DisplayMode) -> Self {
        Self { mode, index: 0 }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn next(&mut self, count: usize) {
        self.index = if count == 0 {
            0
        } else {
            (self.index + 1) % count
        };
    }

    pub fn previous(&mut self, count: usize) {
        self.index = if count == 0 {
            0
        } else {
            (self.index + count - 1) % count
        };
    }

    /// Keeps the index valid after the registry shrank
    pub fn clamp(&mut self, count: usize) {
        if count == 0 {
            self.index = 0;
        } else if self.index >= count {
            self.index = count - 1;
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            DisplayMode::Single => DisplayMode::All,
            DisplayMode::All => DisplayMode::Single,
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    lines: Vec<String>,
}

impl StatusSnapshot {
    pub fn build<B: InputBackend>(
        backend: &B,
        registry: &Registry,
        last_event: Option<DateTime<Local>>,
        selection: &DisplaySelection,
    ) -> Self {
        let mut lines = vec![format!(
            "{} controller(s) detected, {} registered, {} pending. (ESC to quit.)",
            backend.controller_count(),
            registry.len(),
            registry.pending_len()
        )];

        lines.push(match last_event {
            Some(time) => format!("Last event: {}", time.format("%H:%M:%S%.3f")),
            None => "Last event: none".to_string(),
        });

        let total = registry.len();
        for (position, (handle, rumble)) in registry.iter().enumerate() {
            match selection.mode() {
                DisplayMode::Single => {
                    if position != selection.index() {
                        continue;
                    }
                    lines.push(format!(
                        "Controller {}/{} (Arrow keys cycle, Tab shows all.)",
                        position + 1,
                        total
                    ));
                }
                DisplayMode::All => lines.push(String::new()),
            }
            controller_lines(backend, handle, rumble, &mut lines);
        }

        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

fn controller_lines<B: InputBackend>(
    backend: &B,
    handle: &ControllerHandle,
    rumble: bool,
    lines: &mut Vec<String>,
) {
    let id = handle.instance_id;
    lines.push(format!(
        "Controller DI-{} II-{} \"{}\"",
        handle.device_index, id, handle.name
    ));
    lines.push(format!(
        "Rumble supported: {} (Press R to test rumble.)",
        rumble
    ));
    lines.push(format!("Attached: {}", backend.attached(id)));

    for axis in ControllerAxis::ALL {
        lines.push(format!("Axis {}: {:.3}", axis.label(), backend.axis(id, axis)));
    }
    for button in ControllerButton::ALL {
        lines.push(format!(
            "Button {}: {}",
            button.label(),
            backend.button(id, button)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::backend::mock::{MockBackend, MockDevice};
    use crate::controller::registry::ControllerHandle;
    use crate::controller::types::{ControllerInfo, DeviceIndex, InstanceId};

    fn setup() -> (MockBackend, Registry) {
        let mut backend = MockBackend::new();
        let mut pad = MockDevice::controller(4, "Pad A");
        pad.axes.insert(ControllerAxis::LeftX, -0.25);
        pad.buttons.insert(ControllerButton::Start);
        backend.add_device(0, pad);
        backend.add_device(1, MockDevice::controller(9, "Pad B"));

        let mut registry = Registry::new();
        for (index, id, name, rumble) in [(0, 4, "Pad A", true), (1, 9, "Pad B", false)] {
            let info = ControllerInfo {
                device_index: DeviceIndex(index),
                instance_id: InstanceId(id),
                name: name.to_string(),
                guid: String::new(),
            };
            registry.insert(ControllerHandle::bind(info, InstanceId(id)), rumble);
        }
        (backend, registry)
    }

    #[test]
    fn single_mode_shows_selected_controller() {
        let (backend, registry) = setup();
        let selection = DisplaySelection::new(DisplayMode::Single);

        let snapshot = StatusSnapshot::build(&backend, &registry, None, &selection);
        let lines = snapshot.lines();

        assert_eq!(
            lines[0],
            "2 controller(s) detected, 2 registered, 0 pending. (ESC to quit.)"
        );
        assert_eq!(lines[1], "Last event: none");
        assert_eq!(lines[2], "Controller 1/2 (Arrow keys cycle, Tab shows all.)");
        assert_eq!(lines[3], "Controller DI-0 II-4 \"Pad A\"");
        assert_eq!(lines[4], "Rumble supported: true (Press R to test rumble.)");
        assert_eq!(lines[5], "Attached: true");
        assert!(lines.contains(&"Axis Left_X: -0.250".to_string()));
        assert!(lines.contains(&"Axis R_Trigger: 0.000".to_string()));
        assert!(lines.contains(&"Button START: true".to_string()));
        assert!(lines.contains(&"Button A: false".to_string()));
        assert!(!snapshot.to_string().contains("Pad B"));
        assert_eq!(
            lines.len(),
            6 + ControllerAxis::ALL.len() + ControllerButton::ALL.len()
        );
    }

    #[test]
    fn all_mode_lists_every_controller() {
        let (backend, registry) = setup();
        let selection = DisplaySelection::new(DisplayMode::All);

        let text = StatusSnapshot::build(&backend, &registry, None, &selection).to_string();

        assert!(text.contains("Controller DI-0 II-4 \"Pad A\""));
        assert!(text.contains("Controller DI-1 II-9 \"Pad B\""));
        assert!(text.contains("Rumble supported: false"));
        assert!(!text.contains("Arrow keys cycle"));
    }

    #[test]
    fn empty_registry_still_renders_header() {
        let backend = MockBackend::new();
        let registry = Registry::new();
        let snapshot =
            StatusSnapshot::build(&backend, &registry, None, &DisplaySelection::default());
        assert_eq!(snapshot.lines().len(), 2);
    }

    #[test]
    fn last_event_is_formatted_with_millis() {
        let backend = MockBackend::new();
        let registry = Registry::new();
        let time = Local::now();
        let snapshot =
            StatusSnapshot::build(&backend, &registry, Some(time), &DisplaySelection::default());
        let expected = format!("Last event: {}", time.format("%H:%M:%S%.3f"));
        assert_eq!(snapshot.lines()[1], expected);
    }

    #[test]
    fn selection_wraps_both_ways() {
        let mut selection = DisplaySelection::default();
        selection.previous(3);
        assert_eq!(selection.index(), 2);
        selection.next(3);
        assert_eq!(selection.index(), 0);
        selection.next(0);
        assert_eq!(selection.index(), 0);
    }

    #[test]
    fn selection_clamps_when_registry_shrinks() {
        let mut selection = DisplaySelection::default();
        selection.next(4);
        selection.next(4);
        selection.next(4);
        selection.clamp(2);
        assert_eq!(selection.index(), 1);
        selection.clamp(0);
        assert_eq!(selection.index(), 0);
    }

    #[test]
    fn toggle_switches_mode() {
        let mut selection = DisplaySelection::new(DisplayMode::Single);
        selection.toggle_mode();
        assert_eq!(selection.mode(), DisplayMode::All);
        selection.toggle_mode();
        assert_eq!(selection.mode(), DisplayMode::Single);
    }
}

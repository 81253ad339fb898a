//! Device registry
//!
//! Two tables keyed by instance id, the controller handles and their last
//! known rumble capability, plus the FIFO of controllers still waiting for
//! their first remap confirmation. The tables are private so that an entry
//! can only ever be inserted into or removed from both at once.

use std::collections::{BTreeMap, VecDeque};

use super::types::{ControllerInfo, DeviceIndex, InstanceId};

/// A controller bound to the instance id it is registered under
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerHandle {
    pub instance_id: InstanceId,
    pub device_index: DeviceIndex,
    pub name: String,
    pub guid: String,
}

impl ControllerHandle {
    pub fn bind(info: ControllerInfo, instance_id: InstanceId) -> Self {
        Self {
            instance_id,
            device_index: info.device_index,
            name: info.name,
            guid: info.guid,
        }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    // BTreeMap keeps display order stable across frames
    controllers: BTreeMap<InstanceId, ControllerHandle>,
    rumble: BTreeMap<InstanceId, bool>,
    pending: VecDeque<ControllerInfo>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle` with its rumble capability, returning any handle
    /// previously registered under the same instance id
    pub fn insert(&mut self, handle: ControllerHandle, rumble: bool) -> Option<ControllerHandle> {
        let id = handle.instance_id;
        self.rumble.insert(id, rumble);
        self.controllers.insert(id, handle)
    }

    /// Removes the controller and its rumble entry together
    pub fn remove(&mut self, instance_id: InstanceId) -> Option<(ControllerHandle, bool)> {
        let handle = self.controllers.remove(&instance_id)?;
        let rumble = self.rumble.remove(&instance_id).unwrap_or(false);
        Some((handle, rumble))
    }

    pub fn get(&self, instance_id: InstanceId) -> Option<&ControllerHandle> {
        self.controllers.get(&instance_id)
    }

    pub fn get_mut(&mut self, instance_id: InstanceId) -> Option<&mut ControllerHandle> {
        self.controllers.get_mut(&instance_id)
    }

    pub fn contains(&self, instance_id: InstanceId) -> bool {
        self.controllers.contains_key(&instance_id)
    }

    #[cfg(test)]
    pub fn rumble(&self, instance_id: InstanceId) -> Option<bool> {
        self.rumble.get(&instance_id).copied()
    }

    /// Updates the rumble flag of a registered controller; ignored otherwise
    pub fn set_rumble(&mut self, instance_id: InstanceId, supported: bool) {
        if let Some(flag) = self.rumble.get_mut(&instance_id) {
            *flag = supported;
        }
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.controllers.keys().copied().collect()
    }

    /// Registered controllers with their rumble flag, in instance id order
    pub fn iter(&self) -> impl Iterator<Item = (&ControllerHandle, bool)> {
        self.controllers
            .values()
            .map(|handle| (handle, self.rumble.get(&handle.instance_id).copied().unwrap_or(false)))
    }

    pub fn push_pending(&mut self, info: ControllerInfo) {
        self.pending.push_back(info);
    }

    pub fn pop_pending(&mut self) -> Option<ControllerInfo> {
        self.pending.pop_front()
    }

    /// Drops the pending entry opened under `instance_id`, if any
    pub fn remove_pending(&mut self, instance_id: InstanceId) -> Option<ControllerInfo> {
        let position = self
            .pending
            .iter()
            .position(|info| info.instance_id == instance_id)?;
        self.pending.remove(position)
    }

    pub fn pending(&self) -> impl Iterator<Item = &ControllerInfo> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn tables_in_lockstep(&self) -> bool {
        self.controllers.len() == self.rumble.len()
            && self.controllers.keys().all(|id| self.rumble.contains_key(id))
    }
}

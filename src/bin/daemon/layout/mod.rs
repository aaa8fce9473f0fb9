//! Layout Model
//!
//! This module holds the backend-agnostic description of a screen layout:
//! outputs (connectors), controllers (CRTCs), the snapshot that groups them for
//! one operation, and the commit plan the engine produces from a snapshot.

pub mod engine;
pub mod geometry;
pub mod memory;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::utils::error::{MonitoggleError, Result};
use geometry::{Point, Rect, Size};

/// Mode handle meaning "no mode"; a controller carrying it is off
pub const MODE_NONE: u32 = 0;

/// Opaque backend handle of an output, stable for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputId(pub u32);

/// Opaque backend handle of a controller (CRTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ControllerId(pub u32);

impl std::fmt::Display for OutputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "output {}", self.0)
    }
}

impl std::fmt::Display for ControllerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "controller {}", self.0)
    }
}

/// Connection state of an output as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connection {
    Unknown,
    Disconnected,
    Connected,
}

/// One physical display connector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub id: OutputId,
    pub name: String,
    pub physical_width_mm: u32,
    pub physical_height_mm: u32,
    pub connection: Connection,
    pub enabled: bool,
    pub controller: Option<ControllerId>,
    /// Relative stacking order, lower first
    pub priority: u32,
}

impl Output {
    pub fn is_connected(&self) -> bool {
        self.connection == Connection::Connected
    }
}

/// One scan-out unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controller {
    pub id: ControllerId,
    pub origin: Point,
    pub size: Size,
    pub mode: u32,
    pub rotation: u16,
    pub driven_outputs: BTreeSet<OutputId>,
}

impl Controller {
    pub fn rect(&self) -> Rect {
        Rect::new(self.origin, self.size)
    }

    /// Human readable geometry, e.g. `1920x1080+0+0`
    pub fn describe(&self) -> String {
        format!(
            "{}x{}+{}+{}",
            self.size.width, self.size.height, self.origin.x, self.origin.y
        )
    }
}

/// All outputs and controllers read from a backend at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub outputs: BTreeMap<OutputId, Output>,
    pub controllers: BTreeMap<ControllerId, Controller>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_output(&mut self, output: Output) {
        self.outputs.insert(output.id, output);
    }

    pub fn add_controller(&mut self, controller: Controller) {
        self.controllers.insert(controller.id, controller);
    }

    pub fn output(&self, id: OutputId) -> Result<&Output> {
        self.outputs
            .get(&id)
            .ok_or_else(|| MonitoggleError::NotFound(format!("{} is not in the snapshot", id)))
    }

    pub fn controller(&self, id: ControllerId) -> Result<&Controller> {
        self.controllers
            .get(&id)
            .ok_or_else(|| MonitoggleError::NotFound(format!("{} is not in the snapshot", id)))
    }

    /// Looks a connected output up by name
    pub fn output_by_name(&self, name: &str) -> Option<&Output> {
        self.outputs
            .values()
            .find(|output| output.is_connected() && output.name == name)
    }

    pub fn connected_outputs(&self) -> impl Iterator<Item = &Output> {
        self.outputs.values().filter(|output| output.is_connected())
    }

    /// Checks that every enabled output is connected and driven by an
    /// existing controller.
    pub fn validate(&self) -> Result<()> {
        for output in self.outputs.values().filter(|output| output.enabled) {
            if !output.is_connected() {
                return Err(MonitoggleError::InvariantViolation(format!(
                    "{} ({}) is enabled but not connected",
                    output.id, output.name
                )));
            }
            let controller_id = output.controller.ok_or_else(|| {
                MonitoggleError::InvariantViolation(format!(
                    "{} ({}) is enabled without a controller",
                    output.id, output.name
                ))
            })?;
            let controller = self.controller(controller_id)?;
            if !controller.driven_outputs.contains(&output.id) {
                return Err(MonitoggleError::InvariantViolation(format!(
                    "{} does not drive enabled {} ({})",
                    controller.id, output.id, output.name
                )));
            }
        }
        Ok(())
    }
}

/// What a controller must look like after the commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerPlan {
    pub enabled: bool,
    pub origin: Point,
    pub mode: u32,
    pub rotation: u16,
    /// Outputs to attach, empty when disabled
    pub outputs: Vec<OutputId>,
}

/// What an output must look like after the commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub enabled: bool,
    /// New priority, only for outputs enabled after the commit
    pub priority: Option<u32>,
}

/// Changes computed for one toggle request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitPlan {
    pub controllers: BTreeMap<ControllerId, ControllerPlan>,
    pub outputs: BTreeMap<OutputId, OutputPlan>,
}

impl CommitPlan {
    /// The plan that changes nothing
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        self.controllers.is_empty() && self.outputs.is_empty()
    }
}

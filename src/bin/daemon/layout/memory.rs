//! Reference layout memory
//!
//! Backends only report the live layout: a disabled output has no controller
//! geometry any more and the enabled ones have been moved by earlier toggles.
//! The engine needs the layout as it was originally configured, so the first
//! time an output is seen enabled its controller geometry and priority are
//! recorded here, and every later live snapshot is anchored to those values.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::{Controller, ControllerId, OutputId, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
struct RememberedOutput {
    name: String,
    controller: ControllerId,
    priority: u32,
}

/// Reference geometry and priorities, keyed by backend handles
#[derive(Debug, Default)]
pub struct LayoutMemory {
    outputs: BTreeMap<OutputId, RememberedOutput>,
    controllers: BTreeMap<ControllerId, Controller>,
}

impl LayoutMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `output` has a reference controller
    pub fn knows(&self, output: OutputId) -> bool {
        self.outputs.contains_key(&output)
    }

    /// Drops the reference layout; the next anchored snapshot becomes the new one
    pub fn forget(&mut self) {
        info!("Forgetting reference layout of {} outputs", self.outputs.len());
        self.outputs.clear();
        self.controllers.clear();
    }

    /// Records outputs seen enabled for the first time, then rewrites `live`
    /// so that every known output and controller carries its reference values.
    pub fn anchor(&mut self, live: Snapshot) -> Snapshot {
        self.record(&live);

        let mut snapshot = live;
        for (id, remembered) in &self.outputs {
            if let Some(output) = snapshot.outputs.get_mut(id) {
                output.controller = Some(remembered.controller);
                output.priority = remembered.priority;
            }
        }
        for (id, controller) in &self.controllers {
            snapshot.controllers.insert(*id, controller.clone());
        }
        snapshot
    }

    fn record(&mut self, live: &Snapshot) {
        for output in live.connected_outputs().filter(|output| output.enabled) {
            if self.outputs.contains_key(&output.id) {
                continue;
            }
            let Some(controller) = output.controller.and_then(|id| live.controllers.get(&id)) else {
                debug!("{} is enabled without a known controller, not remembered", output.name);
                continue;
            };

            info!(
                "Remembering {} on {} at {} with priority {}",
                output.name,
                controller.id,
                controller.describe(),
                output.priority
            );
            self.outputs.insert(
                output.id,
                RememberedOutput {
                    name: output.name.clone(),
                    controller: controller.id,
                    priority: output.priority,
                },
            );
            self.controllers
                .entry(controller.id)
                .or_insert_with(|| controller.clone())
                .driven_outputs
                .insert(output.id);
        }
    }

    /// Names of the remembered outputs, in handle order
    pub fn output_names(&self) -> Vec<String> {
        self.outputs.values().map(|remembered| remembered.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::geometry::{Point, Size};
    use crate::layout::{Connection, Output};
    use std::collections::BTreeSet;

    fn live(b_enabled: bool, a_x: i32) -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.add_output(Output {
            id: OutputId(1),
            name: "A".to_string(),
            physical_width_mm: 300,
            physical_height_mm: 200,
            connection: Connection::Connected,
            enabled: true,
            controller: Some(ControllerId(10)),
            priority: 1,
        });
        snapshot.add_output(Output {
            id: OutputId(2),
            name: "B".to_string(),
            physical_width_mm: 300,
            physical_height_mm: 200,
            connection: Connection::Connected,
            enabled: b_enabled,
            controller: b_enabled.then_some(ControllerId(11)),
            priority: if b_enabled { 2 } else { 0 },
        });
        snapshot.add_controller(Controller {
            id: ControllerId(10),
            origin: Point::new(a_x, 0),
            size: Size::new(800, 600),
            mode: 100,
            rotation: 1,
            driven_outputs: BTreeSet::from([OutputId(1)]),
        });
        snapshot.add_controller(Controller {
            id: ControllerId(11),
            origin: Point::new(800, 0),
            size: if b_enabled { Size::new(600, 480) } else { Size::new(0, 0) },
            mode: if b_enabled { 101 } else { 0 },
            rotation: 1,
            driven_outputs: if b_enabled { BTreeSet::from([OutputId(2)]) } else { BTreeSet::new() },
        });
        snapshot
    }

    #[test]
    fn test_first_snapshot_is_reference() {
        let mut memory = LayoutMemory::new();
        let first = live(true, 0);
        assert_eq!(memory.anchor(first.clone()), first);
        assert!(memory.knows(OutputId(2)));
        assert_eq!(memory.output_names(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_disabled_output_keeps_reference_geometry() {
        let mut memory = LayoutMemory::new();
        memory.anchor(live(true, 0));

        // B switched off, A left where it was
        let anchored = memory.anchor(live(false, 0));
        let b = &anchored.outputs[&OutputId(2)];
        assert!(!b.enabled);
        assert_eq!(b.controller, Some(ControllerId(11)));
        assert_eq!(b.priority, 2);
        assert_eq!(anchored.controllers[&ControllerId(11)].size, Size::new(600, 480));
        assert_eq!(anchored.controllers[&ControllerId(11)].mode, 101);
    }

    #[test]
    fn test_shifted_controller_keeps_reference_origin() {
        let mut memory = LayoutMemory::new();
        memory.anchor(live(true, 0));

        let anchored = memory.anchor(live(true, -800));
        assert_eq!(anchored.controllers[&ControllerId(10)].origin, Point::new(0, 0));
    }

    #[test]
    fn test_forget_recaptures_live_layout() {
        let mut memory = LayoutMemory::new();
        memory.anchor(live(true, 0));
        memory.forget();
        assert!(memory.output_names().is_empty());

        let anchored = memory.anchor(live(true, 200));
        assert_eq!(anchored.controllers[&ControllerId(10)].origin, Point::new(200, 0));
    }

    #[test]
    fn test_output_never_enabled_is_not_remembered() {
        let mut memory = LayoutMemory::new();
        let anchored = memory.anchor(live(false, 0));
        assert!(!memory.knows(OutputId(2)));
        assert_eq!(anchored.outputs[&OutputId(2)].controller, None);
    }
}

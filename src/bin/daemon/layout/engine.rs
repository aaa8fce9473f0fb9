//! Reconciliation Engine
//!
//! Computes, from one snapshot and one enable/disable request, where every
//! controller has to go and which priority every output has to carry so that
//! the visible layout keeps its reference point.
//!
//! The snapshot geometry is the reference layout, i.e. the layout with every
//! output on. Two bounding rectangles are derived from it: the total one over
//! all connected outputs and the tentative one over the outputs that would be
//! enabled after the request. Their top-left difference is the offset applied
//! to every controller. Priorities are shifted the same way using the minimum
//! priority of both sets.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, error, info};

use super::geometry::{bounding_rect, Point};
use super::{CommitPlan, Connection, Controller, ControllerId, ControllerPlan, Output, OutputId, OutputPlan, Snapshot, MODE_NONE};
use crate::utils::error::{MonitoggleError, Result};

/// Plans enabling `output`. Already enabled outputs yield the identity plan.
pub fn plan_enable(snapshot: &Snapshot, output: OutputId) -> Result<CommitPlan> {
    plan(snapshot, output, true)
}

/// Plans disabling `output`. Already disabled outputs yield the identity plan.
pub fn plan_disable(snapshot: &Snapshot, output: OutputId) -> Result<CommitPlan> {
    plan(snapshot, output, false)
}

/// Plans disabling `output` if it is enabled, enabling it otherwise.
pub fn plan_toggle(snapshot: &Snapshot, output: OutputId) -> Result<CommitPlan> {
    let enabled = snapshot.output(output)?.enabled;
    plan(snapshot, output, !enabled)
}

/// Amount every remaining priority is lowered by.
///
/// The enabled set is a subset of the connected set, so its minimum can never
/// be below the connected minimum. Anything else means the snapshot is broken.
pub fn priority_shift(total_min_priority: u32, target_min_priority: u32) -> Result<u32> {
    target_min_priority.checked_sub(total_min_priority).ok_or_else(|| {
        MonitoggleError::InvariantViolation(format!(
            "enabled minimum priority {} is below connected minimum priority {}",
            target_min_priority, total_min_priority
        ))
    })
}

fn plan(snapshot: &Snapshot, target_id: OutputId, enable: bool) -> Result<CommitPlan> {
    snapshot.validate()?;

    let target = snapshot.output(target_id)?;
    match target.connection {
        Connection::Connected => {}
        Connection::Disconnected => {
            return Err(MonitoggleError::InvalidState(format!(
                "{} ({}) is disconnected",
                target.id, target.name
            )));
        }
        Connection::Unknown => {
            return Err(MonitoggleError::InvalidState(format!(
                "connection state of {} ({}) is unknown",
                target.id, target.name
            )));
        }
    }

    if target.enabled == enable {
        debug!(
            "{} already {}, nothing to do",
            target.name,
            if enable { "enabled" } else { "disabled" }
        );
        return Ok(CommitPlan::identity());
    }

    let target_controller = target.controller.ok_or_else(|| {
        MonitoggleError::NotFound(format!("no controller known for {} ({})", target.id, target.name))
    })?;
    snapshot.controller(target_controller)?;

    // Every geometry we are about to combine has to be known
    let placed = snapshot
        .connected_outputs()
        .filter_map(|output| output.controller.map(|id| (output, id)))
        .map(|(output, id)| Ok((output, snapshot.controller(id)?)))
        .collect::<Result<Vec<(&Output, &Controller)>>>()?;

    let will_be_enabled = |output: &Output| {
        if output.id == target_id {
            enable
        } else {
            output.enabled
        }
    };

    let total = bounding_rect(placed.iter().map(|(_, controller)| controller.rect()));
    let tentative = bounding_rect(
        placed
            .iter()
            .filter(|(output, _)| will_be_enabled(output))
            .map(|(_, controller)| controller.rect()),
    );

    if !enable && tentative.is_none() {
        return Err(MonitoggleError::InvalidState(format!(
            "{} is the last enabled output",
            target.name
        )));
    }

    let offset = match (tentative, total) {
        (Some(tentative), Some(total)) => tentative.top_left() - total.top_left(),
        _ => Point::default(),
    };
    debug!("total {:?}, tentative {:?}, offset {:?}", total, tentative, offset);

    let total_min_priority = snapshot.connected_outputs().map(|output| output.priority).min();
    let target_min_priority = snapshot
        .connected_outputs()
        .filter(|output| will_be_enabled(output))
        .map(|output| output.priority)
        .min();
    let shift = match (total_min_priority, target_min_priority) {
        (Some(total_min), Some(target_min)) => match priority_shift(total_min, target_min) {
            Ok(shift) => shift,
            Err(e) => {
                error!("{}", e);
                debug_assert!(false, "{}", e);
                return Err(e);
            }
        },
        _ => 0,
    };
    debug!("priority shift {}", shift);

    let mut plan = CommitPlan::identity();

    let controllers: BTreeMap<ControllerId, &Controller> =
        placed.iter().map(|(_, controller)| (controller.id, *controller)).collect();
    for (controller_id, controller) in controllers {
        let attached: BTreeSet<OutputId> = snapshot
            .connected_outputs()
            .filter(|output| {
                output.controller == Some(controller_id) || controller.driven_outputs.contains(&output.id)
            })
            .filter(|output| will_be_enabled(output))
            .map(|output| output.id)
            .collect();

        let controller_plan = if attached.is_empty() {
            ControllerPlan {
                enabled: false,
                origin: Point::default(),
                mode: MODE_NONE,
                rotation: controller.rotation,
                outputs: Vec::new(),
            }
        } else {
            ControllerPlan {
                enabled: true,
                origin: controller.origin - offset,
                mode: controller.mode,
                rotation: controller.rotation,
                outputs: attached.into_iter().collect(),
            }
        };
        plan.controllers.insert(controller_id, controller_plan);
    }

    for output in snapshot.connected_outputs() {
        let enabled = will_be_enabled(output);
        if enabled == output.enabled && !enabled {
            continue;
        }
        plan.outputs.insert(
            output.id,
            OutputPlan {
                enabled,
                priority: enabled.then(|| output.priority - shift),
            },
        );
    }

    info!(
        "Planned {} of {}: {} controllers, offset {}x{}",
        if enable { "enable" } else { "disable" },
        target.name,
        plan.controllers.len(),
        offset.x,
        offset.y
    );
    Ok(plan)
}

//! Maps capability requests onto a device's fixed queue-family topology.
//!
//! Resolution is greedy and first-fit: each request takes the first family,
//! in index order, that offers every requested capability and still has a
//! free slot. Requests are taken in the order given; apply
//! [`sort_by_importance`](crate::capability::sort_by_importance) beforehand
//! so that plain transfer requests do not starve rarer ones.

use crate::{
    capability::Capabilities,
    error::{Error, Result},
    inventory::QueueFamilyDescriptor,
};

/// Where one request landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueAssignment {
    pub family_index: u32,
    pub slot: u32,
    pub capabilities: Capabilities,
    pub priority: f32,
}

/// Queues to create in one family: one priority per occupied slot.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyPlan {
    pub family_index: u32,
    pub priorities: Vec<f32>,
}

impl FamilyPlan {
    pub fn queue_count(&self) -> u32 {
        self.priorities.len() as u32
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuePlan {
    /// One entry per request, in request order.
    pub assignments: Vec<QueueAssignment>,
    /// Families with at least one occupied slot, in family order.
    pub families: Vec<FamilyPlan>,
    /// Union of every granted request.
    pub overall: Capabilities,
}

pub fn resolve(families: &[QueueFamilyDescriptor], requests: &[Capabilities]) -> Result<QueuePlan> {
    let mut priorities: Vec<Vec<f32>> = vec![Vec::new(); families.len()];
    let mut assignments = Vec::with_capacity(requests.len());
    let mut overall = Capabilities::empty();

    for (request, &capabilities) in requests.iter().enumerate() {
        let (family, taken) = families
            .iter()
            .zip(priorities.iter_mut())
            .find(|(family, taken)| {
                (taken.len() as u32) < family.queue_count && family.supports(capabilities)
            })
            .ok_or(Error::UnsatisfiableCapability {
                request,
                capabilities,
            })?;

        let assignment = QueueAssignment {
            family_index: family.index,
            slot: taken.len() as u32,
            capabilities,
            priority: capabilities.priority(),
        };
        taken.push(assignment.priority);
        log::debug!(
            "queue request {request} ({capabilities:?}) -> family {} slot {}",
            assignment.family_index,
            assignment.slot
        );
        assignments.push(assignment);
        overall |= capabilities;
    }

    let families = families
        .iter()
        .zip(priorities)
        .filter(|(_, priorities)| !priorities.is_empty())
        .map(|(family, priorities)| FamilyPlan {
            family_index: family.index,
            priorities,
        })
        .collect();

    Ok(QueuePlan {
        assignments,
        families,
        overall,
    })
}

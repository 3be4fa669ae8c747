//! Applied loads and their dispatch onto a refined rod.
//!
//! A [`VectorLoad`] is tagged by kind (force/moment), distribution
//! (concentrated/distributed) and coordinate system (global/material). The
//! eight combinations map one-to-one onto the accumulation buffers of a
//! [`LoadDispatch`]. Targets are given in input numbering:
//!
//! - input node `k` is refined node `2k` (a handle)
//! - input edge `k` covers refined edges `2k` and `2k + 1`
//!
//! Loads defined in the coordinate system opposite to the one the rod
//! consumes them in follow the structure: they are re-projected with the
//! current frames every time the frames move.

use kdr_geometry::Frame;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RodError};

/// Force or moment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadKind {
    Force,
    Moment,
}

/// Point load on a node or per-length load on an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distribution {
    Concentrated,
    Distributed,
}

/// Coordinate system of a load value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// World axes
    Global,
    /// Components along (d1, d2, d3) of the local material frame
    Material,
}

/// An applied load record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorLoad {
    pub kind: LoadKind,
    pub distribution: Distribution,
    pub system: CoordinateSystem,
    /// Input node index (concentrated) or input edge index (distributed)
    pub index: usize,
    pub value: Vector3<f64>,
}

impl VectorLoad {
    /// Create a load, rejecting non-finite values.
    pub fn new(
        kind: LoadKind,
        distribution: Distribution,
        system: CoordinateSystem,
        index: usize,
        value: Vector3<f64>,
    ) -> Result<Self> {
        if !value.iter().all(|v| v.is_finite()) {
            return Err(RodError::NonFiniteLoad(format!(
                "{kind:?} {distribution:?} at {index}: [{}, {}, {}]",
                value.x, value.y, value.z
            )));
        }
        Ok(Self {
            kind,
            distribution,
            system,
            index,
            value,
        })
    }

    /// Concentrated force at an input node
    pub fn point_force(node: usize, value: Vector3<f64>, system: CoordinateSystem) -> Result<Self> {
        Self::new(LoadKind::Force, Distribution::Concentrated, system, node, value)
    }

    /// Concentrated moment at an input node
    pub fn point_moment(node: usize, value: Vector3<f64>, system: CoordinateSystem) -> Result<Self> {
        Self::new(LoadKind::Moment, Distribution::Concentrated, system, node, value)
    }

    /// Force per unit length along an input edge
    pub fn distributed_force(edge: usize, value: Vector3<f64>, system: CoordinateSystem) -> Result<Self> {
        Self::new(LoadKind::Force, Distribution::Distributed, system, edge, value)
    }

    /// Moment per unit length along an input edge
    pub fn distributed_moment(edge: usize, value: Vector3<f64>, system: CoordinateSystem) -> Result<Self> {
        Self::new(LoadKind::Moment, Distribution::Distributed, system, edge, value)
    }

    pub fn slot(&self) -> LoadSlot {
        LoadSlot::from_parts(self.kind, self.distribution, self.system)
    }
}

/// The eight accumulation buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadSlot {
    ConcentratedGlobalForce,
    ConcentratedMaterialForce,
    ConcentratedGlobalMoment,
    ConcentratedMaterialMoment,
    DistributedGlobalForce,
    DistributedMaterialForce,
    DistributedGlobalMoment,
    DistributedMaterialMoment,
}

impl LoadSlot {
    pub const ALL: [LoadSlot; 8] = [
        LoadSlot::ConcentratedGlobalForce,
        LoadSlot::ConcentratedMaterialForce,
        LoadSlot::ConcentratedGlobalMoment,
        LoadSlot::ConcentratedMaterialMoment,
        LoadSlot::DistributedGlobalForce,
        LoadSlot::DistributedMaterialForce,
        LoadSlot::DistributedGlobalMoment,
        LoadSlot::DistributedMaterialMoment,
    ];

    pub fn from_parts(kind: LoadKind, distribution: Distribution, system: CoordinateSystem) -> Self {
        use CoordinateSystem::*;
        use Distribution::*;
        use LoadKind::*;
        match (distribution, kind, system) {
            (Concentrated, Force, Global) => LoadSlot::ConcentratedGlobalForce,
            (Concentrated, Force, Material) => LoadSlot::ConcentratedMaterialForce,
            (Concentrated, Moment, Global) => LoadSlot::ConcentratedGlobalMoment,
            (Concentrated, Moment, Material) => LoadSlot::ConcentratedMaterialMoment,
            (Distributed, Force, Global) => LoadSlot::DistributedGlobalForce,
            (Distributed, Force, Material) => LoadSlot::DistributedMaterialForce,
            (Distributed, Moment, Global) => LoadSlot::DistributedGlobalMoment,
            (Distributed, Moment, Material) => LoadSlot::DistributedMaterialMoment,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_concentrated(self) -> bool {
        self.index() < 4
    }

    /// Buffers that must be re-projected whenever the frames rotate.
    ///
    /// The rod consumes concentrated moments in material components and
    /// every other load in global components.
    pub fn is_follower(self) -> bool {
        matches!(
            self,
            LoadSlot::ConcentratedMaterialForce
                | LoadSlot::ConcentratedGlobalMoment
                | LoadSlot::DistributedMaterialForce
                | LoadSlot::DistributedMaterialMoment
        )
    }
}

/// External loads in the form consumed by the rod.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExternalLoads {
    /// Concentrated force per node, global
    pub force: Vec<Vector3<f64>>,
    /// Concentrated moment per node, material components
    pub moment: Vec<Vector3<f64>>,
    /// Force per unit length per edge, global
    pub distributed_force: Vec<Vector3<f64>>,
    /// Moment per unit length per edge, global
    pub distributed_moment: Vec<Vector3<f64>>,
}

impl ExternalLoads {
    pub fn new(node_count: usize, edge_count: usize) -> Self {
        Self {
            force: vec![Vector3::zeros(); node_count],
            moment: vec![Vector3::zeros(); node_count],
            distributed_force: vec![Vector3::zeros(); edge_count],
            distributed_moment: vec![Vector3::zeros(); edge_count],
        }
    }
}

/// Accumulation buffers for the loads applied to one rod.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadDispatch {
    input_nodes: usize,
    input_edges: usize,
    buffers: [Vec<Vector3<f64>>; 8],
    active: [bool; 8],
}

impl LoadDispatch {
    /// Buffers for a rod of `input_nodes` handles.
    pub fn new(input_nodes: usize, closed: bool) -> Self {
        let input_edges = crate::centerline::edge_count(input_nodes, closed);
        let node_count = if closed { 2 * input_nodes } else { (2 * input_nodes).saturating_sub(1) };
        let edge_count = 2 * input_edges;
        let buffers = std::array::from_fn(|k| {
            if LoadSlot::ALL[k].is_concentrated() {
                vec![Vector3::zeros(); node_count]
            } else {
                vec![Vector3::zeros(); edge_count]
            }
        });
        Self {
            input_nodes,
            input_edges,
            buffers,
            active: [false; 8],
        }
    }

    /// Clear all buffers and accumulate `loads` into them.
    ///
    /// Every target index is checked before anything is accumulated, so a
    /// rejected list leaves the buffers empty.
    pub fn fill(&mut self, loads: &[VectorLoad]) -> Result<()> {
        for buffer in &mut self.buffers {
            buffer.fill(Vector3::zeros());
        }
        self.active = [false; 8];

        for load in loads {
            match load.distribution {
                Distribution::Concentrated if load.index >= self.input_nodes => {
                    return Err(RodError::NodeOutOfRange {
                        index: load.index,
                        count: self.input_nodes,
                    });
                }
                Distribution::Distributed if load.index >= self.input_edges => {
                    return Err(RodError::EdgeOutOfRange {
                        index: load.index,
                        count: self.input_edges,
                    });
                }
                _ => {}
            }
        }

        for load in loads {
            let slot = load.slot();
            let buffer = &mut self.buffers[slot.index()];
            match load.distribution {
                Distribution::Concentrated => buffer[2 * load.index] += load.value,
                Distribution::Distributed => {
                    buffer[2 * load.index] += load.value;
                    buffer[2 * load.index + 1] += load.value;
                }
            }
            self.active[slot.index()] = true;
        }
        Ok(())
    }

    pub fn buffer(&self, slot: LoadSlot) -> &[Vector3<f64>] {
        &self.buffers[slot.index()]
    }

    pub fn is_active(&self, slot: LoadSlot) -> bool {
        self.active[slot.index()]
    }

    pub fn is_empty(&self) -> bool {
        !self.active.iter().any(|&a| a)
    }

    /// Whether any buffer depends on the current frames.
    pub fn has_followers(&self) -> bool {
        LoadSlot::ALL
            .iter()
            .any(|slot| slot.is_follower() && self.is_active(*slot))
    }

    /// Write the buffers into `external`, projecting follower loads with the
    /// current node and edge frames.
    pub fn update(&self, node_frames: &[Frame], edge_frames: &[Frame], external: &mut ExternalLoads) {
        use LoadSlot::*;

        let global_force = self.buffer(ConcentratedGlobalForce);
        let material_force = self.buffer(ConcentratedMaterialForce);
        let global_moment = self.buffer(ConcentratedGlobalMoment);
        let material_moment = self.buffer(ConcentratedMaterialMoment);
        for (i, frame) in node_frames.iter().enumerate() {
            external.force[i] = global_force[i];
            if self.is_active(ConcentratedMaterialForce) {
                external.force[i] += frame.to_global(&material_force[i]);
            }
            external.moment[i] = material_moment[i];
            if self.is_active(ConcentratedGlobalMoment) {
                external.moment[i] += frame.to_local(&global_moment[i]);
            }
        }

        let dist_global_force = self.buffer(DistributedGlobalForce);
        let dist_material_force = self.buffer(DistributedMaterialForce);
        let dist_global_moment = self.buffer(DistributedGlobalMoment);
        let dist_material_moment = self.buffer(DistributedMaterialMoment);
        for (j, frame) in edge_frames.iter().enumerate() {
            external.distributed_force[j] = dist_global_force[j];
            if self.is_active(DistributedMaterialForce) {
                external.distributed_force[j] += frame.to_global(&dist_material_force[j]);
            }
            external.distributed_moment[j] = dist_global_moment[j];
            if self.is_active(DistributedMaterialMoment) {
                external.distributed_moment[j] += frame.to_global(&dist_material_moment[j]);
            }
        }
    }
}

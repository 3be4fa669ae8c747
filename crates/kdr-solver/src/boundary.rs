//! Boundary collaborators of the relaxation solver.
//!
//! A boundary object is called by the solver at fixed points of every
//! relaxation step:
//!
//! 1. `init` once, before the first pass
//! 2. `calculate_x` / `calculate_theta` after the elements assembled their
//!    resultants, to compute new reactions
//! 3. `transfer_reaction_x` / `transfer_reaction_theta` to write the
//!    reactions back into the elements
//!
//! Reactions enter the next assembly of the element (handle moment split,
//! resultants), closing a fixed-point loop that is relaxed together with the
//! structure.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::elements::Element;
use crate::error::{Result, RodError};

/// Contract between the solver and a boundary or joint object.
pub trait Boundary<E: Element>: Send + Sync {
    /// Resolve targets and prepare the elements
    fn init(&mut self, elements: &mut [E]) -> Result<()>;

    /// Compute translational reactions from the current resultants
    fn calculate_x(&mut self, elements: &[E]);

    /// Compute rotational reactions from the current resultants
    fn calculate_theta(&mut self, elements: &[E]);

    fn transfer_reaction_x(&self, elements: &mut [E]);

    fn transfer_reaction_theta(&self, elements: &mut [E]);
}

impl<E: Element, B: Boundary<E> + ?Sized> Boundary<E> for Box<B> {
    fn init(&mut self, elements: &mut [E]) -> Result<()> {
        (**self).init(elements)
    }

    fn calculate_x(&mut self, elements: &[E]) {
        (**self).calculate_x(elements);
    }

    fn calculate_theta(&mut self, elements: &[E]) {
        (**self).calculate_theta(elements);
    }

    fn transfer_reaction_x(&self, elements: &mut [E]) {
        (**self).transfer_reaction_x(elements);
    }

    fn transfer_reaction_theta(&self, elements: &mut [E]) {
        (**self).transfer_reaction_theta(elements);
    }
}

/// Support on one input node of one element.
///
/// Fixed translation axes cancel the resultant force along those axes. A
/// locked tangent (clamp) freezes the node tangent and takes up the bending
/// imbalance of the node. A fixed rotation cancels the moment about the
/// tangent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Support {
    /// Element index in the solver
    pub element: usize,
    /// Input node index in the element
    pub input_node: usize,
    /// Fixed global translation axes (x, y, z)
    pub fixed_translation: [bool; 3],
    /// Freeze the node tangent
    pub lock_tangent: bool,
    /// Fix the rotation about the tangent
    pub fixed_rotation: bool,
    #[serde(skip)]
    node: Option<usize>,
    #[serde(skip)]
    reaction_force: Vector3<f64>,
    /// Bending part of the reaction moment, normal to the tangent
    #[serde(skip)]
    reaction_bending: Vector3<f64>,
    /// Reaction moment about the tangent
    #[serde(skip)]
    reaction_torque: f64,
}

impl Support {
    pub fn new(element: usize, input_node: usize) -> Self {
        Self {
            element,
            input_node,
            fixed_translation: [false; 3],
            lock_tangent: false,
            fixed_rotation: false,
            node: None,
            reaction_force: Vector3::zeros(),
            reaction_bending: Vector3::zeros(),
            reaction_torque: 0.0,
        }
    }

    /// Fixed translation, free rotation
    pub fn pinned(element: usize, input_node: usize) -> Self {
        Self::new(element, input_node).with_translation([true; 3])
    }

    /// Fixed translation, locked tangent and fixed rotation
    pub fn clamped(element: usize, input_node: usize) -> Self {
        Self::pinned(element, input_node)
            .with_locked_tangent(true)
            .with_fixed_rotation(true)
    }

    /// Only the rotation about the tangent is fixed
    pub fn fixed_rotation(element: usize, input_node: usize) -> Self {
        Self::new(element, input_node).with_fixed_rotation(true)
    }

    pub fn with_translation(mut self, axes: [bool; 3]) -> Self {
        self.fixed_translation = axes;
        self
    }

    pub fn with_locked_tangent(mut self, lock: bool) -> Self {
        self.lock_tangent = lock;
        self
    }

    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self
    }

    /// Element node the support acts on, once initialised
    pub fn node(&self) -> Option<usize> {
        self.node
    }

    pub fn reaction_force(&self) -> Vector3<f64> {
        self.reaction_force
    }

    /// Reaction moment about the tangent
    pub fn reaction_torque(&self) -> f64 {
        self.reaction_torque
    }

    /// Bending reaction moment (normal to the tangent), global
    pub fn reaction_bending(&self) -> Vector3<f64> {
        self.reaction_bending
    }

    fn reaction_moment<E: Element>(&self, element: &E, node: usize) -> Vector3<f64> {
        self.reaction_bending + element.tangent(node) * self.reaction_torque
    }
}

impl<E: Element> Boundary<E> for Support {
    fn init(&mut self, elements: &mut [E]) -> Result<()> {
        let count = elements.len();
        let element = elements
            .get_mut(self.element)
            .ok_or(RodError::ElementOutOfRange {
                index: self.element,
                count,
            })?;
        let node = element
            .handle_node(self.input_node)
            .ok_or(RodError::NodeOutOfRange {
                index: self.input_node,
                count: element.input_node_count(),
            })?;
        if self.lock_tangent {
            element.lock_tangent(node);
        }
        self.node = Some(node);
        self.reaction_force = Vector3::zeros();
        self.reaction_bending = Vector3::zeros();
        self.reaction_torque = 0.0;
        Ok(())
    }

    fn calculate_x(&mut self, elements: &[E]) {
        let Some(node) = self.node else { return };
        let element = &elements[self.element];

        let resultant = element.resultant_x()[node];
        let previous = element.reaction_force(node);
        for axis in 0..3 {
            self.reaction_force[axis] = if self.fixed_translation[axis] {
                previous[axis] - resultant[axis]
            } else {
                0.0
            };
        }

        if self.lock_tangent {
            self.reaction_bending = -element.moment_imbalance(node);
        }
    }

    fn calculate_theta(&mut self, elements: &[E]) {
        let Some(node) = self.node else { return };
        if !self.fixed_rotation {
            return;
        }
        let element = &elements[self.element];
        let previous = element.reaction_moment(node).dot(&element.tangent(node));
        self.reaction_torque = previous - element.resultant_theta()[node];
    }

    fn transfer_reaction_x(&self, elements: &mut [E]) {
        let Some(node) = self.node else { return };
        let element = &mut elements[self.element];
        element.set_reaction_force(node, self.reaction_force);
        let moment = self.reaction_moment(element, node);
        element.set_reaction_moment(node, moment);
    }

    fn transfer_reaction_theta(&self, elements: &mut [E]) {
        let Some(node) = self.node else { return };
        let element = &mut elements[self.element];
        let moment = self.reaction_moment(element, node);
        element.set_reaction_moment(node, moment);
    }
}

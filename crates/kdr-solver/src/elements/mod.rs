//! Element library for relaxation.

use nalgebra::Vector3;

pub mod rod;

pub use rod::{RodBeam, RodOptions};

/// Element interface driven by the relaxation solver.
///
/// Every node carries 4 degrees of freedom: a translation and a rotation of
/// the material frame about the node tangent. The solver moves nodes by
/// increments and reads back the out-of-balance resultants; boundary
/// collaborators read resultants and write reactions through the same
/// interface.
pub trait Element: Send + Sync {
    /// Number of nodes of the element
    fn node_count(&self) -> usize;

    /// Number of input nodes the element was built from
    fn input_node_count(&self) -> usize;

    /// Element node index of input node `input`, if it exists
    fn handle_node(&self, input: usize) -> Option<usize>;

    /// Translate every node by `dx[i]` and update the kinematics
    fn move_x(&mut self, dx: &[Vector3<f64>]);

    /// Rotate every material frame about its tangent by `dtheta[i]`
    fn move_theta(&mut self, dtheta: &[f64]);

    /// Recompute internal forces and the translational and rotational
    /// resultants
    fn calculate_x(&mut self);

    /// Recompute the internal moments and the rotational resultant only
    fn calculate_theta(&mut self);

    /// Fictitious translational mass of each node
    ///
    /// # Arguments
    /// * `masses` - Output slice with one entry per node
    fn lumped_mass_x(&self, masses: &mut [f64]);

    /// Fictitious rotational inertia of each node
    fn lumped_mass_theta(&self, masses: &mut [f64]);

    /// Out-of-balance force per node (internal + external + reaction)
    fn resultant_x(&self) -> &[Vector3<f64>];

    /// Out-of-balance moment about the tangent per node
    fn resultant_theta(&self) -> &[f64];

    /// Current unit tangent at node `i`
    fn tangent(&self, i: usize) -> Vector3<f64>;

    /// Freeze the tangent of node `i` (clamped node)
    fn lock_tangent(&mut self, i: usize);

    /// Bending moment left out of balance at node `i`, global, normal to
    /// the tangent, without reactions
    fn moment_imbalance(&self, i: usize) -> Vector3<f64>;

    fn reaction_force(&self, i: usize) -> Vector3<f64>;

    /// Replace the reaction force at node `i`, updating the resultant
    fn set_reaction_force(&mut self, i: usize, force: Vector3<f64>);

    fn reaction_moment(&self, i: usize) -> Vector3<f64>;

    /// Replace the reaction moment (global) at node `i`, updating the
    /// resultant
    fn set_reaction_moment(&mut self, i: usize, moment: Vector3<f64>);
}

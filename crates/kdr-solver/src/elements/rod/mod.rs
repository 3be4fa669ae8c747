//! Discrete Kirchhoff rod with ghost/handle node doubling.
//!
//! An input sequence of `N` frames is refined once into `2N - 1` nodes (open
//! rod) or `2N` nodes (closed rod). Even nodes are handles: they carry
//! supports, point loads and reactions. Odd nodes are ghosts inserted at the
//! arc mid-points; they give a smooth curvature estimate between handles.
//!
//! Degrees of freedom per node: 4 (translation + rotation of the material
//! frame about the tangent).
//!
//! Curvature-binormal per node, left and right of the node:
//! - ghost or free interior handle: circle through the node and its two
//!   neighbours (left = right)
//! - locked tangent or open end: circle tangent to the node tangent through
//!   each neighbour (left and right may differ)

mod energy;
mod forces;

use kdr_geometry::{
    circumscribed_curvature, parallel_transport, tangent_circle_curvature_end,
    tangent_circle_curvature_start, Frame, TransportMethod,
};
use nalgebra::{Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use super::Element;
use crate::centerline::{prepare_configuration, Centerline};
use crate::error::{Result, RodError};
use crate::loads::{ExternalLoads, LoadDispatch, VectorLoad};
use crate::section::RodStiffness;

/// Topology options of a rod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RodOptions {
    /// Last input node connects back to the first one
    pub closed: bool,
}

impl RodOptions {
    pub fn open() -> Self {
        Self { closed: false }
    }

    pub fn closed() -> Self {
        Self { closed: true }
    }
}

/// Rest state of the rod, set once at construction.
#[derive(Debug, Clone)]
struct RestState {
    frames: Vec<Frame>,
    lengths: Vec<f64>,
    kappa_left: Vec<Vector2<f64>>,
    kappa_right: Vec<Vector2<f64>>,
    twist_rate: Vec<f64>,
}

/// Discretized elastic rod element.
#[derive(Debug, Clone)]
pub struct RodBeam {
    pub id: usize,
    stiffness: RodStiffness,
    closed: bool,
    input_nodes: usize,
    rest: RestState,
    initial_frames: Vec<Frame>,
    tangent_locked: Vec<bool>,

    // Actual configuration
    frames: Vec<Frame>,
    centerline: Centerline,
    kb_left: Vec<Vector3<f64>>,
    kb_right: Vec<Vector3<f64>>,
    kappa_left: Vec<Vector2<f64>>,
    kappa_right: Vec<Vector2<f64>>,
    twist_rate: Vec<f64>,
    strain: Vec<f64>,

    // Internal forces
    moment_left: Vec<Vector2<f64>>,
    moment_right: Vec<Vector2<f64>>,
    torsion: Vec<f64>,
    shear: Vec<Vector3<f64>>,
    axial: Vec<f64>,

    // Node resultants
    internal_force: Vec<Vector3<f64>>,
    internal_torque: Vec<f64>,
    external_force: Vec<Vector3<f64>>,
    external_torque: Vec<f64>,
    reaction_force: Vec<Vector3<f64>>,
    reaction_moment: Vec<Vector3<f64>>,
    resultant_force: Vec<Vector3<f64>>,
    resultant_torque: Vec<f64>,

    loads: LoadDispatch,
    external: ExternalLoads,
}

impl RodBeam {
    /// Create a rod from its rest and initial input frames.
    ///
    /// # Arguments
    /// * `id` - Element identifier
    /// * `rest` - Input frames of the stress-free configuration
    /// * `initial` - Input frames the relaxation starts from
    /// * `stiffness` - Section stiffness products
    /// * `options` - Open or closed topology
    ///
    /// # Errors
    /// Returns an error for empty input, too few nodes, or rest and initial
    /// inputs of different lengths.
    pub fn new(
        id: usize,
        rest: &[Frame],
        initial: &[Frame],
        stiffness: RodStiffness,
        options: RodOptions,
    ) -> Result<Self> {
        if rest.is_empty() || initial.is_empty() {
            return Err(RodError::EmptyInput);
        }
        if rest.len() != initial.len() {
            return Err(RodError::MismatchedLength {
                rest: rest.len(),
                initial: initial.len(),
            });
        }
        let required = if options.closed { 3 } else { 2 };
        if rest.len() < required {
            return Err(RodError::TooFewNodes {
                required,
                actual: rest.len(),
            });
        }

        let closed = options.closed;
        let input_nodes = rest.len();

        let rest_frames = prepare_configuration(rest, closed);
        let rest_centerline = Centerline::new(&rest_frames, closed);
        let n = rest_frames.len();
        let m = rest_centerline.edge_count();
        let unlocked = vec![false; n];
        let (rest_kb_left, rest_kb_right) = curvatures(&rest_centerline, &rest_frames, &unlocked);
        let rest = RestState {
            kappa_left: to_material(&rest_frames, &rest_kb_left),
            kappa_right: to_material(&rest_frames, &rest_kb_right),
            twist_rate: (0..m).map(|j| rest_centerline.twist_rate(&rest_frames, j)).collect(),
            lengths: rest_centerline.lengths.clone(),
            frames: rest_frames,
        };

        let frames = prepare_configuration(initial, closed);
        let centerline = Centerline::new(&frames, closed);

        let mut beam = Self {
            id,
            stiffness,
            closed,
            input_nodes,
            rest,
            initial_frames: frames.clone(),
            tangent_locked: unlocked,
            frames,
            centerline,
            kb_left: vec![Vector3::zeros(); n],
            kb_right: vec![Vector3::zeros(); n],
            kappa_left: vec![Vector2::zeros(); n],
            kappa_right: vec![Vector2::zeros(); n],
            twist_rate: vec![0.0; m],
            strain: vec![0.0; m],
            moment_left: vec![Vector2::zeros(); n],
            moment_right: vec![Vector2::zeros(); n],
            torsion: vec![0.0; m],
            shear: vec![Vector3::zeros(); m],
            axial: vec![0.0; m],
            internal_force: vec![Vector3::zeros(); n],
            internal_torque: vec![0.0; n],
            external_force: vec![Vector3::zeros(); n],
            external_torque: vec![0.0; n],
            reaction_force: vec![Vector3::zeros(); n],
            reaction_moment: vec![Vector3::zeros(); n],
            resultant_force: vec![Vector3::zeros(); n],
            resultant_torque: vec![0.0; n],
            loads: LoadDispatch::new(input_nodes, closed),
            external: ExternalLoads::new(n, m),
        };
        beam.update_kinematics();
        Ok(beam)
    }

    /// Create a rod whose initial configuration is its rest configuration.
    pub fn from_configuration(
        id: usize,
        frames: &[Frame],
        stiffness: RodStiffness,
        options: RodOptions,
    ) -> Result<Self> {
        Self::new(id, frames, frames, stiffness, options)
    }

    /// Replace the applied loads.
    pub fn set_loads(&mut self, loads: &[VectorLoad]) -> Result<()> {
        self.loads.fill(loads)?;
        self.refresh_loads();
        Ok(())
    }

    pub fn load_dispatch(&self) -> &LoadDispatch {
        &self.loads
    }

    pub fn external_loads(&self) -> &ExternalLoads {
        &self.external
    }

    pub fn stiffness(&self) -> &RodStiffness {
        &self.stiffness
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn edge_count(&self) -> usize {
        self.centerline.edge_count()
    }

    /// Whether node `i` is a ghost node
    #[inline]
    pub fn is_ghost(&self, i: usize) -> bool {
        i % 2 == 1
    }

    pub fn is_tangent_locked(&self, i: usize) -> bool {
        self.tangent_locked[i]
    }

    pub fn centerline(&self) -> &Centerline {
        &self.centerline
    }

    // Kinematics

    fn update_kinematics(&mut self) {
        self.update_curvature_binormals();
        self.update_material_curvatures();
        self.update_twist();
        self.update_strain();
        self.refresh_loads();
    }

    fn update_curvature_binormals(&mut self) {
        let (left, right) = curvatures(&self.centerline, &self.frames, &self.tangent_locked);
        self.kb_left = left;
        self.kb_right = right;
    }

    fn update_material_curvatures(&mut self) {
        for (i, frame) in self.frames.iter().enumerate() {
            self.kappa_left[i] = material_components(frame, &self.kb_left[i]);
            self.kappa_right[i] = material_components(frame, &self.kb_right[i]);
        }
    }

    fn update_twist(&mut self) {
        for j in 0..self.twist_rate.len() {
            self.twist_rate[j] = self.centerline.twist_rate(&self.frames, j);
        }
    }

    fn update_strain(&mut self) {
        for (j, strain) in self.strain.iter_mut().enumerate() {
            let l0 = self.rest.lengths[j];
            *strain = if l0 > kdr_geometry::EPSILON {
                (self.centerline.lengths[j] - l0) / l0
            } else {
                0.0
            };
        }
    }

    fn refresh_loads(&mut self) {
        let edge_frames: Vec<Frame> = (0..self.edge_count()).map(|j| self.edge_frame(j)).collect();
        self.loads.update(&self.frames, &edge_frames, &mut self.external);
    }

    /// Material frame at the mid-point of edge `j`: the frame of its first
    /// node transported onto the edge and rotated by half the edge twist.
    pub fn edge_frame(&self, j: usize) -> Frame {
        let (a, b) = self.centerline.edge_nodes(j);
        let midpoint = nalgebra::center(&self.frames[a].origin, &self.frames[b].origin);
        let mut frame = parallel_transport(
            &self.frames[a],
            &midpoint,
            &self.centerline.units[j],
            TransportMethod::Rotation,
        );
        frame.rotate(0.5 * self.twist_rate[j] * self.centerline.lengths[j]);
        frame
    }

    // Configuration accessors

    pub fn rest_frames(&self) -> &[Frame] {
        &self.rest.frames
    }

    pub fn initial_frames(&self) -> &[Frame] {
        &self.initial_frames
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.frames.iter().map(|f| f.origin).collect()
    }

    /// Input node positions (handles only)
    pub fn handle_positions(&self) -> Vec<Point3<f64>> {
        self.frames.iter().step_by(2).map(|f| f.origin).collect()
    }

    pub fn rest_lengths(&self) -> &[f64] {
        &self.rest.lengths
    }

    pub fn lengths(&self) -> &[f64] {
        &self.centerline.lengths
    }

    pub fn strain(&self) -> &[f64] {
        &self.strain
    }

    /// Geometric curvature-binormal left of each node, global
    pub fn curvature_left(&self) -> &[Vector3<f64>] {
        &self.kb_left
    }

    /// Geometric curvature-binormal right of each node, global
    pub fn curvature_right(&self) -> &[Vector3<f64>] {
        &self.kb_right
    }

    /// Geometric curvature left of each node, material components
    pub fn material_curvature_left(&self) -> &[Vector2<f64>] {
        &self.kappa_left
    }

    pub fn material_curvature_right(&self) -> &[Vector2<f64>] {
        &self.kappa_right
    }

    pub fn rest_curvature_left(&self) -> &[Vector2<f64>] {
        &self.rest.kappa_left
    }

    pub fn rest_curvature_right(&self) -> &[Vector2<f64>] {
        &self.rest.kappa_right
    }

    pub fn twist_rate(&self) -> &[f64] {
        &self.twist_rate
    }

    pub fn rest_twist_rate(&self) -> &[f64] {
        &self.rest.twist_rate
    }

    /// Convert material components at node `i` to a global vector
    pub fn material_to_global(&self, i: usize, v: &Vector3<f64>) -> Vector3<f64> {
        self.frames[i].to_global(v)
    }

    /// Convert a global vector to material components at node `i`
    pub fn global_to_material(&self, i: usize, v: &Vector3<f64>) -> Vector3<f64> {
        self.frames[i].to_local(v)
    }

    fn rest_centerline(&self) -> Centerline {
        Centerline::new(&self.rest.frames, self.closed)
    }
}

impl Element for RodBeam {
    fn node_count(&self) -> usize {
        self.frames.len()
    }

    fn input_node_count(&self) -> usize {
        self.input_nodes
    }

    fn handle_node(&self, input: usize) -> Option<usize> {
        (input < self.input_nodes).then_some(2 * input)
    }

    fn move_x(&mut self, dx: &[Vector3<f64>]) {
        for (frame, d) in self.frames.iter_mut().zip(dx) {
            frame.origin += d;
        }
        self.centerline.update_edges(&self.frames);
        self.centerline.update_tangents(&self.tangent_locked);
        self.centerline.align_frames(&mut self.frames);
        self.update_curvature_binormals();
        self.update_material_curvatures();
        self.update_twist();
        self.update_strain();
        if self.loads.has_followers() {
            self.refresh_loads();
        }
    }

    fn move_theta(&mut self, dtheta: &[f64]) {
        for (frame, d) in self.frames.iter_mut().zip(dtheta) {
            frame.rotate_small(*d);
        }
        self.update_material_curvatures();
        self.update_twist();
        if self.loads.has_followers() {
            self.refresh_loads();
        }
    }

    fn calculate_x(&mut self) {
        self.calculate_bending();
        self.calculate_torsion();
        self.calculate_shear();
        self.calculate_axial();
        self.assemble_force();
        self.assemble_torque();
    }

    fn calculate_theta(&mut self) {
        self.calculate_bending();
        self.calculate_torsion();
        self.assemble_torque();
    }

    fn lumped_mass_x(&self, masses: &mut [f64]) {
        self.translational_masses(masses);
    }

    fn lumped_mass_theta(&self, masses: &mut [f64]) {
        self.rotational_masses(masses);
    }

    fn resultant_x(&self) -> &[Vector3<f64>] {
        &self.resultant_force
    }

    fn resultant_theta(&self) -> &[f64] {
        &self.resultant_torque
    }

    fn tangent(&self, i: usize) -> Vector3<f64> {
        self.frames[i].zaxis()
    }

    fn lock_tangent(&mut self, i: usize) {
        if self.tangent_locked[i] {
            return;
        }
        self.tangent_locked[i] = true;

        // rest curvature on both sides of a clamp is measured against the
        // rest tangent
        let rest_centerline = self.rest_centerline();
        let (left, right) = node_curvature(&rest_centerline, &self.rest.frames, i, true);
        self.rest.kappa_left[i] = material_components(&self.rest.frames[i], &left);
        self.rest.kappa_right[i] = material_components(&self.rest.frames[i], &right);

        self.update_curvature_binormals();
        self.update_material_curvatures();
    }

    fn moment_imbalance(&self, i: usize) -> Vector3<f64> {
        let frame = &self.frames[i];
        let t = frame.zaxis();
        let has_left = self.centerline.prev_edge(i).is_some();
        let has_right = self.centerline.next_edge(i).is_some();
        let mut m = frame.to_global(&self.external.moment[i]);
        if has_right {
            m += self.global_moment(i, &self.moment_right[i]);
        }
        if has_left {
            m -= self.global_moment(i, &self.moment_left[i]);
        }
        m - t * t.dot(&m)
    }

    fn reaction_force(&self, i: usize) -> Vector3<f64> {
        self.reaction_force[i]
    }

    fn set_reaction_force(&mut self, i: usize, force: Vector3<f64>) {
        self.resultant_force[i] += force - self.reaction_force[i];
        self.reaction_force[i] = force;
    }

    fn reaction_moment(&self, i: usize) -> Vector3<f64> {
        self.reaction_moment[i]
    }

    fn set_reaction_moment(&mut self, i: usize, moment: Vector3<f64>) {
        let t = self.frames[i].zaxis();
        self.resultant_torque[i] += (moment - self.reaction_moment[i]).dot(&t);
        self.reaction_moment[i] = moment;
    }
}

/// Material components `(·d1, ·d2)` of a global vector.
#[inline]
fn material_components(frame: &Frame, v: &Vector3<f64>) -> Vector2<f64> {
    Vector2::new(v.dot(&frame.xaxis), v.dot(&frame.yaxis))
}

fn to_material(frames: &[Frame], kb: &[Vector3<f64>]) -> Vec<Vector2<f64>> {
    frames
        .iter()
        .zip(kb)
        .map(|(frame, k)| material_components(frame, k))
        .collect()
}

/// Left and right curvature-binormals of every node.
fn curvatures(
    centerline: &Centerline,
    frames: &[Frame],
    locked: &[bool],
) -> (Vec<Vector3<f64>>, Vec<Vector3<f64>>) {
    (0..frames.len())
        .map(|i| node_curvature(centerline, frames, i, locked[i]))
        .unzip()
}

fn node_curvature(
    centerline: &Centerline,
    frames: &[Frame],
    i: usize,
    locked: bool,
) -> (Vector3<f64>, Vector3<f64>) {
    let t = &centerline.tangents[i];
    match (centerline.prev_edge(i), centerline.next_edge(i)) {
        (Some(p), Some(q)) if !locked => {
            let (a, _) = centerline.edge_nodes(p);
            let (_, b) = centerline.edge_nodes(q);
            let kb = circumscribed_curvature(&frames[a].origin, &frames[i].origin, &frames[b].origin);
            (kb, kb)
        }
        (prev, next) => (
            prev.map_or_else(Vector3::zeros, |p| tangent_circle_curvature_end(&centerline.edges[p], t)),
            next.map_or_else(Vector3::zeros, |q| tangent_circle_curvature_start(t, &centerline.edges[q])),
        ),
    }
}

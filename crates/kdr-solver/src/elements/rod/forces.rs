//! Internal forces, node resultants and lumped masses of a rod.
//!
//! Sign convention: internal forces and moments on a cross-section are the
//! actions of the material ahead (larger arc length) on the material behind.
//! Node resultants are the discrete form of `n' + f` and `(m' + t × n + m)·t`
//! integrated over the node region, so they vanish at equilibrium.
//!
//! ```text
//! M = B (κ - κ0)                       bending, material components
//! Q = GJ (τ - τ0)                      torsion
//! V = u × (M_b - M_a)/l + u × m + Q κb shear
//! N = ES (l - l0)/l0                   axial
//! ```

use kdr_geometry::EPSILON;
use nalgebra::{Vector2, Vector3};

use super::RodBeam;

impl RodBeam {
    /// Global vector of material bending components at node `i`.
    #[inline]
    pub(super) fn global_moment(&self, i: usize, m: &Vector2<f64>) -> Vector3<f64> {
        let frame = &self.frames[i];
        frame.xaxis * m.x + frame.yaxis * m.y
    }

    #[inline]
    fn bending_stiffness(&self) -> Vector2<f64> {
        Vector2::new(self.stiffness.ei1, self.stiffness.ei2)
    }

    /// Bending moments left and right of every node.
    ///
    /// Ghost and locked nodes take the moments of their geometric curvature.
    /// At a free handle the jump `M_right - M_left` is fixed by node
    /// equilibrium with the applied and reaction moments, and split evenly
    /// around the curvature moment.
    pub(super) fn calculate_bending(&mut self) {
        let b = self.bending_stiffness();
        for i in 0..self.frames.len() {
            let left = b.component_mul(&(self.kappa_left[i] - self.rest.kappa_left[i]));
            let right = b.component_mul(&(self.kappa_right[i] - self.rest.kappa_right[i]));
            if self.is_ghost(i) || self.tangent_locked[i] {
                self.moment_left[i] = left;
                self.moment_right[i] = right;
                continue;
            }

            let applied = self.external.moment[i] + self.frames[i].to_local(&self.reaction_moment[i]);
            let jump = -Vector2::new(applied.x, applied.y);
            let (l, r) = match (self.centerline.prev_edge(i), self.centerline.next_edge(i)) {
                (None, Some(_)) => (Vector2::zeros(), jump),
                (Some(_), None) => (-jump, Vector2::zeros()),
                _ => {
                    let mid = (left + right) * 0.5;
                    (mid - jump * 0.5, mid + jump * 0.5)
                }
            };
            self.moment_left[i] = l;
            self.moment_right[i] = r;
        }
    }

    /// Torsion per edge, `GJ (τ - τ0)`, constant along the edge.
    ///
    /// Node equilibrium only needs the edge value: the bending coupling and
    /// the applied torque per length enter the node torque through
    /// [`assemble_torque`](Self::assemble_torque) as half-edge integrals. The
    /// linear variation along the edge is recovered for display by
    /// [`torsion_at_ends`](Self::torsion_at_ends).
    pub(super) fn calculate_torsion(&mut self) {
        let gj = self.stiffness.gj;
        for (j, q) in self.torsion.iter_mut().enumerate() {
            *q = gj * (self.twist_rate[j] - self.rest.twist_rate[j]);
        }
    }

    pub(super) fn calculate_shear(&mut self) {
        for j in 0..self.shear.len() {
            let (a, b) = self.centerline.edge_nodes(j);
            let l = self.centerline.lengths[j];
            let u = self.centerline.units[j];

            let mut v = u.cross(&self.external.distributed_moment[j]);
            if l > EPSILON {
                let dm = self.global_moment(b, &self.moment_left[b])
                    - self.global_moment(a, &self.moment_right[a]);
                v += u.cross(&dm) / l;
            }
            v += self.edge_curvature(j) * self.torsion[j];
            self.shear[j] = v - u * u.dot(&v);
        }
    }

    pub(super) fn calculate_axial(&mut self) {
        let es = self.stiffness.es;
        for (j, n) in self.axial.iter_mut().enumerate() {
            *n = es * self.strain[j];
        }
    }

    /// Curvature-binormal on edge `j`, mean of the inner sides of its nodes
    fn edge_curvature(&self, j: usize) -> Vector3<f64> {
        let (a, b) = self.centerline.edge_nodes(j);
        (self.kb_right[a] + self.kb_left[b]) * 0.5
    }

    pub(super) fn assemble_force(&mut self) {
        self.internal_force.fill(Vector3::zeros());
        self.external_force.clone_from(&self.external.force);

        for j in 0..self.axial.len() {
            let (a, b) = self.centerline.edge_nodes(j);
            let traction = self.centerline.units[j] * self.axial[j] + self.shear[j];
            self.internal_force[a] += traction;
            self.internal_force[b] -= traction;

            let half = self.external.distributed_force[j] * (0.5 * self.centerline.lengths[j]);
            self.external_force[a] += half;
            self.external_force[b] += half;
        }

        for i in 0..self.resultant_force.len() {
            self.resultant_force[i] =
                self.internal_force[i] + self.external_force[i] + self.reaction_force[i];
        }
    }

    pub(super) fn assemble_torque(&mut self) {
        self.internal_torque.fill(0.0);
        for (i, torque) in self.external_torque.iter_mut().enumerate() {
            *torque = self.external.moment[i].z;
        }

        for j in 0..self.torsion.len() {
            let (a, b) = self.centerline.edge_nodes(j);
            let half = 0.5 * self.centerline.lengths[j];
            let q = self.torsion[j];

            // d/ds of the bending moment along the tangent: M2 κ1 - M1 κ2
            let coupling_a = cross2(&self.kappa_right[a], &self.moment_right[a]);
            let coupling_b = cross2(&self.kappa_left[b], &self.moment_left[b]);
            self.internal_torque[a] += q + half * coupling_a;
            self.internal_torque[b] += -q + half * coupling_b;

            let distributed = half * self.external.distributed_moment[j].dot(&self.centerline.units[j]);
            self.external_torque[a] += distributed;
            self.external_torque[b] += distributed;
        }

        for i in 0..self.resultant_torque.len() {
            let t = self.frames[i].zaxis();
            self.resultant_torque[i] = self.internal_torque[i]
                + self.external_torque[i]
                + self.reaction_moment[i].dot(&t);
        }
    }

    /// Translational lumped masses, summed over adjacent edges:
    /// `ES/l0 + 1.5|N|/l + 4 EI/l³`.
    ///
    /// The full adjacent-edge sum (no `½` factor) and the bending term keep
    /// the unit time step below the stability limit of the bending stencil;
    /// axial stiffness alone underestimates it for slender rods.
    pub(super) fn translational_masses(&self, masses: &mut [f64]) {
        masses.fill(0.0);
        let es = self.stiffness.es;
        let ei = self.stiffness.max_bending();
        for j in 0..self.axial.len() {
            let (a, b) = self.centerline.edge_nodes(j);
            let l0 = self.rest.lengths[j];
            let l = self.centerline.lengths[j];
            let mut k = 0.0;
            if l0 > EPSILON {
                k += es / l0;
            }
            let lb = if l > EPSILON { l } else { l0 };
            if lb > EPSILON {
                k += 1.5 * self.axial[j].abs() / lb + 4.0 * ei / lb.powi(3);
            }
            masses[a] += k;
            masses[b] += k;
        }
    }

    /// Rotational lumped masses, summed over adjacent edges:
    /// `GJ/l0` plus the bending-twist coupling `EI (|κ| + |κ0|)² l/2`.
    pub(super) fn rotational_masses(&self, masses: &mut [f64]) {
        masses.fill(0.0);
        let gj = self.stiffness.gj;
        let ei = self.stiffness.max_bending();
        for j in 0..self.torsion.len() {
            let (a, b) = self.centerline.edge_nodes(j);
            let l0 = self.rest.lengths[j];
            let half = 0.5 * self.centerline.lengths[j];
            let k = if l0 > EPSILON { gj / l0 } else { 0.0 };
            let ka = self.kappa_right[a].norm() + self.rest.kappa_right[a].norm();
            let kb = self.kappa_left[b].norm() + self.rest.kappa_left[b].norm();
            masses[a] += k + ei * ka * ka * half;
            masses[b] += k + ei * kb * kb * half;
        }
    }

    // Internal force accessors

    /// Bending moment left of each node, material components
    pub fn bending_moment_left(&self) -> &[Vector2<f64>] {
        &self.moment_left
    }

    /// Bending moment right of each node, material components
    pub fn bending_moment_right(&self) -> &[Vector2<f64>] {
        &self.moment_right
    }

    pub fn global_bending_moment_left(&self, i: usize) -> Vector3<f64> {
        self.global_moment(i, &self.moment_left[i])
    }

    pub fn global_bending_moment_right(&self, i: usize) -> Vector3<f64> {
        self.global_moment(i, &self.moment_right[i])
    }

    /// Curvature consistent with the bending moment left of node `i`,
    /// `κ0 + M/EI` (geometric curvature where EI vanishes)
    pub fn effective_curvature_left(&self, i: usize) -> Vector2<f64> {
        self.effective_curvature(&self.moment_left[i], &self.rest.kappa_left[i], &self.kappa_left[i])
    }

    pub fn effective_curvature_right(&self, i: usize) -> Vector2<f64> {
        self.effective_curvature(&self.moment_right[i], &self.rest.kappa_right[i], &self.kappa_right[i])
    }

    fn effective_curvature(&self, m: &Vector2<f64>, rest: &Vector2<f64>, actual: &Vector2<f64>) -> Vector2<f64> {
        let b = self.bending_stiffness();
        Vector2::new(
            if b.x > 0.0 { rest.x + m.x / b.x } else { actual.x },
            if b.y > 0.0 { rest.y + m.y / b.y } else { actual.y },
        )
    }

    /// Torsion moment per edge
    pub fn torsion(&self) -> &[f64] {
        &self.torsion
    }

    /// Shear force per edge, global
    pub fn shear(&self) -> &[Vector3<f64>] {
        &self.shear
    }

    /// Axial force per edge, mid-edge value
    pub fn axial(&self) -> &[f64] {
        &self.axial
    }

    /// Axial force at the start and end of edge `j`, corrected by
    /// `∓½l (κb × V + f)·u`.
    pub fn axial_at_ends(&self, j: usize) -> (f64, f64) {
        let u = self.centerline.units[j];
        let l = self.centerline.lengths[j];
        let slope = (self.edge_curvature(j).cross(&self.shear[j]) + self.external.distributed_force[j]).dot(&u);
        let n = self.axial[j];
        (n + 0.5 * l * slope, n - 0.5 * l * slope)
    }

    /// Torsion moment at the start and end of edge `j`, corrected by the
    /// bending coupling and the applied torque per length.
    pub fn torsion_at_ends(&self, j: usize) -> (f64, f64) {
        let (a, b) = self.centerline.edge_nodes(j);
        let u = self.centerline.units[j];
        let l = self.centerline.lengths[j];
        let coupling = 0.5
            * (cross2(&self.kappa_right[a], &self.moment_right[a])
                + cross2(&self.kappa_left[b], &self.moment_left[b]));
        let slope = coupling + self.external.distributed_moment[j].dot(&u);
        let q = self.torsion[j];
        (q + 0.5 * l * slope, q - 0.5 * l * slope)
    }

    pub fn internal_force(&self) -> &[Vector3<f64>] {
        &self.internal_force
    }

    pub fn internal_torque(&self) -> &[f64] {
        &self.internal_torque
    }

    pub fn external_force(&self) -> &[Vector3<f64>] {
        &self.external_force
    }

    pub fn external_torque(&self) -> &[f64] {
        &self.external_torque
    }

    pub fn reaction_forces(&self) -> &[Vector3<f64>] {
        &self.reaction_force
    }

    pub fn reaction_moments(&self) -> &[Vector3<f64>] {
        &self.reaction_moment
    }
}

/// `M2 κ1 - M1 κ2`
#[inline]
fn cross2(kappa: &Vector2<f64>, moment: &Vector2<f64>) -> f64 {
    moment.y * kappa.x - moment.x * kappa.y
}

//! Discrete rod centerline kinematics.
//!
//! A centerline is a polyline of material frames. For each edge it keeps the
//! edge vector, its length and unit direction; for each node the tangent.
//! Frames are re-aligned after every update so that their normal axis is
//! the node tangent, which keeps the frame twist consistent with its
//! neighbours.
//!
//! Tangents follow the circle fits of [`kdr_geometry::circle`]:
//! - interior node: tangent of the circle through the node and its two
//!   neighbours
//! - free open end: reflection of the neighbour tangent about the end chord
//!   (tangent of the same circle at the end point). The frame's own normal
//!   axis is not kept at a free end; it would freeze the end slope and act
//!   as a hidden clamp.
//! - locked node: tangent kept as is (the frame normal axis at the time of
//!   locking)

use kdr_geometry::{
    arc_midpoint, circumscribed_tangent, parallel_transport, reflect_about, reflect_frame,
    twist_angle, Frame, TransportMethod, EPSILON,
};
use nalgebra::{Point3, Vector3};

/// Edge and tangent state of a discrete centerline.
#[derive(Debug, Clone, PartialEq)]
pub struct Centerline {
    closed: bool,
    node_count: usize,
    /// Edge vectors `x_{j+1} - x_j`
    pub edges: Vec<Vector3<f64>>,
    /// Edge lengths
    pub lengths: Vec<f64>,
    /// Unit edge directions
    pub units: Vec<Vector3<f64>>,
    /// Unit edge directions before the last update
    pub prev_units: Vec<Vector3<f64>>,
    /// Node tangents
    pub tangents: Vec<Vector3<f64>>,
}

impl Centerline {
    /// Build the centerline of a frame sequence. Tangents start as the frame
    /// normal axes.
    pub fn new(frames: &[Frame], closed: bool) -> Self {
        let node_count = frames.len();
        let edge_count = edge_count(node_count, closed);
        let mut centerline = Self {
            closed,
            node_count,
            edges: vec![Vector3::zeros(); edge_count],
            lengths: vec![0.0; edge_count],
            units: vec![Vector3::zeros(); edge_count],
            prev_units: vec![Vector3::zeros(); edge_count],
            tangents: frames.iter().map(Frame::zaxis).collect(),
        };
        centerline.update_edges(frames);
        centerline.prev_units.clone_from(&centerline.units);
        centerline
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edge arriving at node `i`
    #[inline]
    pub fn prev_edge(&self, i: usize) -> Option<usize> {
        if i > 0 {
            Some(i - 1)
        } else if self.closed {
            Some(self.node_count - 1)
        } else {
            None
        }
    }

    /// Edge leaving node `i`
    #[inline]
    pub fn next_edge(&self, i: usize) -> Option<usize> {
        if i + 1 < self.node_count || (self.closed && i < self.node_count) {
            Some(i)
        } else {
            None
        }
    }

    /// End nodes `(a, b)` of edge `j`
    #[inline]
    pub fn edge_nodes(&self, j: usize) -> (usize, usize) {
        (j, (j + 1) % self.node_count)
    }

    /// Half of the adjacent edge lengths
    pub fn voronoi_length(&self, i: usize) -> f64 {
        let prev = self.prev_edge(i).map_or(0.0, |j| self.lengths[j]);
        let next = self.next_edge(i).map_or(0.0, |j| self.lengths[j]);
        0.5 * (prev + next)
    }

    /// Total length of the centerline
    pub fn total_length(&self) -> f64 {
        self.lengths.iter().sum()
    }

    /// Recompute edge vectors from the frame origins. The previous unit
    /// directions are kept in `prev_units`.
    pub fn update_edges(&mut self, frames: &[Frame]) {
        std::mem::swap(&mut self.units, &mut self.prev_units);
        for j in 0..self.edges.len() {
            let (a, b) = self.edge_nodes(j);
            let e = frames[b].origin - frames[a].origin;
            let l = e.norm();
            self.edges[j] = e;
            self.lengths[j] = l;
            self.units[j] = if l > EPSILON {
                e / l
            } else {
                // zero-length edge keeps its previous direction
                self.prev_units[j]
            };
        }
    }

    /// Recompute node tangents. Nodes flagged in `locked` keep their tangent.
    pub fn update_tangents(&mut self, locked: &[bool]) {
        let n = self.node_count;
        for i in 0..n {
            if locked.get(i).copied().unwrap_or(false) {
                continue;
            }
            if let (Some(p), Some(q)) = (self.prev_edge(i), self.next_edge(i)) {
                if let Some(t) = circumscribed_tangent(&self.edges[p], &self.edges[q]) {
                    self.tangents[i] = t;
                }
            }
        }
        if self.closed || n < 2 {
            return;
        }
        let last = n - 1;
        if !locked.first().copied().unwrap_or(false) {
            self.tangents[0] = if n > 2 {
                reflect_about(&self.tangents[1], &self.units[0])
            } else {
                self.units[0]
            };
        }
        if !locked.get(last).copied().unwrap_or(false) {
            self.tangents[last] = if n > 2 {
                reflect_about(&self.tangents[last - 1], &self.units[last - 1])
            } else {
                self.units[last - 1]
            };
        }
    }

    /// Rotate each frame about its origin so that its normal axis becomes the
    /// node tangent.
    pub fn align_frames(&self, frames: &mut [Frame]) {
        for (frame, tangent) in frames.iter_mut().zip(&self.tangents) {
            *frame = parallel_transport(frame, &frame.origin, tangent, TransportMethod::Rotation);
        }
    }

    /// Rate of twist on edge `j`, `τ = -twist_angle(f_a, f_b) / l`.
    pub fn twist_rate(&self, frames: &[Frame], j: usize) -> f64 {
        let l = self.lengths[j];
        if l <= EPSILON {
            return 0.0;
        }
        let (a, b) = self.edge_nodes(j);
        -twist_angle(&frames[a], &frames[b]) / l
    }
}

/// Number of edges for `node_count` nodes
pub fn edge_count(node_count: usize, closed: bool) -> usize {
    if closed {
        node_count
    } else {
        node_count.saturating_sub(1)
    }
}

/// Frame of the ghost node inserted between handles `fa` and `fb`.
///
/// The position averages the arc mid-points of the two circles tangent to
/// the handle tangents. The orientation is `fa` transported onto the chord
/// and rotated by half of the handle-to-handle twist.
pub fn ghost_frame(fa: &Frame, fb: &Frame) -> Frame {
    let ta = fa.zaxis();
    let tb = fb.zaxis();
    let from_a = arc_midpoint(&fa.origin, &ta, &fb.origin);
    let from_b = arc_midpoint(&fb.origin, &(-tb), &fa.origin);
    let origin = nalgebra::center(&from_a, &from_b);

    let direction = (fb.origin - fa.origin)
        .try_normalize(EPSILON)
        .unwrap_or(ta);
    let mut ghost = parallel_transport(fa, &origin, &direction, TransportMethod::Rotation);
    ghost.rotate(-0.5 * twist_angle(fa, fb));
    ghost
}

/// Insert a ghost node after every handle: `N` frames become `2N - 1`
/// (open) or `2N` (closed) frames, handles at even indices.
pub fn refine(frames: &[Frame], closed: bool) -> Vec<Frame> {
    let n = frames.len();
    let mut refined = Vec::with_capacity(2 * n);
    for (k, frame) in frames.iter().enumerate() {
        refined.push(*frame);
        if k + 1 < n {
            refined.push(ghost_frame(frame, &frames[k + 1]));
        } else if closed && n > 1 {
            refined.push(ghost_frame(frame, &frames[0]));
        }
    }
    refined
}

/// Refine an input configuration and align every frame with the circle
/// tangents of the refined polyline.
pub fn prepare_configuration(frames: &[Frame], closed: bool) -> Vec<Frame> {
    let mut refined = refine(frames, closed);
    let mut centerline = Centerline::new(&refined, closed);
    centerline.update_tangents(&[]);
    centerline.align_frames(&mut refined);
    refined
}

/// Frames along a polyline, propagated by double reflection from a first
/// frame whose first axis is the projection of `up`.
pub fn frames_from_polyline(points: &[Point3<f64>], up: &Vector3<f64>, closed: bool) -> Vec<Frame> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![Frame::from_normal_and_reference(points[0], &Vector3::z(), up)];
    }
    let chord = |a: usize, b: usize| points[b] - points[a];
    let tangents: Vec<Vector3<f64>> = (0..n)
        .map(|i| {
            let prev = if i > 0 {
                Some(chord(i - 1, i))
            } else if closed {
                Some(chord(n - 1, 0))
            } else {
                None
            };
            let next = if i + 1 < n {
                Some(chord(i, i + 1))
            } else if closed {
                Some(chord(n - 1, 0))
            } else {
                None
            };
            let fitted = match (prev, next) {
                (Some(p), Some(q)) => circumscribed_tangent(&p, &q),
                (None, Some(e)) | (Some(e), None) => e.try_normalize(EPSILON),
                (None, None) => None,
            };
            fitted.unwrap_or_else(Vector3::z)
        })
        .collect();

    let mut frames = Vec::with_capacity(n);
    frames.push(Frame::from_normal_and_reference(points[0], &tangents[0], up));
    for i in 1..n {
        let next = reflect_frame(&frames[i - 1], &points[i], &tangents[i]);
        frames.push(next);
    }
    frames
}

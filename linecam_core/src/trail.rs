//! Bounded history of anchor positions for the fading trail behind a line.

use nalgebra::Vector3;
use std::collections::VecDeque;

/// Keeps the last `capacity` positions, oldest first.
///
/// A capacity of 0 keeps nothing. A point equal to the newest one is not
/// recorded again, so a line at rest holds a single trail point.
#[derive(Debug, Clone, PartialEq)]
pub struct Trail {
    points: VecDeque<Vector3<f64>>,
    capacity: usize,
}

impl Trail {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::new(),
            capacity,
        }
    }

    /// Records a position, evicting the oldest one when full.
    pub fn push(&mut self, point: Vector3<f64>) {
        if self.capacity == 0 {
            return;
        }
        if self.points.back() == Some(&point) {
            return;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Vector3<f64>> {
        self.points.iter()
    }

    /// Returns `(point, opacity)` pairs, opacity rising linearly from the
    /// oldest point to 1.0 at the newest.
    pub fn faded(&self) -> Vec<(Vector3<f64>, f64)> {
        let n = self.points.len();
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| (*p, (i + 1) as f64 / n as f64))
            .collect()
    }
}

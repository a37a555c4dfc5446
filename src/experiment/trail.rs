use glam::Vec3;
use std::collections::VecDeque;

/// Points traced by a moving body, oldest first.
///
/// Unbounded unless a capacity is given, in which case the oldest point is
/// dropped when a new one would exceed it.
#[derive(Debug, Clone, Default)]
pub struct TrailBuffer {
    points: VecDeque<Vec3>,
    capacity: Option<usize>,
}

impl TrailBuffer {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            points: VecDeque::new(),
            capacity: capacity.filter(|c| *c > 0),
        }
    }

    pub fn push(&mut self, point: Vec3) {
        if let Some(cap) = self.capacity {
            while self.points.len() >= cap {
                self.points.pop_front();
            }
        }
        self.points.push_back(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// The whole buffer as one slice, for rebuilding line geometry.
    pub fn as_slice(&mut self) -> &[Vec3] {
        self.points.make_contiguous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_trail_keeps_everything() {
        let mut trail = TrailBuffer::new(None);
        for i in 0..1000 {
            trail.push(Vec3::splat(i as f32));
        }
        assert_eq!(trail.len(), 1000);
        assert_eq!(trail.as_slice()[0], Vec3::ZERO);
    }

    #[test]
    fn capped_trail_evicts_oldest() {
        let mut trail = TrailBuffer::new(Some(3));
        for i in 0..5 {
            trail.push(Vec3::new(i as f32, 0.0, 0.0));
        }
        let xs: Vec<f32> = trail.as_slice().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn zero_capacity_means_unbounded() {
        let trail = TrailBuffer::new(Some(0));
        assert_eq!(trail.capacity(), None);
    }
}

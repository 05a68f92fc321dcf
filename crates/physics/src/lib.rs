#![warn(missing_docs)]
//! Physics primitives: bounding volumes and rigid body state.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB ensuring min <= max per axis.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        debug_assert!(min.cmple(max).all());
        Self { min, max }
    }

    /// Box centred on `center` with the given full extents.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Full extents along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Centre point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Tests intersection with another AABB.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Tests whether `point` lies inside or on the box.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.min.cmple(point).all() && self.max.cmpge(point).all()
    }

    /// Length of the box projected onto `axis` (components taken by absolute value).
    pub fn extent_along(&self, axis: Vec3) -> f32 {
        self.size().dot(axis.abs())
    }
}

/// Simulated rigid body attached to a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigidBody {
    /// Linear velocity in world units per second.
    pub linear_velocity: Vec3,
    /// Angular velocity in radians per second.
    pub angular_velocity: Vec3,
    /// Kinematic bodies are moved by code only; the simulation leaves them alone.
    pub kinematic: bool,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            kinematic: false,
        }
    }
}

impl RigidBody {
    /// Dynamic body at rest.
    pub fn dynamic() -> Self {
        Self::default()
    }

    /// Kinematic body at rest.
    pub fn kinematic() -> Self {
        Self {
            kinematic: true,
            ..Self::default()
        }
    }

    /// Stop all motion.
    pub fn zero_velocities(&mut self) {
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
    }

    /// Displacement the simulation applies over `dt`.
    pub fn displacement(&self, dt: f32) -> Vec3 {
        if self.kinematic {
            Vec3::ZERO
        } else {
            self.linear_velocity * dt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_and_center() {
        let aabb = Aabb::from_center_size(Vec3::new(1.0, 2.0, 3.0), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(aabb.size(), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(aabb.center(), Vec3::new(1.0, 2.0, 3.0));
        assert!(aabb.contains_point(Vec3::new(0.0, 0.0, 0.0)));
    }

    #[test]
    fn extent_along_uses_absolute_axis() {
        let aabb = Aabb::from_center_size(Vec3::ZERO, Vec3::new(0.2, 0.04, 0.2));
        assert!((aabb.extent_along(Vec3::NEG_Y) - 0.04).abs() < 1e-6);
        let diagonal = Vec3::new(1.0, 1.0, 0.0).normalize();
        let expected = (0.2 + 0.04) * diagonal.x;
        assert!((aabb.extent_along(diagonal) - expected).abs() < 1e-6);
    }

    #[test]
    fn intersection() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(0.5), Vec3::splat(2.0));
        let c = Aabb::new(Vec3::splat(3.0), Vec3::splat(4.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn kinematic_bodies_do_not_drift() {
        let mut body = RigidBody::kinematic();
        body.linear_velocity = Vec3::X;
        assert_eq!(body.displacement(1.0), Vec3::ZERO);
        body.kinematic = false;
        assert_eq!(body.displacement(0.5), Vec3::new(0.5, 0.0, 0.0));
        body.zero_velocities();
        assert_eq!(body.displacement(1.0), Vec3::ZERO);
    }
}

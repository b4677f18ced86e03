pub mod aabb;
pub mod util;

pub use glam::{DVec3, DVec4};
pub use aabb::Aabb3;
pub use util::{angle_between, distance};

pub type Point3 = DVec3;
pub type Vector3 = DVec3;

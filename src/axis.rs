extern crate glam;

use std::ops::{Index, IndexMut};

use strum::EnumIter;

/// 3D Axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
#[repr(u8)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Index<Axis> for glam::Vec3A {
    type Output = f32;

    fn index(&self, axis: Axis) -> &Self::Output {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

impl IndexMut<Axis> for glam::Vec3A {
    fn index_mut(&mut self, axis: Axis) -> &mut Self::Output {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Axis;

    use strum::IntoEnumIterator;

    #[test]
    fn axis_indexes_components() {
        let v = glam::Vec3A::new(1.0, 2.0, 3.0);
        let components: Vec<f32> = Axis::iter().map(|axis| v[axis]).collect();
        assert_eq!(components, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn index_mut_writes_components() {
        let mut v = glam::Vec3A::ZERO;
        for (i, axis) in Axis::iter().enumerate() {
            v[axis] = i as f32;
        }
        assert_eq!(v, glam::Vec3A::new(0.0, 1.0, 2.0));
    }
}

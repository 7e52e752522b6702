use std::{
    fmt::Display,
    ops::{Add, Mul},
};

use num_traits::{Signed, Zero};

pub trait VectorValue: Sized + Copy + Default {}
impl<T> VectorValue for T where T: Sized + Copy + Default {}

#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash, PartialOrd, Ord)]
pub struct Vector<const SIZE: usize, T: VectorValue>(pub [T; SIZE]);

/// Pixel-space vector (canvas-local, top-left origin).
pub type Vec2f = Vector<2, f32>;

/// Grid-space coordinate in grid units.
pub type Vec2i = Vector<2, i32>;

impl<const SIZE: usize, T: VectorValue> Vector<SIZE, T> {
    pub fn single_value(value: T) -> Self {
        Self([value; SIZE])
    }

    pub fn convert<I: VectorValue>(&self, converter: impl Fn(T) -> I) -> Vector<SIZE, I> {
        let mut v = [I::default(); SIZE];
        for (i, value) in self.0.iter().enumerate() {
            v[i] = converter(*value);
        }
        Vector(v)
    }

    pub fn combine_with<I: VectorValue, O: VectorValue>(
        &self,
        other: Vector<SIZE, I>,
        combiner: impl Fn(T, I) -> O,
    ) -> Vector<SIZE, O> {
        let mut v = [O::default(); SIZE];
        for i in 0..SIZE {
            v[i] = combiner(self.0[i], other.0[i]);
        }
        Vector(v)
    }

    pub fn length_squared(&self) -> T
    where
        T: Add<Output = T> + Mul<Output = T>,
    {
        self.0
            .iter()
            .fold(T::default(), |acc, value| acc + *value * *value)
    }

    /// Sum of absolute components (L1 norm).
    pub fn manhattan_length(&self) -> T
    where
        T: Signed,
    {
        self.0
            .iter()
            .fold(T::zero(), |acc, value| acc + value.abs())
    }

    pub fn is_zero(&self) -> bool
    where
        T: Zero,
    {
        self.0.iter().all(Zero::is_zero)
    }
}

impl<T: VectorValue> Vector<2, T> {
    pub const fn new(x: T, y: T) -> Self {
        Self([x, y])
    }
}

macro_rules! impl_vec_component {
    ($name:ident, $index:literal) => {
        impl<T: VectorValue> Vector<2, T> {
            #[inline]
            pub fn $name(&self) -> T {
                self.0[$index]
            }

            paste::paste! {
                #[inline]
                pub fn [< with_ $name >](&self, value: T) -> Self {
                    let mut n = *self;
                    n.0[$index] = value;
                    n
                }

                #[inline]
                pub fn [< $name _mut >](&mut self) -> &mut T {
                    &mut self.0[$index]
                }
            }
        }
    };
}

impl_vec_component!(x, 0);
impl_vec_component!(y, 1);

impl<const SIZE: usize, T: VectorValue> Default for Vector<SIZE, T> {
    fn default() -> Self {
        Self([Default::default(); SIZE])
    }
}

impl<const SIZE: usize, T: VectorValue + Display> Display for Vector<SIZE, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("(")?;
        for i in 0..SIZE {
            if i > 0 {
                f.write_str(", ")?;
            }
            self.0[i].fmt(f)?;
        }
        f.write_str(")")
    }
}

macro_rules! impl_op {
    ($trait:ident, $fn:ident, $op:tt) => {
        impl<const SIZE: usize, T: VectorValue + std::ops::$trait<Output = O>, O: VectorValue, R: Into<Vector<SIZE, T>>> std::ops::$trait<R> for Vector<SIZE, T> {
            type Output = Vector<SIZE, O>;

            fn $fn(self, rhs: R) -> Self::Output {
                let mut res = Vector::<SIZE, O>::default();
                let rhs_v = rhs.into();
                for i in 0..SIZE {
                    res.0[i] = self.0[i] $op rhs_v.0[i]
                }
                res
            }
        }
        paste::paste! {
            impl<const SIZE: usize, T: VectorValue + std::ops::$trait<Output = T>, R: Into<Vector<SIZE, T>>> std::ops::[<$trait Assign>]<R> for Vector<SIZE, T> {
                fn [<$fn _assign>](&mut self, rhs: R) {
                    let rhs_v = rhs.into();
                    for i in 0..SIZE {
                        self.0[i] = self.0[i] $op rhs_v.0[i]
                    }
                }
            }
        }
    };
}

impl_op!(Add, add, +);
impl_op!(Sub, sub, -);
impl_op!(Mul, mul, *);
impl_op!(Div, div, /);

impl<const SIZE: usize, T: VectorValue + std::ops::Neg<Output = O>, O: VectorValue> std::ops::Neg
    for Vector<SIZE, T>
{
    type Output = Vector<SIZE, O>;

    fn neg(self) -> Self::Output {
        let mut res = Vector::<SIZE, O>::default();
        for i in 0..SIZE {
            res.0[i] = -self.0[i];
        }
        res
    }
}

impl<const SIZE: usize, T: VectorValue> From<T> for Vector<SIZE, T> {
    fn from(value: T) -> Self {
        Self::single_value(value)
    }
}

impl<const SIZE: usize, T: VectorValue> From<[T; SIZE]> for Vector<SIZE, T> {
    fn from(value: [T; SIZE]) -> Self {
        Self(value)
    }
}

impl<const SIZE: usize, T: VectorValue> From<Vector<SIZE, T>> for [T; SIZE] {
    fn from(value: Vector<SIZE, T>) -> Self {
        value.0
    }
}

impl From<Vec2f> for emath::Pos2 {
    fn from(value: Vec2f) -> Self {
        emath::pos2(value.x(), value.y())
    }
}

impl From<Vec2f> for emath::Vec2 {
    fn from(value: Vec2f) -> Self {
        emath::vec2(value.x(), value.y())
    }
}

impl From<emath::Pos2> for Vec2f {
    fn from(value: emath::Pos2) -> Self {
        Self([value.x, value.y])
    }
}

impl From<emath::Vec2> for Vec2f {
    fn from(value: emath::Vec2) -> Self {
        Self([value.x, value.y])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_ops_broadcast() {
        let v = Vec2i::new(3, -4);
        assert_eq!(v * 10, Vec2i::new(30, -40));
        assert_eq!(v - Vec2i::new(1, 1), Vec2i::new(2, -5));
        assert_eq!(v.manhattan_length(), 7);
    }

    #[test]
    fn emath_round_trip() {
        let p: emath::Pos2 = Vec2f::new(1.5, 2.0).into();
        assert_eq!(Vec2f::from(p), Vec2f::new(1.5, 2.0));
    }
}

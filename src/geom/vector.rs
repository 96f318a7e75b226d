use crate::Point;
use crate::geom::EPS;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Vector {
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    pub fn from_points(beg: Point, end: Point) -> Self {
        Self {
            dx: end.x - beg.x,
            dy: end.y - beg.y,
            dz: end.z - beg.z,
        }
    }

    /// Cross product between 2 vectors.
    pub fn cross(self, other: Self) -> Self {
        Self {
            dx: self.dy * other.dz - self.dz * other.dy,
            dy: self.dz * other.dx - self.dx * other.dz,
            dz: self.dx * other.dy - self.dy * other.dx,
        }
    }

    /// Dot product between 2 vectors.
    pub fn dot(self, other: Self) -> f64 {
        self.dx * other.dx + self.dy * other.dy + self.dz * other.dz
    }

    /// Returns the length of the vector.
    pub fn length(&self) -> f64 {
        (self.dx.powi(2) + self.dy.powi(2) + self.dz.powi(2)).sqrt()
    }

    pub fn is_close(&self, other: &Self) -> bool {
        (self.dx - other.dx).abs() < EPS
            && (self.dy - other.dy).abs() < EPS
            && (self.dz - other.dz).abs() < EPS
    }

    /// Normalizes the vector (divides by its length) and returns a copy.
    pub fn normalize(&self) -> Option<Self> {
        let len = self.length();
        if len < EPS {
            None
        } else {
            Some(Self {
                dx: self.dx / len,
                dy: self.dy / len,
                dz: self.dz / len,
            })
        }
    }

    /// Calculates vector normal to the surface defined with 3 points.
    ///
    /// Returns None if the points are collinear.
    pub fn normal(pt0: Point, pt1: Point, pt2: Point) -> Option<Self> {
        let v01 = Self::from_points(pt0, pt1);
        let v02 = Self::from_points(pt0, pt2);
        v01.cross(v02).normalize()
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(2); // Default 2 decimals
        write!(
            f,
            "Vector({:.prec$}, {:.prec$}, {:.prec$})",
            self.dx,
            self.dy,
            self.dz,
            prec = prec
        )
    }
}

impl Add for Vector {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            dx: self.dx + other.dx,
            dy: self.dy + other.dy,
            dz: self.dz + other.dz,
        }
    }
}

impl Sub for Vector {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            dx: self.dx - other.dx,
            dy: self.dy - other.dy,
            dz: self.dz - other.dz,
        }
    }
}

impl Mul<f64> for Vector {
    type Output = Self;
    fn mul(self, other: f64) -> Self {
        Self {
            dx: self.dx * other,
            dy: self.dy * other,
            dz: self.dz * other,
        }
    }
}

impl Neg for Vector {
    type Output = Self;
    fn neg(self) -> Self {
        self * -1.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross() {
        let vx = Vector::new(1., 0., 0.);
        let vy = Vector::new(0., 1., 0.);
        assert!(vx.cross(vy).is_close(&Vector::new(0., 0., 1.)));
        assert!(vy.cross(vx).is_close(&Vector::new(0., 0., -1.)));
    }

    #[test]
    fn test_dot_and_length() {
        let v = Vector::new(1., 2., 2.);
        assert!((v.dot(v) - 9.).abs() < EPS);
        assert!((v.length() - 3.).abs() < EPS);
    }

    #[test]
    fn test_normal() {
        let n = Vector::normal(
            Point::new(0., 0., 0.),
            Point::new(1., 0., 0.),
            Point::new(0., 1., 0.),
        )
        .unwrap();
        assert!(n.is_close(&Vector::new(0., 0., 1.)));

        let collinear = Vector::normal(
            Point::new(0., 0., 0.),
            Point::new(1., 0., 0.),
            Point::new(2., 0., 0.),
        );
        assert!(collinear.is_none());
    }

    #[test]
    fn test_ops() {
        let a = Vector::new(1., 2., 3.);
        let b = Vector::new(3., 2., 1.);
        assert!((a + b).is_close(&Vector::new(4., 4., 4.)));
        assert!((a - b).is_close(&Vector::new(-2., 0., 2.)));
        assert!((-a * 2.).is_close(&Vector::new(-2., -4., -6.)));
    }
}

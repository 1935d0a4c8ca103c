use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

/// Integer grid coordinate or step.
///
/// Positive `x` points right, positive `y` points down (row order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: i32,
    pub y: i32,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Clamps every component to -1, 0 or 1.
    pub fn signum(self) -> Vector {
        Vector::new(self.x.signum(), self.y.signum())
    }

    pub fn is_zero(self) -> bool {
        self == Vector::ZERO
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, other: Vector) -> Vector {
        Vector::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, other: Vector) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<i32> for Vector {
    type Output = Vector;

    fn mul(self, scalar: i32) -> Vector {
        Vector::new(self.x * scalar, self.y * scalar)
    }
}

impl Div<i32> for Vector {
    type Output = Vector;

    fn div(self, scalar: i32) -> Vector {
        Vector::new(self.x / scalar, self.y / scalar)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_arithmetic() {
        let a = Vector::new(3, -2);
        let b = Vector::new(1, 5);

        assert_eq!(a + b, Vector::new(4, 3));
        assert_eq!(a - b, Vector::new(2, -7));
        assert_eq!(a * 3, Vector::new(9, -6));
        assert_eq!(Vector::new(9, -6) / 3, a);
    }

    #[test]
    fn test_vector_division_truncates_toward_zero() {
        assert_eq!(Vector::new(7, -7) / 2, Vector::new(3, -3));
    }

    #[test]
    fn test_vector_signum() {
        assert_eq!(Vector::new(12, -4).signum(), Vector::new(1, -1));
        assert_eq!(Vector::new(0, 9).signum(), Vector::new(0, 1));
        assert!(Vector::new(0, 0).signum().is_zero());
    }

    #[test]
    fn test_vector_display() {
        assert_eq!(Vector::new(4, 2).to_string(), "(4, 2)");
    }
}

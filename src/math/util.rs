use super::{Point2d, Vector2d};
use cgmath::prelude::*;
use cgmath::{Basis2, Rad};

/// Converts a vector to polar coordinates, returning `(radius, angle)`.
pub fn to_polar(vec: Vector2d) -> (f64, Rad<f64>) {
    (vec.magnitude(), Rad(vec.y.atan2(vec.x)))
}

/// Builds a vector from polar coordinates.
pub fn from_polar(radius: f64, angle: Rad<f64>) -> Vector2d {
    Vector2d::new(radius * angle.cos(), radius * angle.sin())
}

/// A similarity transform that rotates and scales points about the origin, then translates them.
#[derive(Clone, Copy, Debug)]
pub struct Transform2d {
    rotation: Basis2<f64>,
    scale: f64,
    translation: Vector2d,
}

impl Transform2d {
    /// Creates a transform that maps the unit x-vector onto `direction`
    /// and the origin onto `origin`.
    ///
    /// A zero `direction` is treated as the unit x-vector.
    pub fn new(origin: Point2d, direction: Vector2d) -> Self {
        let (scale, angle) = if direction.magnitude2() > 0.0 {
            to_polar(direction)
        } else {
            (1.0, Rad(0.0))
        };
        Self {
            rotation: Basis2::from_angle(angle),
            scale,
            translation: origin.to_vec(),
        }
    }

    /// Applies the transform to a point.
    pub fn apply(&self, point: Point2d) -> Point2d {
        let rotated = self.rotation.rotate_vector(point.to_vec());
        Point2d::from_vec(rotated * self.scale + self.translation)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn polar_round_trip() {
        let v = Vector2d::new(-3.0, 4.0);
        let (r, a) = to_polar(v);
        assert_approx_eq!(r, 5.0);
        let w = from_polar(r, a);
        assert_approx_eq!(w.x, v.x);
        assert_approx_eq!(w.y, v.y);
    }

    #[test]
    fn transform_rotates_then_translates() {
        let t = Transform2d::new(Point2d::new(10.0, 5.0), Vector2d::new(0.0, 2.0));
        let p = t.apply(Point2d::new(1.0, 0.0));
        assert_approx_eq!(p.x, 10.0);
        assert_approx_eq!(p.y, 6.0);
    }

    #[test]
    fn transform_scales_by_direction_length() {
        let t = Transform2d::new(Point2d::new(0.0, 0.0), Vector2d::new(3.0, 4.0));
        let p = t.apply(Point2d::new(2.0, 0.0));
        assert_approx_eq!(p.x, 6.0);
        assert_approx_eq!(p.y, 8.0);

        let t = Transform2d::new(Point2d::new(1.0, 1.0), Vector2d::new(0.0, 0.0));
        assert_eq!(t.apply(Point2d::new(2.0, 3.0)), Point2d::new(3.0, 4.0));
    }
}

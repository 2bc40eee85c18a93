use super::Point2d;
use crate::util::Interval;

/// An axis-aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: Interval<f64>,
    pub y: Interval<f64>,
}

impl Rect {
    /// Creates the smallest rectangle containing every point, if there are any.
    pub fn bounding(points: impl IntoIterator<Item = Point2d>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let init = Self {
            x: Interval::point(first.x),
            y: Interval::point(first.y),
        };
        Some(points.fold(init, |rect, p| Self {
            x: rect.x.extend(p.x),
            y: rect.y.extend(p.y),
        }))
    }

    /// The corner with the smallest coordinates.
    pub fn min(&self) -> Point2d {
        Point2d::new(self.x.min, self.y.min)
    }

    /// The corner with the largest coordinates.
    pub fn max(&self) -> Point2d {
        Point2d::new(self.x.max, self.y.max)
    }

    pub fn width(&self) -> f64 {
        self.x.length()
    }

    pub fn height(&self) -> f64 {
        self.y.length()
    }

    /// Returns true if the point lies inside or on the border of the rectangle.
    pub fn contains(&self, point: Point2d) -> bool {
        self.x.contains(point.x) && self.y.contains(point.y)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bounding_rect() {
        assert_eq!(Rect::bounding(std::iter::empty()), None);
        let rect = Rect::bounding([
            Point2d::new(1.0, 2.0),
            Point2d::new(-3.0, 5.0),
            Point2d::new(4.0, -1.0),
        ])
        .unwrap();
        assert_eq!(rect.min(), Point2d::new(-3.0, -1.0));
        assert_eq!(rect.max(), Point2d::new(4.0, 5.0));
        assert_eq!(rect.width(), 7.0);
        assert!(rect.contains(Point2d::new(0.0, 0.0)));
        assert!(!rect.contains(Point2d::new(0.0, 6.0)));
    }
}

use crate::math::{ParametricCurve2d, Point2d, Vector2d};
use cgmath::prelude::*;

/// The number of chords used to approximate a curve.
const CHORDS: usize = 256;

/// A curve resampled so that it can be queried by distance along it.
#[derive(Clone, Debug)]
pub struct SegmentCurve {
    /// Points along the curve at equal parameter steps.
    points: Vec<Point2d>,
    /// The arc length from the start of the curve to each point.
    dists: Vec<f64>,
}

impl SegmentCurve {
    /// Approximates the given curve with a polyline.
    pub fn new(curve: &impl ParametricCurve2d) -> Self {
        let points = (0..=CHORDS)
            .map(|i| curve.sample(i as f64 / CHORDS as f64))
            .collect::<Vec<_>>();
        let dists = std::iter::once(0.0)
            .chain(points.windows(2).scan(0.0, |total, pair| {
                *total += pair[0].distance(pair[1]);
                Some(*total)
            }))
            .collect();
        Self { points, dists }
    }

    /// The length of the curve in m.
    pub fn length(&self) -> f64 {
        self.dists[CHORDS]
    }

    /// The point at the given distance along the curve.
    /// Distances outside of the curve are clamped to its ends.
    pub fn position_at(&self, dist: f64) -> Point2d {
        let (idx, frac) = self.locate(dist);
        let p0 = self.points[idx];
        let p1 = self.points[idx + 1];
        p0 + (p1 - p0) * frac
    }

    /// A unit vector tangent to the curve at the given distance along it.
    pub fn tangent_at(&self, dist: f64) -> Vector2d {
        let (idx, _) = self.locate(dist);
        let chord = self.points[idx + 1] - self.points[idx];
        if chord.magnitude2() > 0.0 {
            chord.normalize()
        } else {
            Vector2d::new(0.0, 0.0)
        }
    }

    /// Finds the chord containing `dist`, and the fraction of the way along it.
    fn locate(&self, dist: f64) -> (usize, f64) {
        let dist = dist.clamp(0.0, self.length());
        let idx = self
            .dists
            .partition_point(|d| *d <= dist)
            .saturating_sub(1)
            .min(CHORDS - 1);
        let span = self.dists[idx + 1] - self.dists[idx];
        let frac = if span > 0.0 {
            (dist - self.dists[idx]) / span
        } else {
            0.0
        };
        (idx, frac)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::{LineSegment2d, QuadraticBezier2d};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn straight_line_length() {
        let line = LineSegment2d::from_ends(Point2d::new(0.0, 0.0), Point2d::new(30.0, 40.0));
        let curve = SegmentCurve::new(&line);
        assert_approx_eq!(curve.length(), 50.0);

        let mid = curve.position_at(25.0);
        assert_approx_eq!(mid.x, 15.0);
        assert_approx_eq!(mid.y, 20.0);

        let end = curve.position_at(80.0);
        assert_approx_eq!(end.x, 30.0);
        assert_approx_eq!(end.y, 40.0);
    }

    #[test]
    fn curve_is_arclength_parameterised() {
        let curve = QuadraticBezier2d::new(&[
            Point2d::new(10.0, 10.0),
            Point2d::new(60.0, 40.0),
            Point2d::new(100.0, 45.0),
        ]);
        let curve = SegmentCurve::new(&curve);

        let ts = (0..100)
            .map(|i| i as f64 * 0.01 * curve.length())
            .collect::<Vec<_>>();
        for ts in ts.windows(2) {
            let p1 = curve.position_at(ts[0]);
            let p2 = curve.position_at(ts[1]);
            assert_approx_eq!((p2 - p1).magnitude(), ts[1] - ts[0], 0.01);
        }
    }
}

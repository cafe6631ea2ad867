//! Step animation response curves
//!
//! A step is shaped by two sets of per-axis curves sampled at the step phase: a *progress* curve
//! which scales the straight-line step, and an *offset* curve which is added to it. The progress
//! curves rise from 0 to 1 and the offset curves start and end at 0, so that a step starts on the
//! stable position and finishes exactly on the landing point.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use util::maths::{clamp, lin_map};

use super::LimbSide;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance used when checking that curves return to neutral at the ends of a step.
const NEUTRAL_TOLERANCE: f64 = 1e-3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A key in a response curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f64,
    pub value: f64,

    /// Slope entering the key. Estimated from the neighbouring keys if not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_tangent: Option<f64>,

    /// Slope leaving the key. Estimated from the neighbouring keys if not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_tangent: Option<f64>,
}

/// A curve interpolating a set of keyframes with cubic Hermite segments.
///
/// Outside of the keyed range the curve holds the value of the first or last key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct ResponseCurve {
    keys: Vec<Keyframe>,
}

/// One curve for each axis of the limb's forward-relative frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisCurves {
    /// Lateral axis
    pub x: ResponseCurve,

    /// Vertical axis
    pub y: ResponseCurve,

    /// Forward axis
    pub z: ResponseCurve,
}

/// The full set of curves shaping a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCurves {
    pub progress: AxisCurves,
    pub offset: AxisCurves,
}

/// The curves sampled at one phase of a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSample {
    pub progress: Vector3<f64>,
    pub offset: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Keyframe {
    /// A key with automatic tangents.
    pub fn new(time: f64, value: f64) -> Self {
        Self {
            time,
            value,
            in_tangent: None,
            out_tangent: None,
        }
    }

    /// A key with the same tangent on both sides.
    pub fn with_tangent(time: f64, value: f64, tangent: f64) -> Self {
        Self {
            time,
            value,
            in_tangent: Some(tangent),
            out_tangent: Some(tangent),
        }
    }
}

impl ResponseCurve {
    /// Create a new curve, sorting the keys by time.
    pub fn new(mut keys: Vec<Keyframe>) -> Self {
        keys.sort_by(|a, b| {
            a.time
                .partial_cmp(&b.time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Self { keys }
    }

    /// A curve with a constant value.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![Keyframe::new(0.0, value)])
    }

    /// A straight line from `(0, start)` to `(1, end)`.
    pub fn linear(start: f64, end: f64) -> Self {
        Self::new(vec![Keyframe::new(0.0, start), Keyframe::new(1.0, end)])
    }

    /// The curve's keys, ordered by time.
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// Sample the curve at the given time.
    ///
    /// An empty curve always evaluates to zero.
    pub fn evaluate(&self, time: f64) -> f64 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return 0.0,
        };

        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        // Find the segment containing the time, there must be one as the time is strictly inside
        // the keyed range.
        let i = self
            .keys
            .windows(2)
            .position(|w| time >= w[0].time && time < w[1].time)
            .unwrap_or(self.keys.len() - 2);

        let k0 = &self.keys[i];
        let k1 = &self.keys[i + 1];
        let dt = k1.time - k0.time;

        if dt <= 0.0 {
            return k1.value;
        }

        let s = lin_map((k0.time, k1.time), (0.0, 1.0), time);
        let m0 = self.out_tangent(i) * dt;
        let m1 = self.in_tangent(i + 1) * dt;

        let s2 = s * s;
        let s3 = s2 * s;

        (2.0 * s3 - 3.0 * s2 + 1.0) * k0.value
            + (s3 - 2.0 * s2 + s) * m0
            + (-2.0 * s3 + 3.0 * s2) * k1.value
            + (s3 - s2) * m1
    }

    fn out_tangent(&self, i: usize) -> f64 {
        self.keys[i]
            .out_tangent
            .unwrap_or_else(|| self.auto_tangent(i))
    }

    fn in_tangent(&self, i: usize) -> f64 {
        self.keys[i]
            .in_tangent
            .unwrap_or_else(|| self.auto_tangent(i))
    }

    /// Finite difference slope through the neighbouring keys.
    fn auto_tangent(&self, i: usize) -> f64 {
        let prev = &self.keys[i.saturating_sub(1)];
        let next = &self.keys[(i + 1).min(self.keys.len() - 1)];
        let dt = next.time - prev.time;

        if dt > 0.0 {
            (next.value - prev.value) / dt
        } else {
            0.0
        }
    }
}

impl From<Vec<Keyframe>> for ResponseCurve {
    fn from(keys: Vec<Keyframe>) -> Self {
        Self::new(keys)
    }
}

impl From<ResponseCurve> for Vec<Keyframe> {
    fn from(curve: ResponseCurve) -> Self {
        curve.keys
    }
}

impl AxisCurves {
    /// Sample all three axes.
    pub fn evaluate(&self, time: f64) -> Vector3<f64> {
        Vector3::new(
            self.x.evaluate(time),
            self.y.evaluate(time),
            self.z.evaluate(time),
        )
    }
}

impl StepCurves {
    /// Sample the curves at the given step phase for a limb on the given side.
    ///
    /// The lateral channel of both sets is mirrored for right limbs.
    pub fn sample(&self, time: f64, side: LimbSide) -> CurveSample {
        let time = clamp(&time, &0.0, &1.0);
        let sign = side.sign();

        let mut progress = self.progress.evaluate(time);
        let mut offset = self.offset.evaluate(time);
        progress.x *= sign;
        offset.x *= sign;

        CurveSample { progress, offset }
    }

    /// List any way in which the curves fail to start on the stable position or finish on the
    /// landing point.
    pub fn neutrality_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        let checks = [
            ("progress", &self.progress, 0.0, 0.0),
            ("progress", &self.progress, 1.0, 1.0),
            ("offset", &self.offset, 0.0, 0.0),
            ("offset", &self.offset, 1.0, 0.0),
        ];

        for (set, curves, time, expected) in checks.iter() {
            let value = curves.evaluate(*time);

            for (axis, v) in ["x", "y", "z"].iter().zip(value.iter()) {
                if (v - expected).abs() > NEUTRAL_TOLERANCE {
                    violations.push(format!(
                        "{} curve {} is {:.3} at t = {}, expected {}",
                        set, axis, v, time, expected
                    ));
                }
            }
        }

        violations
    }
}

impl Default for StepCurves {
    fn default() -> Self {
        Self {
            progress: AxisCurves {
                x: ResponseCurve::linear(0.0, 1.0),
                y: ResponseCurve::linear(0.0, 1.0),
                z: ResponseCurve::new(vec![
                    Keyframe::with_tangent(0.0, 0.0, 0.0),
                    Keyframe::with_tangent(1.0, 1.0, 0.0),
                ]),
            },
            offset: AxisCurves {
                x: ResponseCurve::new(vec![
                    Keyframe::new(0.0, 0.0),
                    Keyframe::new(0.5, 0.05),
                    Keyframe::new(1.0, 0.0),
                ]),
                y: ResponseCurve::new(vec![
                    Keyframe::new(0.0, 0.0),
                    Keyframe::new(0.5, 0.4),
                    Keyframe::new(1.0, 0.0),
                ]),
                z: ResponseCurve::constant(0.0),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_curve_evaluate() {
        let lin = ResponseCurve::linear(0.0, 2.0);
        assert_relative_eq!(lin.evaluate(0.25), 0.5, epsilon = 1e-12);
        assert_relative_eq!(lin.evaluate(-1.0), 0.0);
        assert_relative_eq!(lin.evaluate(3.0), 2.0);

        // Flat tangents give a smoothstep
        let smooth = ResponseCurve::new(vec![
            Keyframe::with_tangent(0.0, 0.0, 0.0),
            Keyframe::with_tangent(1.0, 1.0, 0.0),
        ]);
        assert_relative_eq!(smooth.evaluate(0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(smooth.evaluate(0.25), 0.15625, epsilon = 1e-12);

        // Keys pass through their values
        let bump = ResponseCurve::new(vec![
            Keyframe::new(1.0, 0.0),
            Keyframe::new(0.0, 0.0),
            Keyframe::new(0.5, 0.4),
        ]);
        assert_relative_eq!(bump.evaluate(0.5), 0.4, epsilon = 1e-12);
        assert!(bump.evaluate(0.25) > 0.0);

        assert_eq!(ResponseCurve::new(vec![]).evaluate(0.3), 0.0);
        assert_eq!(ResponseCurve::constant(0.7).evaluate(0.3), 0.7);
    }

    #[test]
    fn test_default_curves_neutral() {
        assert!(StepCurves::default().neutrality_violations().is_empty());

        let mut curves = StepCurves::default();
        curves.offset.y = ResponseCurve::linear(0.0, 0.2);
        let violations = curves.neutrality_violations();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("offset curve y"));
    }

    #[test]
    fn test_sample_mirrors_lateral_channel() {
        let curves = StepCurves::default();

        let left = curves.sample(0.5, LimbSide::Left);
        let right = curves.sample(0.5, LimbSide::Right);

        assert_relative_eq!(left.offset.x, -right.offset.x);
        assert_relative_eq!(left.progress.x, -right.progress.x);
        assert_relative_eq!(left.offset.y, right.offset.y);
        assert_relative_eq!(left.progress.z, right.progress.z);
    }

    #[test]
    fn test_curves_from_toml() {
        let curves: StepCurves = util::params::from_str(
            r#"
            [[progress.x]]
            time = 0.0
            value = 0.0
            [[progress.x]]
            time = 1.0
            value = 1.0

            [[progress.y]]
            time = 0.0
            value = 0.0
            [[progress.y]]
            time = 1.0
            value = 1.0

            [[progress.z]]
            time = 1.0
            value = 1.0
            in_tangent = 0.0
            [[progress.z]]
            time = 0.0
            value = 0.0
            out_tangent = 0.0

            [[offset.x]]
            time = 0.0
            value = 0.0

            [[offset.y]]
            time = 0.0
            value = 0.0

            [[offset.z]]
            time = 0.0
            value = 0.0
            "#,
        )
        .unwrap();

        assert!(curves.neutrality_violations().is_empty());
        assert_eq!(curves.progress.z.keys()[0].time, 0.0);
        assert_relative_eq!(curves.progress.z.evaluate(0.5), 0.5, epsilon = 1e-12);
    }
}

//! Gait cycle phase management
//!
//! The gait is driven by a single phase `t` in `[0, 2 + stagger)`, advanced by one per step. Limbs
//! are grouped in blocks of four (front left, front right, hind left, hind right). Within a block
//! the phases are
//!
//! | Limb | Phase                                   |
//! |------|-----------------------------------------|
//! | 0    | `t`, or `t - 2` once the first pass ends |
//! | 1    | `t - 1`                                 |
//! | 2    | `t - stagger`                           |
//! | 3    | `t - stagger - 1`                       |
//!
//! each clamped to `[0, 1]`. Swings start in the order 0, 2, 1, 3: the hind limb follows the front
//! limb on the same side after `stagger`, and the right side follows the left after a whole step.
//! Each swing overlaps the next one in that order, so the pair in the air alternates between the
//! two limbs of one side and a diagonal pair.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State of the steady walking cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaitCycle {
    /// Current phase
    phase: f64,

    /// Lag between the front and hind limb on each side
    stagger: f64,

    /// True once the leading limbs have finished their pass in this cycle
    cycled: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GaitCycle {
    /// Start a new cycle with the given lag between front and hind limbs.
    pub fn new(stagger: f64) -> Self {
        Self {
            phase: 0.0,
            stagger,
            cycled: false,
        }
    }

    /// The current cycle phase.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// The phase of the cycle at which the lagging limbs finish and the cycle repeats.
    pub fn period(&self) -> f64 {
        2.0 + self.stagger
    }

    /// True if the limb leads its block and holds its stable position between passes.
    pub fn is_leading(limb_index: usize) -> bool {
        limb_index % 4 == 0
    }

    /// The step phase of a limb, in `[0, 1]`.
    pub fn limb_phase(&self, limb_index: usize) -> f64 {
        let t = if Self::is_leading(limb_index) {
            if self.phase < 2.0 {
                if self.cycled {
                    0.0
                } else {
                    self.phase
                }
            } else {
                self.phase - 2.0
            }
        } else {
            let lag = if (limb_index / 2) % 2 == 1 {
                self.stagger
            } else {
                0.0
            };
            let half = (limb_index % 2) as f64;

            self.phase - lag - half
        };

        clamp(&t, &0.0, &1.0)
    }

    /// Phases of all limbs.
    pub fn limb_phases(&self, num_limbs: usize) -> Vec<f64> {
        (0..num_limbs).map(|i| self.limb_phase(i)).collect()
    }

    /// Find the limbs which have completed their pass at the current phase and should be marked
    /// stable, wrapping the cycle if it has ended.
    pub fn stabilise(&mut self, num_limbs: usize) -> Vec<usize> {
        let mut stabilised = Vec::new();

        if self.phase > 1.0 && !self.cycled {
            stabilised.extend((0..num_limbs).filter(|&i| Self::is_leading(i)));
            self.cycled = true;
        }

        if self.phase >= self.period() {
            self.phase = self.stagger;
            stabilised.extend((0..num_limbs).filter(|&i| !Self::is_leading(i)));
            self.cycled = false;
        }

        stabilised
    }

    /// Advance the phase by the given number of steps.
    pub fn advance(&mut self, steps: f64) {
        self.phase += steps;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    const STAGGER: f64 = 0.425;

    /// Run the cycle the way the controller does, calling `f` with the phases each tick.
    fn run<F: FnMut(&[f64], &[usize])>(num_limbs: usize, ticks: usize, dt: f64, mut f: F) {
        let mut gait = GaitCycle::new(STAGGER);

        for _ in 0..ticks {
            let phases = gait.limb_phases(num_limbs);
            let stabilised = gait.stabilise(num_limbs);
            f(&phases, &stabilised);
            gait.advance(dt);
        }
    }

    #[test]
    fn test_canonical_phases() {
        let mut gait = GaitCycle::new(STAGGER);
        gait.advance(0.5);

        assert_relative_eq!(gait.limb_phase(0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(gait.limb_phase(1), 0.0, epsilon = 1e-12);
        assert_relative_eq!(gait.limb_phase(2), 0.5 - STAGGER, epsilon = 1e-12);
        assert_relative_eq!(gait.limb_phase(3), 0.0, epsilon = 1e-12);

        gait.advance(1.0);
        assert_relative_eq!(gait.limb_phase(0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(gait.limb_phase(1), 0.5, epsilon = 1e-12);
        assert_relative_eq!(gait.limb_phase(2), 1.0, epsilon = 1e-12);
        assert_relative_eq!(gait.limb_phase(3), 0.5 - STAGGER, epsilon = 1e-12);
    }

    #[test]
    fn test_leading_limb_holds_after_first_pass() {
        let mut gait = GaitCycle::new(STAGGER);
        gait.advance(1.1);

        assert_eq!(gait.stabilise(4), vec![0]);
        assert_eq!(gait.limb_phase(0), 0.0);

        gait.advance(1.0);
        assert_relative_eq!(gait.limb_phase(0), 0.1, epsilon = 1e-12);

        // Wrapping resets the phase to the stagger and marks the other limbs
        gait.advance(0.5);
        assert_eq!(gait.stabilise(4), vec![1, 2, 3]);
        assert_relative_eq!(gait.phase(), STAGGER);
        assert_relative_eq!(gait.limb_phase(0), STAGGER);
    }

    #[test]
    fn test_at_most_two_limbs_swing() {
        for &num_limbs in [4, 8].iter() {
            run(num_limbs, 2000, 0.03, |phases, _| {
                let swinging = phases.iter().filter(|&&p| p > 0.0 && p < 1.0).count();
                assert!(swinging <= 2 * num_limbs / 4, "{:?}", phases);
            });
        }
    }

    #[test]
    fn test_swing_order() {
        let dt = 0.005;
        let mut gait = GaitCycle::new(STAGGER);
        let mut starts: [Option<f64>; 4] = [None; 4];

        while gait.phase() < gait.period() - dt {
            for (i, p) in gait.limb_phases(4).into_iter().enumerate() {
                if p > 0.0 && starts[i].is_none() {
                    starts[i] = Some(gait.phase());
                }
            }
            gait.advance(dt);
        }

        let starts: Vec<f64> = starts.iter().map(|s| s.unwrap()).collect();

        // Front left, hind left, front right, hind right
        assert!(starts[0] < starts[2] && starts[2] < starts[1] && starts[1] < starts[3]);
        assert_relative_eq!(starts[2] - starts[0], STAGGER, epsilon = 2.0 * dt);
        assert_relative_eq!(starts[1] - starts[0], 1.0, epsilon = 2.0 * dt);
        assert_relative_eq!(starts[3] - starts[1], STAGGER, epsilon = 2.0 * dt);

        // Limbs swinging together are neighbours in the swing order
        let order = [0, 2, 1, 3];
        let mut same_side = 0;
        run(4, 2000, 0.03, |phases, _| {
            let swinging: Vec<usize> = (0..4)
                .filter(|&k| phases[order[k]] > 0.0 && phases[order[k]] < 1.0)
                .collect();
            if let [a, b] = swinging[..] {
                assert!(b == a + 1 || (a == 0 && b == 3), "{:?}", phases);
                if order[a] % 2 == order[b] % 2 {
                    same_side += 1;
                }
            }
        });
        assert!(same_side > 0);
    }

    #[test]
    fn test_each_limb_stabilised_once_per_cycle() {
        let mut counts = [0usize; 4];
        let mut wraps = 0;

        run(4, 1000, 0.03, |_, stabilised| {
            if stabilised.contains(&1) {
                wraps += 1;
            }
            for &i in stabilised {
                counts[i] += 1;
            }
        });

        assert!(wraps > 5);
        for &c in counts.iter().skip(1) {
            assert_eq!(c, wraps);
        }
        // The leading limb is stabilised once per cycle, including the cycle in progress
        assert!(counts[0] == wraps || counts[0] == wraps + 1);
    }

    #[test]
    fn test_limbs_planted_when_stabilised() {
        // Every limb being marked stable has finished its pass
        let mut gait = GaitCycle::new(STAGGER);

        for _ in 0..1000 {
            let phases = gait.limb_phases(4);
            for i in gait.stabilise(4) {
                assert!(phases[i] > 1.0 - 1e-9, "limb {} at {}", i, phases[i]);
            }
            gait.advance(0.03);
        }
    }
}

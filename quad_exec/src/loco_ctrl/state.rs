//! Implementations for the LocoCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::{eqpt::probe::GroundProbe, tc::loco_ctrl::MoveCmd};
use log::{debug, info, trace, warn};
use nalgebra::Vector3;
use serde::Serialize;

// Internal
use super::{
    animate_step, find_landing, rest_pose, BodyPose, BodyPoseReconstructor, GaitCycle, Limb,
    LimbSide, LimbSpec, LocoCtrlError, Params, Recenter, RecenterStatus, StepKind,
};
use crate::CYCLE_PERIOD_S;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    maths::{clamp, planar_normalize},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Upper bound on the number of immediate mode transitions in one cycle.
const MAX_TRANSITIONS_PER_CYCLE: usize = 4;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Locomotion control module state
pub struct LocoCtrl {
    pub(crate) params: Params,

    probe: Box<dyn GroundProbe>,

    limbs: Vec<Limb>,

    body: BodyPose,
    body_recon: BodyPoseReconstructor,

    mode: LocoMode,

    /// The in-flight recenter, if any
    recenter: Option<Recenter>,

    /// Incremented each time a new movement is started
    move_generation: u64,

    /// Heading movement has been requested along
    target_heading: Vector3<f64>,

    /// Heading the feet are currently laid out for
    current_heading: Vector3<f64>,

    movement_requested: bool,
    aligned: bool,

    time_s: f64,

    pub(crate) report: StatusReport,
    archiver: Option<Archiver>,
}

/// Data required to initialise LocoCtrl.
pub struct InitData {
    pub params: Params,

    /// Pose of the core reference point. Must be set before the controller can attach to the
    /// limbs.
    pub core: Option<BodyPose>,

    /// Limbs to control, fore limbs first, alternating left and right.
    pub limbs: Vec<LimbSpec>,

    /// Ground used for foot placement
    pub probe: Box<dyn GroundProbe>,
}

/// Input data to Locomotion Control.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// The movement command to be executed, or `None` if there is no new command on this cycle.
    pub cmd: Option<MoveCmd>,
}

/// Output of LocoCtrl for the cycle.
#[derive(Debug, Clone, Serialize)]
pub struct OutputData {
    /// Reconstructed pose of the body
    pub body: BodyPose,

    /// Target position of each foot
    pub limb_positions_m: Vec<Vector3<f64>>,
}

/// Status report for LocoCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub mode: LocoModeId,

    /// Gait phase while offsetting or walking
    pub phase: f64,

    /// True if the feet are in the rest pose for the target heading
    pub aligned: bool,

    /// True if a recenter is in flight
    pub turning: bool,

    /// True if movement is requested
    pub moving: bool,

    /// Number of swings this cycle which found no landing point
    pub missed_steps: usize,

    /// Number of limbs marked stable this cycle
    pub stabilised: usize,
}

/// Flat record written to the archive each cycle.
#[derive(Serialize)]
struct ArchRecord {
    time_s: f64,
    mode: LocoModeId,
    phase: f64,
    aligned: bool,
    turning: bool,
    moving: bool,
    missed_steps: usize,
    stabilised: usize,
    body_x_m: f64,
    body_y_m: f64,
    body_z_m: f64,
    body_yaw_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Gait state of the controller.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LocoMode {
    /// Not moving, feet stay where they are
    Idle,

    /// Turning to face the target heading. `planned` is false until the recenter for this
    /// movement has been started.
    Centering { planned: bool },

    /// Moving the odd limbs half a stride ahead before walking
    Offsetting { time: f64 },

    /// Steady walking
    Walking(GaitCycle),
}

/// Identifier of a [`LocoMode`] for reporting.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum LocoModeId {
    Idle,
    Centering,
    Offsetting,
    Walking,
}

/// Outcome of one evaluation of the current mode.
enum Transition {
    /// Remain in the current mode
    Stay,

    /// Enter the mode and evaluate it in this cycle
    Now(LocoMode),

    /// Enter the mode, evaluating it from the next cycle
    Next(LocoMode),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for LocoCtrl {
    type InitData = InitData;
    type InitError = LocoCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = LocoCtrlError;

    /// Initialise the LocoCtrl module.
    ///
    /// The controller attaches to the limbs, seeds their stable positions with the rest pose for
    /// the core's heading and starts settling the feet into it.
    fn init(init_data: Self::InitData, session: Option<&Session>) -> Result<Self, Self::InitError> {
        let InitData {
            params,
            core,
            limbs: specs,
            probe,
        } = init_data;

        params.validate()?;
        validate_limbs(&specs)?;
        let core = core.ok_or(LocoCtrlError::CoreNotSet)?;

        let mut limbs = specs
            .into_iter()
            .enumerate()
            .map(|(i, s)| Limb::new(i, s, &core))
            .collect::<Result<Vec<_>, _>>()?;

        for v in params.curves.neutrality_violations() {
            warn!("Step curve is not neutral: {}", v);
        }

        let heading = planar_normalize(&core.forward(), params.move_epsilon)
            .unwrap_or_else(Vector3::z);

        let stable_m = rest_pose(&limbs, &core.position_m, &heading, probe.as_ref(), &params);
        for (limb, s) in limbs.iter_mut().zip(stable_m) {
            limb.set_stable_position_m(s);
        }

        let body_recon = BodyPoseReconstructor::new(&core, &limbs, params.body_smoothing_rate_hz);

        // Settle the feet into the rest pose
        let recenter = Recenter::plan(
            &core.forward(),
            &heading,
            &limbs,
            &core.position_m,
            probe.as_ref(),
            &params,
            0,
        );

        let archiver = match session {
            Some(s) => Some(Archiver::from_path(s, "loco_ctrl.csv")?),
            None => None,
        };

        info!("LocoCtrl initialised with {} limbs", limbs.len());

        Ok(Self {
            params,
            probe,
            limbs,
            body: core,
            body_recon,
            mode: LocoMode::Idle,
            recenter: Some(recenter),
            move_generation: 0,
            target_heading: heading,
            current_heading: heading,
            movement_requested: false,
            aligned: false,
            time_s: 0.0,
            report: StatusReport::default(),
            archiver,
        })
    }

    /// Perform cyclic processing of Locomotion Control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let dt_s = CYCLE_PERIOD_S;

        // Clear the status report
        self.report = StatusReport::default();

        match input_data.cmd {
            Some(MoveCmd::Move { direction }) => self.request_move(&direction),
            Some(MoveCmd::Stop) => self.stop(),
            None => (),
        }

        self.step_gait(dt_s);
        self.step_recenter(dt_s);

        self.time_s += dt_s;

        self.report.mode = self.mode.id();
        self.report.phase = self.mode.phase();
        self.report.aligned = self.aligned;
        self.report.turning = self.recenter.is_some();
        self.report.moving = self.movement_requested;

        let output = OutputData {
            body: self.body,
            limb_positions_m: self.limbs.iter().map(|l| l.position_m()).collect(),
        };

        trace!(
            "LocoCtrl output: mode {:?}, body at {:?}",
            self.report.mode,
            output.body.position_m.as_slice()
        );

        Ok((output, self.report))
    }
}

impl Archived for LocoCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let record = ArchRecord {
            time_s: self.time_s,
            mode: self.report.mode,
            phase: self.report.phase,
            aligned: self.report.aligned,
            turning: self.report.turning,
            moving: self.report.moving,
            missed_steps: self.report.missed_steps,
            stabilised: self.report.stabilised,
            body_x_m: self.body.position_m.x,
            body_y_m: self.body.position_m.y,
            body_z_m: self.body.position_m.z,
            body_yaw_rad: self.body.yaw_rad(),
        };

        match self.archiver {
            Some(ref mut a) => a.serialise(record),
            None => Ok(()),
        }
    }
}

impl LocoCtrl {
    /// Request movement along the given direction. The vertical component is ignored.
    ///
    /// A zero direction asks the controller to stop once the feet are back in a rest pose. A
    /// direction the body is already walking along is ignored, any other starts a new movement,
    /// turning to face the direction first.
    pub fn request_move(&mut self, direction: &Vector3<f64>) {
        let direction = match planar_normalize(direction, self.params.move_epsilon) {
            Some(d) => d,
            None => {
                if self.movement_requested {
                    debug!("Zero move direction, settling");
                }
                self.movement_requested = false;
                return;
            }
        };

        if !self.is_forward_facing(&direction) || !self.movement_requested {
            self.target_heading = direction;
            self.stop();
            self.start_move();
        }
    }

    /// Stop immediately, leaving the feet where they are.
    ///
    /// An in-flight recenter continues until it reaches its next waypoint.
    pub fn stop(&mut self) {
        if self.mode != LocoMode::Idle {
            debug!("LocoCtrl stopped in {:?}", self.mode.id());
        }

        self.mode = LocoMode::Idle;
        self.movement_requested = false;
    }

    /// Swing a limb to the given phase of a step from its stable position.
    ///
    /// Returns false, leaving the limb where it is, if no landing point is found.
    pub fn swing_limb(&mut self, index: usize, time: f64, kind: StepKind) -> bool {
        let forward = self.body.forward();

        let limb = match self.limbs.get(index) {
            Some(l) => l,
            None => return false,
        };

        let reference_m = limb.stable_position_m();
        let landing_m =
            match find_landing(&reference_m, &forward, kind, self.probe.as_ref(), &self.params) {
                Some(p) => p,
                None => {
                    trace!("No landing point for limb {}", index);
                    return false;
                }
            };

        let sample = self.params.curves.sample(time, limb.side());
        let step_m = animate_step(&(landing_m - reference_m), &forward, &sample);

        self.limbs[index].set_position_m(reference_m + step_m);
        self.body_recon
            .update(&mut self.body, &mut self.limbs, CYCLE_PERIOD_S);

        true
    }

    pub fn mode(&self) -> LocoMode {
        self.mode
    }

    pub fn body(&self) -> &BodyPose {
        &self.body
    }

    pub fn limbs(&self) -> &[Limb] {
        &self.limbs
    }

    pub fn recenter(&self) -> Option<&Recenter> {
        self.recenter.as_ref()
    }

    pub fn target_heading(&self) -> Vector3<f64> {
        self.target_heading
    }

    pub fn current_heading(&self) -> Vector3<f64> {
        self.current_heading
    }

    pub fn is_moving(&self) -> bool {
        self.movement_requested
    }

    pub fn is_aligned(&self) -> bool {
        self.aligned
    }

    pub fn is_turning(&self) -> bool {
        self.recenter.is_some()
    }

    fn start_move(&mut self) {
        self.move_generation += 1;
        self.movement_requested = true;
        self.mode = LocoMode::Centering { planned: false };

        debug!(
            "Starting movement {} towards {:?}",
            self.move_generation,
            self.target_heading.as_slice()
        );
    }

    /// True if `direction` is close to the heading the feet are laid out for.
    fn is_forward_facing(&self, direction: &Vector3<f64>) -> bool {
        match planar_normalize(&self.current_heading, self.params.move_epsilon) {
            Some(h) => (direction - h).norm_squared() < self.params.forward_facing_tolerance,
            None => false,
        }
    }

    /// Advance the gait state by one cycle.
    fn step_gait(&mut self, dt_s: f64) {
        for _ in 0..MAX_TRANSITIONS_PER_CYCLE {
            match self.eval_mode(dt_s) {
                Transition::Stay => return,
                Transition::Next(m) => {
                    self.set_mode(m);
                    return;
                }
                Transition::Now(m) => self.set_mode(m),
            }
        }
    }

    fn set_mode(&mut self, mode: LocoMode) {
        if mode.id() != self.mode.id() {
            debug!("LocoCtrl mode {:?} -> {:?}", self.mode.id(), mode.id());
        }
        self.mode = mode;
    }

    fn eval_mode(&mut self, dt_s: f64) -> Transition {
        match self.mode {
            LocoMode::Idle => Transition::Stay,
            LocoMode::Centering { planned: false } => {
                // Wait for the previous recenter to finish before re-seeding
                if self.recenter.is_some() {
                    return Transition::Stay;
                }

                self.aligned = false;

                let stable_m = rest_pose(
                    &self.limbs,
                    &self.body.position_m,
                    &self.target_heading,
                    self.probe.as_ref(),
                    &self.params,
                );
                for (limb, s) in self.limbs.iter_mut().zip(stable_m) {
                    limb.set_stable_position_m(s);
                }

                self.recenter = Some(Recenter::plan(
                    &self.body.forward(),
                    &self.target_heading,
                    &self.limbs,
                    &self.body.position_m,
                    self.probe.as_ref(),
                    &self.params,
                    self.move_generation,
                ));

                Transition::Next(LocoMode::Centering { planned: true })
            }
            LocoMode::Centering { planned: true } => {
                if self.recenter.is_some() {
                    Transition::Stay
                } else if self.aligned && self.movement_requested {
                    self.body_recon
                        .update(&mut self.body, &mut self.limbs, dt_s);
                    Transition::Now(LocoMode::Offsetting { time: 0.0 })
                } else {
                    Transition::Next(LocoMode::Idle)
                }
            }
            LocoMode::Offsetting { time } => {
                if time >= 1.0 {
                    for limb in self.limbs.iter_mut().filter(|l| l.id() % 2 == 1) {
                        limb.mark_stable();
                        self.report.stabilised += 1;
                    }

                    if self.movement_requested {
                        Transition::Now(LocoMode::Walking(GaitCycle::new(self.params.gait_stagger)))
                    } else {
                        Transition::Now(LocoMode::Centering { planned: false })
                    }
                } else {
                    let time = time + dt_s * self.params.steps_per_second;

                    for i in (1..self.limbs.len()).step_by(2) {
                        if !self.swing_limb(i, clamp(&time, &0.0, &1.0), StepKind::Offset) {
                            self.report.missed_steps += 1;
                        }
                    }

                    Transition::Next(LocoMode::Offsetting { time })
                }
            }
            LocoMode::Walking(mut gait) => {
                if !self.movement_requested {
                    return Transition::Now(LocoMode::Centering { planned: false });
                }

                self.aligned = false;

                for (i, phase) in gait.limb_phases(self.limbs.len()).into_iter().enumerate() {
                    if !self.swing_limb(i, phase, StepKind::Full) {
                        self.report.missed_steps += 1;
                    }
                }

                for i in gait.stabilise(self.limbs.len()) {
                    self.limbs[i].mark_stable();
                    self.report.stabilised += 1;
                    trace!("Limb {} stable at {:?}", i, self.limbs[i].stable_position_m().as_slice());
                }

                gait.advance(dt_s * self.params.steps_per_second);

                Transition::Next(LocoMode::Walking(gait))
            }
        }
    }

    /// Advance the in-flight recenter by one cycle.
    fn step_recenter(&mut self, dt_s: f64) {
        let mut recenter = match self.recenter.take() {
            Some(r) => r,
            None => return,
        };

        let cancelled =
            !self.movement_requested || recenter.generation() != self.move_generation;

        let status = recenter.step(&mut self.limbs, cancelled, &self.params, dt_s);
        self.body_recon
            .update(&mut self.body, &mut self.limbs, dt_s);

        match status {
            RecenterStatus::Moving => (),
            RecenterStatus::WaypointReached(h) => self.current_heading = h,
            RecenterStatus::Aligned(h) => {
                debug!("Aligned with {:?}", h.as_slice());
                self.current_heading = h;
                self.aligned = true;
            }
            RecenterStatus::Aborted(h) => {
                debug!("Recenter aborted at {:?}", h.as_slice());
                self.current_heading = h;
            }
        }

        if !status.is_done() {
            self.recenter = Some(recenter);
        }
    }
}

impl LocoMode {
    pub fn id(&self) -> LocoModeId {
        match self {
            LocoMode::Idle => LocoModeId::Idle,
            LocoMode::Centering { .. } => LocoModeId::Centering,
            LocoMode::Offsetting { .. } => LocoModeId::Offsetting,
            LocoMode::Walking(_) => LocoModeId::Walking,
        }
    }

    /// Phase of the offsetting or walking gait, zero otherwise.
    pub fn phase(&self) -> f64 {
        match self {
            LocoMode::Offsetting { time } => *time,
            LocoMode::Walking(gait) => gait.phase(),
            _ => 0.0,
        }
    }
}

impl Default for LocoModeId {
    fn default() -> Self {
        LocoModeId::Idle
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Check the limbs form a balanced rig.
fn validate_limbs(specs: &[LimbSpec]) -> Result<(), LocoCtrlError> {
    if specs.is_empty() {
        return Err(LocoCtrlError::NoLimbs);
    }

    if specs.len() % 2 != 0 {
        return Err(LocoCtrlError::OddLimbCount(specs.len()));
    }

    let left = specs.iter().filter(|s| s.side == LimbSide::Left).count();
    let right = specs.len() - left;

    if left != right {
        return Err(LocoCtrlError::UnbalancedSides { left, right });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

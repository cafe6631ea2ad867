//! # Gait Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use comms_if::tc::loco_ctrl::MoveCmd;
use nalgebra::Vector3;
use quad_lib::{
    loco_ctrl::{InitData, InputData, LocoCtrl, LocoModeId, Params},
    sim::{quadruped_limb_specs, PerlinGround, RigParams},
};
use util::module::State;

fn gait_benchmark(c: &mut Criterion) {
    // ---- Build the controller on rough terrain ----

    let rig = RigParams::default();

    let mut loco_ctrl = LocoCtrl::init(
        InitData {
            params: Params::default(),
            core: Some(rig.core_pose()),
            limbs: quadruped_limb_specs(&rig),
            probe: Box::new(PerlinGround::new(42, 0.15, 6.0, 0.0)),
        },
        None,
    )
    .unwrap();

    // Get into the steady walking cycle
    loco_ctrl.request_move(&Vector3::z());
    while loco_ctrl.mode().id() != LocoModeId::Walking {
        loco_ctrl.proc(&InputData::default()).unwrap();
    }

    c.bench_function("walking tick", |b| {
        b.iter(|| loco_ctrl.proc(&InputData::default()).unwrap())
    });

    // ---- Turning on the spot ----

    let mut turning_ctrl = LocoCtrl::init(
        InitData {
            params: Params::default(),
            core: Some(rig.core_pose()),
            limbs: quadruped_limb_specs(&rig),
            probe: Box::new(PerlinGround::new(42, 0.15, 6.0, 0.0)),
        },
        None,
    )
    .unwrap();

    // Alternate between opposite headings so that a recenter is always in flight
    let mut toggle = false;
    c.bench_function("recenter tick", |b| {
        b.iter(|| {
            let cmd = if turning_ctrl.is_turning() {
                None
            } else {
                toggle = !toggle;
                Some(MoveCmd::Move {
                    direction: if toggle { Vector3::x() } else { -Vector3::x() },
                })
            };
            turning_ctrl.proc(&InputData { cmd }).unwrap()
        })
    });
}

criterion_group!(benches, gait_benchmark);
criterion_main!(benches);

use crate::{
    cfg::{AnchorPolicy, FusionOpts},
    fusion::{DeadReckoning, SensorFusionKalmanFilter},
    position::Position,
    prelude::Vector3,
    tests::{init_logger, truth_position},
};

/// Steady state gain of a scalar random walk observed directly
fn steady_state_gain(q: f64, r: f64) -> f64 {
    let p_pred = q / 2.0 + (q * q / 4.0 + q * r).sqrt();
    p_pred / (p_pred + r)
}

/// ECEF position offset from the truth by this ENU vector (in meters)
fn offset_position(enu: Vector3<f64>) -> Position {
    let truth = truth_position();
    Position::from_ecef(truth.ecef() + truth.enu_rotation().transpose() * enu)
}

#[test]
fn first_fix_latches_anchor() {
    init_logger();

    let opts = FusionOpts::default();
    let mut kf = SensorFusionKalmanFilter::new(&opts);

    let mut dr = DeadReckoning::new(0);
    dr.position_m = Vector3::new(12.0, -3.0, 1.0);
    dr.velocity_m_s = Vector3::new(0.5, 0.0, 0.0);

    let fix = truth_position();
    let fused = kf.update(&fix, &Vector3::zeros(), None, &mut dr).unwrap();

    assert_eq!(kf.anchor(), Some(&fix));
    assert_eq!(fused.position_enu_m, Vector3::zeros());
    assert_eq!(dr.velocity_m_s, Vector3::zeros());

    // filter did not run
    assert_eq!(kf.gain(), nalgebra::Vector6::zeros());
}

#[test]
fn drifting_dead_reckoning() {
    init_logger();

    let opts = FusionOpts::default();
    let mut kf = SensorFusionKalmanFilter::new(&opts);
    let mut dr = DeadReckoning::new(0);

    let fix = truth_position();
    let velocity = Vector3::zeros();

    kf.update(&fix, &velocity, None, &mut dr).unwrap();

    for _ in 0..50 {
        // dead reckoning drifts by 1 m per epoch
        dr.position_m += Vector3::new(1.0, 0.0, 0.0);
        dr.velocity_m_s += Vector3::new(0.1, 0.0, 0.0);

        let fused = kf.update(&fix, &velocity, None, &mut dr).unwrap();

        // pulled towards the gnss fix, written back
        assert!(fused.position_enu_m.norm() < 1.0E-2);
        assert_eq!(fused.position_enu_m, dr.position_m);
        assert_eq!(fused.velocity_enu_m_s, dr.velocity_m_s);
    }

    let gain = kf.gain();

    let expected = steady_state_gain(
        opts.position_process_noise_m2,
        opts.measurement_noise,
    );
    for i in 0..3 {
        assert!((gain[i] - expected).abs() < 1.0E-6, "K[{}]={}", i, gain[i]);
    }

    let expected = steady_state_gain(
        opts.velocity_process_noise_m2_s2,
        opts.measurement_noise,
    );
    for i in 3..6 {
        assert!((gain[i] - expected).abs() < 1.0E-6, "K[{}]={}", i, gain[i]);
    }

    // q=100, r=0.1
    assert!((gain[0] - 0.999002).abs() < 1.0E-5);

    let state = kf.state();
    assert!(state.p[(0, 0)] > 0.0);
    assert_eq!(state.x[0], dr.position_m[0]);
}

#[test]
fn gnss_offset_measurement() {
    let opts = FusionOpts::default();
    let mut kf = SensorFusionKalmanFilter::new(&opts);
    let mut dr = DeadReckoning::new(0);

    kf.update(&truth_position(), &Vector3::zeros(), None, &mut dr)
        .unwrap();

    let fix = offset_position(Vector3::new(10.0, -5.0, 2.0));
    let velocity = Vector3::new(1.0, 0.0, 0.0);

    let mut fused = Default::default();
    for _ in 0..20 {
        fused = kf.update(&fix, &velocity, None, &mut dr).unwrap();
    }

    let err = (fused.position_enu_m - Vector3::new(10.0, -5.0, 2.0)).norm();
    assert!(err < 1.0E-3, "error={}", err);
    assert!((fused.velocity_enu_m_s[0] - 1.0).abs() < 1.0E-3);
}

#[test]
fn reference_anchor() {
    let opts = FusionOpts {
        anchor: AnchorPolicy::ReferencePosition,
        ..Default::default()
    };

    let mut kf = SensorFusionKalmanFilter::new(&opts);
    let mut dr = DeadReckoning::new(0);

    // reference lies 100 m north of the receiver
    let reference = offset_position(Vector3::new(0.0, 100.0, 0.0));

    kf.update(&truth_position(), &Vector3::zeros(), Some(&reference), &mut dr)
        .unwrap();

    assert_eq!(kf.anchor(), Some(&reference));

    let fused = kf
        .update(&truth_position(), &Vector3::zeros(), Some(&reference), &mut dr)
        .unwrap();

    assert!(fused.position_enu_m[1] < -99.0, "north={}", fused.position_enu_m[1]);
}

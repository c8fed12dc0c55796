use rstest::*;

use crate::{
    bias::Atmosphere,
    cfg::Config,
    context::PositioningContext,
    error::Error,
    fusion::ImuSample,
    position::ReferenceSource,
    prelude::Vector3,
    tests::{
        all_prns, init_logger, raw_batch, test_klobuchar, test_time, truth_error_m,
        truth_velocity_ecef, SetBuilder, StaticEphemeris, TRUTH_ALT_M,
    },
};

#[fixture]
fn ephemeris() -> StaticEphemeris {
    StaticEphemeris::default()
}

#[fixture]
fn cfg() -> Config {
    Config::default().without_atmosphere()
}

#[test]
fn send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PositioningContext>();
}

#[rstest]
fn raw_measurements(cfg: Config, ephemeris: StaticEphemeris) {
    init_logger();

    let ctx = PositioningContext::new(cfg);
    assert!(!ctx.latest_solution().is_valid());

    let batch = raw_batch(&ephemeris, &all_prns(), test_time());
    let solution = ctx.process_epoch(&batch, &ephemeris).unwrap();

    assert!(solution.is_valid());
    assert_eq!(solution.used.len(), 8);
    assert!(!solution.week_rollover_corrected);

    // 1 ns quantization
    assert!(truth_error_m(&solution.position_ecef_m) < 5.0);

    let velocity_err = (solution.velocity_ecef_m_s - truth_velocity_ecef()).norm();
    assert!(velocity_err < 1.0E-2, "velocity error={}", velocity_err);

    assert!((solution.altitude_m - TRUTH_ALT_M).abs() < 5.0);
    // residuals of untracked satellites are NaN
    let latest = ctx.latest_solution();
    assert_eq!(latest.position_ecef_m, solution.position_ecef_m);
    assert_eq!(latest.used, solution.used);
    assert_eq!(ctx.converged_epochs(), 1);

    let epoch = solution.epoch.unwrap();
    assert_eq!(epoch, test_time().to_epoch());
}

#[rstest]
fn failed_epoch_preserves_state(cfg: Config, ephemeris: StaticEphemeris) {
    init_logger();

    let ctx = PositioningContext::new(cfg);

    let set = SetBuilder::new(&ephemeris, test_time()).build();
    ctx.process_pseudoranges(set, &ephemeris).unwrap();

    let state = ctx.receiver_state();
    let fused = ctx.fused_state();

    let set = SetBuilder::new(&ephemeris, test_time().shifted(1.0))
        .with_prns(&[2, 5, 9])
        .build();

    assert_eq!(
        ctx.process_pseudoranges(set, &ephemeris).err(),
        Some(Error::InsufficientSatellites(3))
    );

    assert_eq!(ctx.receiver_state(), state);
    assert_eq!(ctx.fused_state(), fused);
    assert_eq!(ctx.converged_epochs(), 1);

    let latest = ctx.latest_solution();
    assert!(!latest.is_valid());
    assert!(latest.pseudorange_residuals_m.iter().all(|r| r.is_nan()));
    assert_eq!(latest.time, Some(test_time().shifted(1.0)));

    // next epoch is processed independently
    let set = SetBuilder::new(&ephemeris, test_time().shifted(2.0)).build();
    let solution = ctx.process_pseudoranges(set, &ephemeris).unwrap();
    assert!(truth_error_m(&solution.position_ecef_m) < 1.0E-3);
    assert_eq!(ctx.converged_epochs(), 2);
}

#[rstest]
fn invalid_receiver_clock(cfg: Config, ephemeris: StaticEphemeris) {
    let ctx = PositioningContext::new(cfg);

    let mut batch = raw_batch(&ephemeris, &all_prns(), test_time());
    batch.clock.full_bias_nanos = 1;

    assert_eq!(
        ctx.process_epoch(&batch, &ephemeris).err(),
        Some(Error::InvalidReceiverClock)
    );
    assert!(!ctx.latest_solution().is_valid());
}

#[test]
fn operator_commands() {
    let ctx = PositioningContext::new(Config::anti_spoofing_preset());

    assert!(ctx.anti_spoof_enabled());
    ctx.set_anti_spoof_enabled(false);
    assert!(!ctx.anti_spoof_enabled());

    assert!(ctx.reference_position().is_none());

    // 300 m altitude overflows 32 bit fixed point
    ctx.set_reference_position(374_000_000, -1_221_000_000, 3_000_000_000);

    let reference = ctx.reference_position().unwrap();
    assert_eq!(reference.source, ReferenceSource::Operator);

    let (lat, lon, alt) = reference.position.lat_long_alt_deg_deg_m();
    assert!((lat - 37.4).abs() < 1.0E-9);
    assert!((lon + 122.1).abs() < 1.0E-9);
    assert!((alt - 300.0).abs() < 1.0E-6);

    ctx.clear_reference_position();
    assert!(ctx.reference_position().is_none());
}

#[rstest]
fn reference_survey(mut cfg: Config, ephemeris: StaticEphemeris) {
    init_logger();

    cfg.spoofing.reference_survey_epochs = Some(3);
    let ctx = PositioningContext::new(cfg);

    for i in 0..3 {
        assert!(ctx.reference_position().is_none());
        let set = SetBuilder::new(&ephemeris, test_time().shifted(i as f64)).build();
        ctx.process_pseudoranges(set, &ephemeris).unwrap();
    }

    let reference = ctx.reference_position().unwrap();
    assert_eq!(reference.source, ReferenceSource::Survey);
    assert!(truth_error_m(&reference.ecef()) < 1.0E-3);

    // reference residuals are now evaluated
    let set = SetBuilder::new(&ephemeris, test_time().shifted(3.0)).build();
    let solution = ctx.process_pseudoranges(set, &ephemeris).unwrap();
    assert!(solution.reference_residuals_m[1].abs() < 1.0E-3);
}

#[rstest]
fn atmospheric_delays(ephemeris: StaticEphemeris) {
    init_logger();

    let mut cfg = Config::default().without_fusion();
    cfg.modeling.elevation_above_sea_level_m = TRUTH_ALT_M;

    let ephemeris = ephemeris.with_klobuchar(test_klobuchar());
    let ctx = PositioningContext::new(cfg.clone());

    for i in 0..3 {
        let time = test_time().shifted(i as f64);
        let atmosphere = Atmosphere::new(cfg.modeling, Some(test_klobuchar()), None, time);

        let set = SetBuilder::new(&ephemeris, time)
            .with_atmosphere(atmosphere)
            .build();

        let solution = ctx.process_pseudoranges(set, &ephemeris).unwrap();

        let err = truth_error_m(&solution.position_ecef_m);
        assert!(err < 1.0E-3, "epoch #{}: error={}", i, err);
    }
}

#[rstest]
fn inertial_fusion(cfg: Config, ephemeris: StaticEphemeris) {
    init_logger();

    let mut cfg = cfg;
    cfg.fusion.imu_warmup_samples = 5;

    let ctx = PositioningContext::new(cfg);

    let mut timestamp = 0.0;

    for epoch in 0..5 {
        // 10 samples per epoch, slowly accelerating eastwards
        for _ in 0..10 {
            timestamp += 0.1;
            ctx.process_imu(&ImuSample::from_acceleration(
                timestamp,
                Vector3::new(0.2, 0.0, 0.0),
                0.1,
            ))
            .unwrap();
        }

        let set = SetBuilder::new(&ephemeris, test_time().shifted(epoch as f64)).build();
        ctx.process_pseudoranges(set, &ephemeris).unwrap();

        // static receiver: fused position stays at the anchor
        assert!(ctx.fused_state().position_enu_m.norm() < 0.1);
    }

    assert_eq!(
        ctx.process_imu(&ImuSample::from_acceleration(
            timestamp,
            Vector3::zeros(),
            0.1
        )),
        Err(Error::ImuOutOfOrder)
    );

    let state = ctx.fusion_state();
    assert!(state.p.iter().all(|p| p.is_finite()));
}

#[rstest]
fn concurrent_streams(cfg: Config, ephemeris: StaticEphemeris) {
    init_logger();

    let ctx = PositioningContext::new(cfg);

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 1..=500 {
                ctx.process_imu(&ImuSample::from_acceleration(
                    i as f64 * 0.01,
                    Vector3::zeros(),
                    0.01,
                ))
                .unwrap();
            }
        });

        for i in 0..5 {
            let set = SetBuilder::new(&ephemeris, test_time().shifted(i as f64)).build();
            ctx.process_pseudoranges(set, &ephemeris).unwrap();
        }
    });

    assert_eq!(ctx.converged_epochs(), 5);
    assert!(ctx.latest_solution().is_valid());
}

//! Tests for the utility building blocks

use perlin_mod_dsp::utils::phasor::Phasor;
use perlin_mod_dsp::utils::smoothed_parameter::SmoothedParameter;
use perlin_mod_dsp::utils::*;

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZE: usize = 64;

#[test]
fn phasor_retriggers_on_wrap() {
    let mut phasor = Phasor::new();
    phasor.set_increment(0.25);

    let retrigs: Vec<bool> = (0..8).map(|_| phasor.next().retrig).collect();

    assert_eq!(
        retrigs,
        [false, false, false, true, false, false, false, true]
    );
    assert!(phasor.phase() < 1e-12);
}

#[test]
fn phasor_keeps_phase_with_zero_increment() {
    let mut phasor = Phasor::new();
    phasor.set_phase(0.3);
    phasor.set_increment(0.0);

    for _ in 0..100 {
        let info = phasor.next();
        assert!(!info.retrig);
        assert_eq!(info.phase, 0.3);
    }
}

#[test]
fn smoothed_parameter_constant_target() {
    let mut parameter = SmoothedParameter::new(0.5);
    parameter.prepare(SAMPLE_RATE, BLOCK_SIZE, 20.0);

    let buffer = parameter.process(0.5, BLOCK_SIZE).to_vec();

    assert!(!parameter.is_smoothing());
    assert!(buffer.iter().all(|v| *v == 0.5));
}

#[test]
fn smoothed_parameter_converges() {
    let decay_ms = 20.0;
    let target = 0.8;

    let mut parameter = SmoothedParameter::new(0.0);
    parameter.prepare(SAMPLE_RATE, BLOCK_SIZE, decay_ms);

    // 5 times the decay time
    let blocks = (5.0 * decay_ms * 0.001 * SAMPLE_RATE / BLOCK_SIZE as f32).ceil() as usize;

    parameter.process(target, BLOCK_SIZE);
    assert!(parameter.is_smoothing());

    for _ in 1..blocks {
        parameter.process(target, BLOCK_SIZE);
    }

    assert!((parameter.value() - target).abs() <= target * 0.001);

    // Settled ramps fall back to the scalar path.
    parameter.process(target, BLOCK_SIZE);
    assert!(!parameter.is_smoothing());
    assert_eq!(parameter.value(), target);
}

#[test]
fn smoothed_parameter_ramp_is_monotonic() {
    let mut parameter = SmoothedParameter::new(1.0);
    parameter.prepare(SAMPLE_RATE, BLOCK_SIZE, 10.0);

    let ramp = parameter.process(0.0, BLOCK_SIZE).to_vec();

    assert!(ramp.windows(2).all(|w| w[1] <= w[0]));
    assert!(ramp.iter().all(|v| (0.0..1.0).contains(v)));
}

#[test]
fn smoothed_parameter_reset() {
    let mut parameter = SmoothedParameter::new(0.0);
    parameter.prepare(SAMPLE_RATE, BLOCK_SIZE, 20.0);
    parameter.reset(0.7);

    parameter.process(0.7, BLOCK_SIZE);

    assert!(!parameter.is_smoothing());
    assert_eq!(parameter.value(), 0.7);
}

#[test]
fn interpolation_kernels_hit_table_points() {
    let table = [0.1, -0.2, 0.3, -0.4, 0.5, -0.6];

    assert_eq!(interpolate_nearest(&table, 0.4), -0.2);
    assert_eq!(interpolate_nearest(&table, 1.6), -0.4);
    assert_eq!(interpolate_linear(&table, 0.5), 0.3);
    assert_eq!(interpolate_hermite(&table, 1.0), 0.3);
    assert_eq!(interpolate_hermite(&table, 2.0), -0.4);

    let mid = interpolate_linear(&table, 1.0);
    assert!((mid - (-0.05)).abs() < 1e-6);
}

#[test]
fn crossfade_endpoints() {
    assert!((crossfade_cosine(0.3, -0.7, 0.0) - 0.3).abs() < 1e-6);
    assert!((crossfade_cosine(0.3, -0.7, 1.0) - -0.7).abs() < 1e-6);
    assert!((crossfade_cosine(1.0, 1.0, 0.37) - 1.0).abs() < 1e-6);
}

#[test]
fn unit_conversions() {
    assert_eq!(decibels_to_gain(0.0), 1.0);
    assert!((decibels_to_gain(-6.0206) - 0.5).abs() < 1e-4);
    assert!((decibels_to_gain(20.0) - 10.0).abs() < 1e-4);
    assert_eq!(decibels_to_gain_with_floor(-80.0, -80.0), 0.0);
    assert!(decibels_to_gain_with_floor(-60.0, -80.0) > 0.0);

    assert_eq!(ms_to_samples(420.0, SAMPLE_RATE), 20160);
    assert_eq!(ms_to_samples(420.0, 44100.0), 18522);
    assert_eq!(ms_to_samples(420.0, 96000.0), 40320);
    assert_eq!(ms_to_samples(0.5, 44100.0), 22);
}

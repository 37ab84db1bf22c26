//! End-to-end tests of the block processor


use std::collections::VecDeque;

use perlin_mod_dsp::config::*;
use perlin_mod_dsp::noise::noise_table::{NoiseTable, DEFAULT_SEED};
use perlin_mod_dsp::noise::Shape;
use perlin_mod_dsp::oversampler::Oversampler;
use perlin_mod_dsp::processor::*;
use perlin_mod_dsp::transport::TransportPosition;

use wav_writer::SAMPLE_RATE;

const BLOCK_SIZE: usize = 64;

/// Oversampler stand-in that repeats samples on the way up and delays them
/// on the way down.
#[derive(Debug, Clone)]
struct DelayOversampler {
    enabled: bool,
    factor: usize,
    latency: usize,
    lines: Vec<VecDeque<f32>>,
}

impl DelayOversampler {
    fn new(factor: usize, latency: usize) -> Self {
        Self {
            enabled: false,
            factor,
            latency,
            lines: Vec::new(),
        }
    }
}

impl Oversampler for DelayOversampler {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn prepare(&mut self, _sample_rate: f32, _max_block_size: usize) {
        self.lines = vec![VecDeque::from(vec![0.0; self.latency()]); MAX_CHANNELS];
    }

    fn factor(&self) -> usize {
        if self.enabled {
            self.factor
        } else {
            1
        }
    }

    fn latency(&self) -> usize {
        if self.enabled {
            self.latency
        } else {
            0
        }
    }

    fn upsample(&mut self, _channel: usize, input: &[f32], output: &mut [f32]) {
        let factor = self.factor();
        for (i, sample) in output.iter_mut().enumerate() {
            *sample = input[i / factor];
        }
    }

    fn downsample(&mut self, channel: usize, input: &[f32], output: &mut [f32]) {
        let factor = self.factor();
        let line = &mut self.lines[channel];
        for (i, sample) in output.iter_mut().enumerate() {
            line.push_back(input[i * factor]);
            *sample = line.pop_front().unwrap();
        }
    }
}

fn noise_parameters() -> Parameters {
    Parameters {
        rate_hz: 2.0,
        octaves: 3.0,
        width: 0.0,
        shape: Shape::Spline,
        ..Default::default()
    }
}

/// Renders `duration` seconds of mono output from silence.
fn render_mono(parameters: &Parameters, duration: f32) -> Vec<f32> {
    let config = ProcessorConfig {
        num_channels: 1,
        ..Default::default()
    };
    let mut processor = Processor::new(config);
    processor.set_parameters(parameters);
    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();

    let blocks = (duration * SAMPLE_RATE / BLOCK_SIZE as f32) as usize;
    let transport = TransportPosition::default();
    let mut output = Vec::with_capacity(blocks * BLOCK_SIZE);

    for _ in 0..blocks {
        let mut out = [0.0; BLOCK_SIZE];
        processor.process(&mut [&mut out[..]], &transport);
        output.extend_from_slice(&out);
    }

    output
}

#[test]
fn prepare_rejects_invalid_settings() {
    let mut processor = Processor::default();

    assert_eq!(
        processor.prepare(0.0, BLOCK_SIZE),
        Err(ConfigError::InvalidSampleRate(0.0))
    );
    assert!(matches!(
        processor.prepare(f32::NAN, BLOCK_SIZE),
        Err(ConfigError::InvalidSampleRate(_))
    ));
    assert_eq!(
        processor.prepare(SAMPLE_RATE, 0),
        Err(ConfigError::InvalidBlockSize)
    );
    assert!(!processor.is_prepared());

    let mut processor = Processor::new(ProcessorConfig {
        num_channels: 3,
        ..Default::default()
    });
    assert_eq!(
        processor.prepare(SAMPLE_RATE, BLOCK_SIZE),
        Err(ConfigError::TooManyChannels(3))
    );

    let mut processor = Processor::with_oversampler(
        ProcessorConfig::default(),
        Box::new(DelayOversampler::new(0, 0)),
    );
    processor.set_parameters(&Parameters {
        hq: true,
        ..Default::default()
    });
    assert_eq!(
        processor.prepare(SAMPLE_RATE, BLOCK_SIZE),
        Err(ConfigError::InvalidOversamplingFactor(0))
    );
}

#[test]
fn reported_latency_follows_oversampling() {
    let mut processor = Processor::with_oversampler(
        ProcessorConfig::default(),
        Box::new(DelayOversampler::new(2, 12)),
    );

    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();
    assert_eq!(processor.reported_latency_samples(), 0);
    assert!(!processor.needs_prepare());

    processor.set_parameters(&Parameters {
        hq: true,
        ..Default::default()
    });
    assert!(processor.needs_prepare());

    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();
    assert!(!processor.needs_prepare());
    assert_eq!(processor.reported_latency_samples(), 12);
}

#[test]
fn noise_stream_is_bounded() {
    let output = render_mono(&noise_parameters(), 2.0);

    assert!(output.iter().all(|v| v.is_finite() && v.abs() < 1.5));
    assert!(output.iter().any(|v| v.abs() > 0.05));

    wav_writer::write("processor/noise_2hz.wav", &[&output]).ok();
}

#[test]
fn noise_stream_is_reproducible() {
    let a = render_mono(&noise_parameters(), 2.0);
    let b = render_mono(&noise_parameters(), 2.0);

    assert_eq!(a, b);
}

#[test]
fn noise_stream_repeats_with_table_period() {
    // 128 table steps per second, one table period per second.
    let parameters = Parameters {
        rate_hz: 128.0,
        ..noise_parameters()
    };
    let output = render_mono(&parameters, 2.0);
    let period = SAMPLE_RATE as usize;

    // Skip the initial parameter ramps.
    for n in 4800..output.len() - period {
        assert!(
            (output[n] - output[n + period]).abs() < 1e-3,
            "sample {n}: {} != {}",
            output[n],
            output[n + period]
        );
    }
}

#[test]
fn seed_changes_output() {
    let mut processor = Processor::default();
    processor.set_parameters(&noise_parameters());
    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();

    let handle = processor.seed_handle();
    std::thread::spawn(move || handle.set_seed(1234))
        .join()
        .unwrap();

    let mut left = [0.0; BLOCK_SIZE];
    let mut right = [0.0; BLOCK_SIZE];
    processor.process(
        &mut [&mut left[..], &mut right[..]],
        &TransportPosition::default(),
    );

    assert_eq!(processor.seed(), 1234);
    assert_eq!(processor.engine().table(), &NoiseTable::new(1234));
}

/// Processes one stereo block of silence and returns the left channel.
fn process_silence(processor: &mut Processor) -> [f32; BLOCK_SIZE] {
    let mut left = [0.0; BLOCK_SIZE];
    let mut right = [0.0; BLOCK_SIZE];
    processor.process(
        &mut [&mut left[..], &mut right[..]],
        &TransportPosition::default(),
    );
    left
}

#[test]
fn cloned_processor_is_independent() {
    let mut a = Processor::default();
    a.set_parameters(&noise_parameters());
    a.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();
    let reader_a = a.scope_reader(0);

    let mut b = a.clone();
    let reader_b = b.scope_reader(0);

    a.set_seed(1234);
    assert_eq!(b.seed(), DEFAULT_SEED);

    let left_a = process_silence(&mut a);
    process_silence(&mut b);
    let left_b = process_silence(&mut b);

    assert_eq!(a.seed(), 1234);
    assert_eq!(a.engine().table(), &NoiseTable::new(1234));
    assert_eq!(b.seed(), DEFAULT_SEED);
    assert_eq!(b.engine().table(), &NoiseTable::new(DEFAULT_SEED));

    b.set_seed(77);
    process_silence(&mut b);
    assert_eq!(b.engine().table(), &NoiseTable::new(77));
    assert_eq!(a.engine().table(), &NoiseTable::new(1234));

    // Each scope only holds what its own processor wrote.
    let mut snapshot = vec![0.0; 2 * BLOCK_SIZE];
    reader_a.snapshot(&mut snapshot);
    assert_eq!(snapshot[..BLOCK_SIZE], left_a);
    assert!(snapshot[BLOCK_SIZE..].iter().all(|v| *v == 0.0));

    reader_b.snapshot(&mut snapshot);
    assert_eq!(snapshot[BLOCK_SIZE..], left_b);

    // A request still pending at clone time reaches both.
    a.set_seed(5);
    let mut c = a.clone();
    process_silence(&mut a);
    process_silence(&mut c);
    assert_eq!(a.engine().table(), &NoiseTable::new(5));
    assert_eq!(c.engine().table(), &NoiseTable::new(5));
}

/// Renders `blocks` of mono output from a sine input.
fn render_with_input(config: ProcessorConfig, parameters: &Parameters, blocks: usize) -> Vec<f32> {
    let mut processor = Processor::new(ProcessorConfig {
        num_channels: 1,
        ..config
    });
    processor.set_parameters(parameters);
    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();

    let transport = TransportPosition::default();
    let mut output = Vec::with_capacity(blocks * BLOCK_SIZE);

    for block in 0..blocks {
        let start = block * BLOCK_SIZE;
        let mut out: Vec<f32> = (start..start + BLOCK_SIZE)
            .map(|n| (n as f32 * 0.01).sin() * 0.5)
            .collect();
        processor.process(&mut [&mut out[..]], &transport);
        output.extend_from_slice(&out);
    }

    output
}

#[test]
fn mute_dry_outputs_only_wet() {
    let config = ProcessorConfig {
        mixer: MixerConfig {
            mix_law: MixLaw::GainDry,
            ..Default::default()
        },
        ..Default::default()
    };
    let blocks = 400;

    // Dry at unity would be added, but is muted.
    let muted = render_with_input(
        config,
        &Parameters {
            mix: 0.0,
            gain_out: -6.0,
            mute_dry: true,
            ..noise_parameters()
        },
        blocks,
    );

    // Dry gain at the floor, so only the out-gained wet remains.
    let wet = render_with_input(
        config,
        &Parameters {
            mix: -80.0,
            gain_out: -6.0,
            ..noise_parameters()
        },
        blocks,
    );

    let with_dry = render_with_input(
        config,
        &Parameters {
            mix: 0.0,
            gain_out: -6.0,
            ..noise_parameters()
        },
        blocks,
    );

    let settled = 300 * BLOCK_SIZE;
    assert_eq!(muted[settled..], wet[settled..]);
    assert_ne!(muted[settled..], with_dry[settled..]);

    // Muting the dry signal has no effect under the equal law.
    let equal = ProcessorConfig::default();
    let parameters = Parameters {
        mix: 0.5,
        ..noise_parameters()
    };
    assert_eq!(
        render_with_input(
            equal,
            &Parameters {
                mute_dry: true,
                ..parameters
            },
            20
        ),
        render_with_input(equal, &parameters, 20)
    );
}

#[test]
fn debug_build_clamps_output() {
    let parameters = Parameters {
        gain_out: 40.0,
        ..noise_parameters()
    };
    let output = render_mono(&parameters, 1.0);

    if cfg!(debug_assertions) {
        assert!(output.iter().all(|v| (-2.0..=2.0).contains(v)));
        assert!(output.iter().any(|v| v.abs() == 2.0));
    } else {
        assert!(output.iter().any(|v| v.abs() > 2.0));
    }
}

#[test]
fn bypass_toggle_stays_aligned() {
    let latency = 16;

    let mut processor = Processor::with_oversampler(
        ProcessorConfig::default(),
        Box::new(DelayOversampler::new(2, latency)),
    );
    let mut parameters = Parameters {
        mix: 0.0,
        hq: true,
        ..noise_parameters()
    };
    processor.set_parameters(&parameters);
    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();
    assert_eq!(processor.reported_latency_samples(), latency);

    let input_sample = |n: usize| (n % 1000) as f32 * 1e-3;
    let settle_blocks = 400;
    let mut transport = TransportPosition {
        is_playing: true,
        ..Default::default()
    };

    for block in 0..settle_blocks + 40 {
        // Toggle the power every 5 blocks once the mix ramp has settled.
        if block >= settle_blocks {
            parameters.power = (block / 5) % 2 == 0;
            processor.set_parameters(&parameters);
        }

        let start = block * BLOCK_SIZE;
        let mut left: Vec<f32> = (start..start + BLOCK_SIZE).map(input_sample).collect();
        let mut right = left.clone();
        processor.process(&mut [&mut left[..], &mut right[..]], &transport);
        transport = transport.advanced(BLOCK_SIZE, SAMPLE_RATE as f64);

        if block < settle_blocks {
            continue;
        }

        for (s, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            let expected = input_sample(start + s - latency);
            assert_eq!(*l, expected, "block {block} sample {s}");
            assert_eq!(*r, expected, "block {block} sample {s}");
        }
    }
}

#[test]
fn cc_output_omnidirectional() {
    let config = ProcessorConfig {
        num_channels: 1,
        ..Default::default()
    };
    let mut processor = Processor::new(config);
    processor.set_parameters(&Parameters {
        orientation: Orientation::Omnidirectional,
        output_type: OutputType::Midi,
        ..noise_parameters()
    });
    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();

    let input: Vec<f32> = (0..BLOCK_SIZE).map(|s| s as f32 * 0.01).collect();
    let mut out = input.clone();
    processor.process(&mut [&mut out[..]], &TransportPosition::default());

    // Audio passes through.
    assert_eq!(out, input);

    let events = processor.cc_events();
    assert_eq!(events.len(), BLOCK_SIZE / CC_STEP);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.sample_offset, i * CC_STEP);
        assert_eq!(event.channel, 1);
        assert_eq!(event.controller, CC_CONTROLLER);
        assert!(event.value <= 127);
    }
}

#[test]
fn cc_output_bidirectional_per_channel() {
    let mut processor = Processor::default();
    processor.set_parameters(&Parameters {
        output_type: OutputType::Midi,
        width: 0.3,
        ..noise_parameters()
    });
    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();

    let mut left = [0.0; BLOCK_SIZE];
    let mut right = [0.0; BLOCK_SIZE];
    processor.process(
        &mut [&mut left[..], &mut right[..]],
        &TransportPosition::default(),
    );

    let events = processor.cc_events();
    assert_eq!(events.len(), 2 * BLOCK_SIZE / CC_STEP);
    assert!(events.iter().step_by(2).all(|e| e.channel == 1));
    assert!(events.iter().skip(1).step_by(2).all(|e| e.channel == 2));
    assert!(left.iter().chain(right.iter()).all(|v| *v == 0.0));

    // Next block starts with a fresh list.
    processor.set_parameters(&noise_parameters());
    processor.process(
        &mut [&mut left[..], &mut right[..]],
        &TransportPosition::default(),
    );
    assert!(processor.cc_events().is_empty());
}

#[test]
fn cc_value_mapping() {
    assert_eq!(cc_value(0.0), 0);
    assert_eq!(cc_value(0.5), 64);
    assert_eq!(cc_value(1.0), 127);
    assert_eq!(cc_value(-0.3), 0);
    assert_eq!(cc_value(1.4), 127);

    let event = CcEvent {
        sample_offset: 0,
        channel: 2,
        controller: 1,
        value: 100,
    };
    assert_eq!(event.to_bytes(), [0xb1, 1, 100]);
}

#[test]
fn omnidirectional_is_unipolar() {
    let parameters = Parameters {
        orientation: Orientation::Omnidirectional,
        rate_hz: 50.0,
        ..noise_parameters()
    };
    let output = render_mono(&parameters, 1.0);

    assert!(output.iter().all(|v| (-0.25..=1.25).contains(v)));
    let mean = output.iter().sum::<f32>() / output.len() as f32;
    assert!(mean > 0.2 && mean < 0.8);
}

#[test]
fn scope_captures_modulation() {
    let mut processor = Processor::default();
    processor.set_parameters(&noise_parameters());
    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();
    let reader = processor.scope_reader(0);

    // One bar at 120 bpm.
    let bar_length = 2 * SAMPLE_RATE as usize;

    let mut left = [0.0; BLOCK_SIZE];
    let mut right = [0.0; BLOCK_SIZE];
    processor.process(
        &mut [&mut left[..], &mut right[..]],
        &TransportPosition::default(),
    );

    assert_eq!(reader.window_length(), bar_length);
    assert_eq!(reader.beat_length(), SAMPLE_RATE / 2.0);

    let mut snapshot = vec![0.0; bar_length];
    assert_eq!(reader.snapshot(&mut snapshot), bar_length);
    assert_eq!(snapshot[..BLOCK_SIZE], left);

    // Locked to the bar while playing, the second beat starts at half a second.
    let transport = TransportPosition {
        is_playing: true,
        ppq_position: 5.0,
        time_in_samples: 5 * SAMPLE_RATE as i64 / 2,
        ..Default::default()
    };
    processor.process(&mut [&mut left[..], &mut right[..]], &transport);

    let beat = SAMPLE_RATE as usize / 2;
    reader.snapshot(&mut snapshot);
    assert_eq!(snapshot[beat..beat + BLOCK_SIZE], left);
}

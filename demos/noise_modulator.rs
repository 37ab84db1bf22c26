//! Perlin noise modulator with MIDI parameter control.
//!
//! A sine tone is fed through the processor, the mix control blends it with
//! the generated noise.

use audio_midi_shell::{AudioGenerator, AudioMidiShell};
use simple_logger::SimpleLogger;

use perlin_mod_dsp::config::{Parameters, ProcessorConfig};
use perlin_mod_dsp::noise::Shape;
use perlin_mod_dsp::processor::Processor;
use perlin_mod_dsp::transport::TransportPosition;

const SAMPLE_RATE: u32 = 48000;
const BLOCK_SIZE: usize = 32;

const TONE_FREQUENCY: f32 = 220.0;

fn main() -> ! {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init()
        .unwrap();

    AudioMidiShell::run_forever(SAMPLE_RATE, BLOCK_SIZE, App::new());
}

struct App {
    processor: Processor,
    parameters: Parameters,
    transport: TransportPosition,
    tone_phase: f32,
    seed: i32,
}

impl App {
    pub fn new() -> Self {
        Self {
            processor: Processor::new(ProcessorConfig::default()),
            parameters: Parameters {
                rate_hz: 2000.0,
                octaves: 3.0,
                mix: 0.5,
                ..Default::default()
            },
            transport: TransportPosition {
                is_playing: true,
                ..Default::default()
            },
            tone_phase: 0.0,
            seed: 0,
        }
    }
}

impl AudioGenerator for App {
    fn init(&mut self, block_size: usize) {
        self.processor.set_parameters(&self.parameters);
        self.seed = self.processor.seed();
        self.processor
            .prepare(SAMPLE_RATE as f32, block_size)
            .unwrap();
    }

    fn process(&mut self, samples_left: &mut [f32], samples_right: &mut [f32]) {
        let increment = TONE_FREQUENCY / SAMPLE_RATE as f32;

        for (left, right) in samples_left.iter_mut().zip(samples_right.iter_mut()) {
            let tone = (self.tone_phase * std::f32::consts::TAU).sin() * 0.25;
            *left = tone;
            *right = tone;
            self.tone_phase = (self.tone_phase + increment).fract();
        }

        if self.processor.needs_prepare() {
            self.processor
                .prepare(SAMPLE_RATE as f32, samples_left.len())
                .unwrap();
        }

        let num_samples = samples_left.len();
        let mut samples = [samples_left, samples_right];
        self.processor.process(&mut samples, &self.transport);
        self.transport = self.transport.advanced(num_samples, SAMPLE_RATE as f64);
    }

    fn process_midi(&mut self, message: Vec<u8>) {
        if message[0] & 0xF0 != 0xB0 {
            return;
        }

        // Control change
        let value = message[2] as f32 / 127.0;
        match message[1] {
            21 => {
                self.parameters.rate_hz = (value * value * 8000.0) as f64;
                log::info!("Rate: {} Hz", self.parameters.rate_hz);
            }
            22 => {
                self.parameters.octaves = 1.0 + value * 6.99;
                log::info!("Octaves: {}", self.parameters.octaves);
            }
            23 => {
                self.parameters.width = value;
                log::info!("Width: {}", self.parameters.width);
            }
            24 => {
                self.parameters.shape = Shape::from_index((value * 2.0).round() as usize);
                log::info!("Shape: {:?}", self.parameters.shape);
            }
            25 => {
                self.parameters.mix = value;
                log::info!("Mix: {}", self.parameters.mix);
            }
            26 => {
                self.parameters.gain_out = value * 24.0 - 18.0;
                log::info!("Gain: {} dB", self.parameters.gain_out);
            }
            27 if message[2] != 0 => {
                self.seed = self.seed.wrapping_add(1);
                self.processor.set_seed(self.seed);
            }
            28 => {
                self.parameters.power = message[2] >= 64;
                log::info!("Power: {}", self.parameters.power);
            }
            _ => {}
        }

        self.processor.set_parameters(&self.parameters);
    }
}

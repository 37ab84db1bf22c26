//! Mixing stage around the modulation generator.
//!
//! The dry input is captured before processing, delayed by the latency of the
//! wet path and blended back in after it.

pub mod dry_wet_mix;
pub mod latency_compensation;

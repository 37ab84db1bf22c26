#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod fx;
pub mod noise;
pub mod oversampler;
pub mod processor;
pub mod scope;
pub mod transport;
pub mod utils;

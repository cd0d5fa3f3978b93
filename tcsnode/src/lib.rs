//! The color-sensor telemetry node: sampling, storage and command
//! dispatch, behind hardware trait seams.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod dispatch;
pub mod hw;
pub mod ring;
pub mod sensor;
pub mod shared;

pub use dispatch::{Config, Node};

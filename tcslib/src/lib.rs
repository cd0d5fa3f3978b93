#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

mod color;
pub use color::ColorReading;

mod link;
pub use link::*;

pub mod protocol;

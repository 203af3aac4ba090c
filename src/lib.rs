//! Sensor node firmware for the "should I ventilate?" stations.
//!
//! Each node reads one humidity/temperature sensor, derives the absolute
//! humidity and answers UDP queries with the latest reading as JSON.
//! Everything outside `hardware` and `net` is hardware independent.

#![cfg_attr(not(test), no_std)]

pub mod aht20;
pub mod config;
pub mod dht22;
pub mod error;
pub mod humidity;
pub mod logic;
pub mod model;
pub mod traits;
pub mod wire;

#[cfg(feature = "firmware")]
pub mod hardware;
#[cfg(feature = "firmware")]
pub mod net;

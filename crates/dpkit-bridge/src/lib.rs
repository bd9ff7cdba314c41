//! The `dpkit-bridge` library crate exposes cloud smart-home devices as
//! home-automation accessories.
//!
//! A cloud device reports a flat set of named data points, called schema
//! codes, whose presence, type and valid ranges vary by model and firmware.
//! This crate inspects the schema of a device, decides which capabilities of
//! a fixed vocabulary the device supports, builds the corresponding services
//! and characteristics, and keeps them synchronized in both directions with
//! the live state of the device.
//!
//! Core functionalities of this crate include:
//!
//! - Resolving features through ordered lists of code aliases
//! - Translating raw device values into external value domains and back,
//!   including decimal scales, percentages, enumeration tokens and colours
//! - Inferring derived state, such as the motion direction of a cover, from
//!   consecutive position samples
//! - Propagating live device updates into the capability layer through
//!   per-device message-passing channels
//!
//! Devices are consumed through the [`device::Device`] trait, so network
//! transports, persistence and device discovery stay outside of this crate.
//!
//! `dpkit-bridge` leverages `tokio` to run one live-update listener task per
//! device, so updates coming from independent devices are handled
//! concurrently.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Accessories and the categories of devices they support.
pub mod accessory;
/// A capability binder used by accessory composers.
pub mod binder;
/// A bridge for managing the accessories of many devices.
pub mod bridge;
/// Characteristic bindings shared among accessory composers.
pub mod characteristics;
/// Bridge configuration.
pub mod config;
/// The device interface consumed by a bridge.
pub mod device;
/// Error management.
pub mod error;
/// The capability registry mirrored by a home-automation host.
pub mod registry;
/// A schema resolver based on ordered code aliases.
pub mod resolver;
/// Pure value translations between device and external domains.
pub mod translate;
/// Derived motion state inferred from consecutive samples.
pub mod trend;
/// Propagation of live device updates.
pub mod updates;

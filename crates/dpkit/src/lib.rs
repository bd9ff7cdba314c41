//! The data model shared among a `dpkit` bridge and its collaborators.
//!
//! This crate provides APIs to:
//!
//! - Decode the schema a cloud device reports. A schema is a flat list of
//!   named data points, called schema codes, each one with a type and
//!   type-specific metadata such as numeric ranges, decimal scales or the set
//!   of allowed enumeration tokens.
//! - Describe the last known value of a schema code, the live updates a
//!   device publishes, and the commands sent back to a device.
//! - Describe the accessory side: the services and characteristics a bridge
//!   exposes to a home-automation host, their value domains and their values.
//!
//! A cloud transport deserializes the schema and status structures, while a
//! bridge consumes them to decide which capabilities a device supports.
//!
//! This crate can be compiled for both `std` and `no_std` environments.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![no_std]

extern crate alloc;

/// Characteristic kinds, value domains and values.
pub mod characteristic;
/// Schema descriptors and their type-specific properties.
pub mod schema;
/// Service kinds and identities.
pub mod service;
/// Statuses, live updates and commands.
pub mod status;

#[cfg(test)]
pub(crate) fn serialize<T: serde::Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).unwrap()
}

#[cfg(test)]
pub(crate) fn deserialize<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}

//! Characteristic bindings shared among accessory composers.
//!
//! Every helper takes an already resolved [`SchemaDescriptor`], so the
//! decision on whether a feature is supported stays with the composer.

mod light;
mod rotation_speed;

pub use light::{LightSchemas, light};
pub use rotation_speed::{rotation_speed, rotation_speed_level};

use dpkit::characteristic::{CharacteristicKind, CharacteristicValue, Props};
use dpkit::schema::SchemaDescriptor;
use dpkit::service::{ServiceId, ServiceKind};
use dpkit::status::Command;

use serde_json::Value;

use crate::binder::Binder;
use crate::translate::{limit, percent};

/// Builds the value of a numeric characteristic, keeping integers when no
/// decimal digits are involved.
#[must_use]
pub fn numeric(value: f64, scale: u32) -> CharacteristicValue {
    if scale == 0 {
        CharacteristicValue::Int(value.round() as i64)
    } else {
        CharacteristicValue::Float(value)
    }
}

fn boolean_binding(
    binder: &mut Binder<'_>,
    service: &ServiceId,
    kind: CharacteristicKind,
    schema: &SchemaDescriptor,
    is_target: bool,
) {
    let code = schema.code.clone();

    binder.props(service, kind, Props::BOOLEAN);
    binder.bind_read(service, kind, &[code.as_str()], {
        let code = code.clone();
        move |snapshot| {
            let value = snapshot.boolean(&code).unwrap_or(false);
            match kind {
                CharacteristicKind::On | CharacteristicKind::StatusActive => value.into(),
                _ => CharacteristicValue::Int(i64::from(value)),
            }
        }
    });
    binder.bind_write(service, kind, is_target, move |_, value| {
        Some(vec![Command::new(code.as_str(), value.as_bool())])
    });
}

/// Binds `Active` to a boolean code.
pub fn active(binder: &mut Binder<'_>, service: &ServiceId, schema: &SchemaDescriptor) {
    boolean_binding(binder, service, CharacteristicKind::Active, schema, true);
}

/// Binds `LockPhysicalControls` to a boolean code.
pub fn lock_physical_controls(
    binder: &mut Binder<'_>,
    service: &ServiceId,
    schema: &SchemaDescriptor,
) {
    boolean_binding(
        binder,
        service,
        CharacteristicKind::LockPhysicalControls,
        schema,
        false,
    );
}

/// Binds `On` to a boolean code.
///
/// Without a service, the characteristic lives on a `Switch` service whose
/// subtype and name are the schema code. The identity of the switch is
/// returned.
pub fn on(
    binder: &mut Binder<'_>,
    service: Option<&ServiceId>,
    schema: &SchemaDescriptor,
) -> ServiceId {
    let service = match service {
        Some(service) => service.clone(),
        None => binder.service(ServiceKind::Switch, Some(schema.code.as_str()), &schema.code),
    };
    boolean_binding(binder, &service, CharacteristicKind::On, schema, true);
    service
}

/// Binds a read-only percentage, such as `BatteryLevel`.
///
/// Values are clamped to `[0, 100]` and an absent status reads as `0`.
pub fn read_only_percent(
    binder: &mut Binder<'_>,
    service: &ServiceId,
    kind: CharacteristicKind,
    schema: &SchemaDescriptor,
) {
    let code = schema.code.clone();

    binder.props(service, kind, Props::PERCENTAGE);
    binder.bind_read(service, kind, &[code.as_str()], {
        let code = code.clone();
        move |snapshot| {
            let value = snapshot
                .value(&code)
                .and_then(|value| percent(&value))
                .unwrap_or(0);
            CharacteristicValue::Int(value)
        }
    });
}

/// Binds a momentary trigger to `On`.
///
/// Writing `true` sends exactly one command carrying the pulse value, while
/// writing `false` sends nothing. The trigger has no read handler and is
/// never reset.
pub fn momentary_trigger(
    binder: &mut Binder<'_>,
    service: &ServiceId,
    schema: &SchemaDescriptor,
    pulse: Value,
) {
    let code = schema.code.clone();

    binder.props(service, CharacteristicKind::On, Props::BOOLEAN);
    binder.bind_write(service, CharacteristicKind::On, false, move |_, value| {
        value
            .as_bool()
            .then(|| vec![Command::new(code.as_str(), pulse.clone())])
    });
}

/// Binds a read-only number clamped to `[min, max]`, scaled according to the
/// integer property of the code.
///
/// An absent status reads as `0` clamped to the range.
pub fn read_only_number(
    binder: &mut Binder<'_>,
    service: &ServiceId,
    kind: CharacteristicKind,
    schema: &SchemaDescriptor,
    range: (f64, f64),
) {
    let code = schema.code.clone();
    let property = schema.integer_property().cloned().unwrap_or_default();
    let (min, max) = range;

    binder.props(service, kind, Props::new(min, max, property.to_units(1.)));
    binder.bind_read(service, kind, &[code.as_str()], {
        let code = code.clone();
        move |snapshot| {
            let value = snapshot
                .number(&code)
                .map_or(0., |raw| property.to_units(raw));
            numeric(limit(value, min, max), property.scale)
        }
    });
}

use dpkit::characteristic::{CharacteristicKind, CharacteristicValue, Props};
use dpkit::schema::SchemaDescriptor;
use dpkit::service::ServiceId;
use dpkit::status::Command;

use tracing::warn;

use crate::binder::Binder;
use crate::translate::{scaled, speed_level, speed_token, unscaled};

use super::numeric;

/// Binds `RotationSpeed` to an integer code.
///
/// The value domain is the declared range of the code in engineering units.
pub fn rotation_speed(binder: &mut Binder<'_>, service: &ServiceId, schema: &SchemaDescriptor) {
    let Some(property) = schema.integer_property().cloned() else {
        warn!("Rotation speed code `{}` is not an integer", schema.code);
        return;
    };

    let code = schema.code.clone();
    let (min, max) = (property.min_units(), property.max_units());

    binder.props(
        service,
        CharacteristicKind::RotationSpeed,
        Props::new(min, max, property.step_units()),
    );
    binder.bind_read(service, CharacteristicKind::RotationSpeed, &[code.as_str()], {
        let code = code.clone();
        let property = property.clone();
        move |snapshot| {
            let raw = snapshot.number(&code).unwrap_or(0.);
            numeric(scaled(raw, &property, min, max), property.scale)
        }
    });
    binder.bind_write(
        service,
        CharacteristicKind::RotationSpeed,
        true,
        move |_, value| {
            Some(vec![Command::new(
                code.as_str(),
                unscaled(value.as_f64(), &property),
            )])
        },
    );
}

/// Binds `RotationSpeed` to an enumeration of speed levels.
///
/// The value domain goes from `0` to the number of levels: level `k` is the
/// `k`-th declared token, while `0` selects nothing.
pub fn rotation_speed_level(
    binder: &mut Binder<'_>,
    service: &ServiceId,
    schema: &SchemaDescriptor,
) {
    let Some(property) = schema.enum_property().cloned() else {
        warn!("Rotation speed level code `{}` is not an enumeration", schema.code);
        return;
    };

    let code = schema.code.clone();

    binder.props(
        service,
        CharacteristicKind::RotationSpeed,
        Props::new(0., property.len() as f64, 1.),
    );
    binder.bind_read(service, CharacteristicKind::RotationSpeed, &[code.as_str()], {
        let code = code.clone();
        let property = property.clone();
        move |snapshot| {
            let Some(token) = snapshot.token(&code) else {
                return CharacteristicValue::Int(0);
            };
            let level = speed_level(&property, &token).unwrap_or_else(|| {
                warn!("Unknown speed level `{token}` for code `{code}`, use 0");
                0
            });
            CharacteristicValue::Int(level)
        }
    });
    binder.bind_write(
        service,
        CharacteristicKind::RotationSpeed,
        true,
        move |_, value| {
            let token = speed_token(&property, value.as_f64().round() as i64)?;
            Some(vec![Command::new(code.as_str(), token)])
        },
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dpkit::characteristic::{CharacteristicKind, CharacteristicValue, Props};
    use dpkit::schema::{IntegerProperty, SchemaDescriptor};
    use dpkit::service::{ServiceId, ServiceKind};
    use dpkit::status::Command;

    use crate::tests::{Fixture, MockDevice};

    use super::{rotation_speed, rotation_speed_level};

    fn service() -> ServiceId {
        ServiceId::primary(ServiceKind::AirPurifier)
    }

    #[tokio::test]
    async fn test_continuous_speed_round_trip() {
        let device = Arc::new(MockDevice::new("yyj").with_schema(SchemaDescriptor::integer(
            "speed",
            IntegerProperty::new(10, 1000).scale(1).step(5),
        )));
        let mut fixture = Fixture::new(Arc::clone(&device));

        let mut binder = fixture.binder();
        let schema = binder.schema(&["speed"]).unwrap();
        rotation_speed(&mut binder, &service(), schema);

        assert_eq!(
            fixture.props(&service(), CharacteristicKind::RotationSpeed),
            Props::new(1., 100., 0.5)
        );
        // Absent status reads as the lower bound.
        assert_eq!(
            fixture.read(&service(), CharacteristicKind::RotationSpeed),
            CharacteristicValue::Float(1.)
        );

        for speed in [1., 12.5, 37.3, 100.] {
            fixture
                .write(
                    &service(),
                    CharacteristicKind::RotationSpeed,
                    CharacteristicValue::Float(speed),
                )
                .await;
            let read = fixture
                .read(&service(), CharacteristicKind::RotationSpeed)
                .as_f64();
            assert!((read - speed).abs() <= 0.1, "{read} != {speed}");
        }

        assert_eq!(
            device.dispatches().last(),
            Some(&(vec![Command::new("speed", 1000)], true))
        );
    }

    #[tokio::test]
    async fn test_speed_levels() {
        let device = Arc::new(
            MockDevice::new("yyj")
                .with_schema(SchemaDescriptor::enumeration(
                    "fan_speed_enum",
                    ["low", "mid", "high"],
                ))
                .with_status("fan_speed_enum", "mid"),
        );
        let mut fixture = Fixture::new(Arc::clone(&device));

        let mut binder = fixture.binder();
        let schema = binder.schema(&["fan_speed_enum"]).unwrap();
        rotation_speed_level(&mut binder, &service(), schema);

        assert_eq!(
            fixture.props(&service(), CharacteristicKind::RotationSpeed),
            Props::new(0., 3., 1.)
        );
        assert_eq!(
            fixture.read(&service(), CharacteristicKind::RotationSpeed),
            CharacteristicValue::Int(2)
        );

        fixture
            .write(
                &service(),
                CharacteristicKind::RotationSpeed,
                CharacteristicValue::Int(0),
            )
            .await;
        assert!(device.dispatches().is_empty());

        fixture
            .write(
                &service(),
                CharacteristicKind::RotationSpeed,
                CharacteristicValue::Int(3),
            )
            .await;
        assert_eq!(
            device.dispatches(),
            [(vec![Command::new("fan_speed_enum", "high")], true)]
        );

        device.set_status("fan_speed_enum", "turbo");
        assert_eq!(
            fixture.read(&service(), CharacteristicKind::RotationSpeed),
            CharacteristicValue::Int(0)
        );
    }
}

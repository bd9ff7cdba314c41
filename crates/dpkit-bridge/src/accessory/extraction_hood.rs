use dpkit::characteristic::{
    CharacteristicKind, CharacteristicValue, CurrentAirPurifierState, TargetAirPurifierState,
};
use dpkit::schema::{SchemaDescriptor, SchemaType};
use dpkit::service::{ServiceId, ServiceKind};
use dpkit::status::Command;

use tracing::debug;

use crate::binder::Binder;
use crate::characteristics::{
    LightSchemas, active, light, lock_physical_controls, on, rotation_speed, rotation_speed_level,
};
use crate::resolver::FeatureAlias;

use super::Category;

const ACTIVE: FeatureAlias = &["switch"];
const MODE: FeatureAlias = &["mode"];
const LOCK: FeatureAlias = &["lock"];
const SPEED: FeatureAlias = &["speed"];
const SPEED_LEVEL: FeatureAlias = &["fan_speed_enum", "speed"];
const LIGHT_ON: FeatureAlias = &["light", "switch_led"];
const LIGHT_MODE: FeatureAlias = &["work_mode"];
const LIGHT_BRIGHT: FeatureAlias = &["bright_value", "bright_value_v2"];
const LIGHT_TEMP: FeatureAlias = &["temp_value", "temp_value_v2"];
const LIGHT_COLOUR: FeatureAlias = &["colour_data"];

const AUTO_MODE: &str = "auto";
const MANUAL_MODE: &str = "manual";

pub(crate) const REQUIRED: &[FeatureAlias] = &[ACTIVE];

pub(crate) fn configure(binder: &mut Binder<'_>) {
    let Some(switch) = binder.schema(ACTIVE) else {
        return;
    };

    let main = binder.service(
        ServiceKind::AirPurifier,
        None,
        Category::ExtractionHood.name(),
    );

    active(binder, &main, switch);
    current_state(binder, &main, switch);

    if let Some(mode) = binder.schema(MODE) {
        target_state(binder, &main, mode);
    }

    if let Some(lock) = binder.schema(LOCK) {
        lock_physical_controls(binder, &main, lock);
    }

    if let Some(speed) = binder.schema_typed(SPEED, SchemaType::Integer) {
        rotation_speed(binder, &main, speed);
    } else if let Some(level) = binder.schema_typed(SPEED_LEVEL, SchemaType::Enum) {
        rotation_speed_level(binder, &main, level);
    } else {
        debug!("Speed is not supported by device `{}`", binder.device_id());
    }

    configure_light(binder);
}

fn current_state(binder: &mut Binder<'_>, service: &ServiceId, schema: &SchemaDescriptor) {
    let code = schema.code.clone();

    binder.bind_read(
        service,
        CharacteristicKind::CurrentAirPurifierState,
        &[code.as_str()],
        {
            let code = code.clone();
            move |snapshot| {
                if snapshot.boolean(&code).unwrap_or(false) {
                    CurrentAirPurifierState::PurifyingAir.into()
                } else {
                    CurrentAirPurifierState::Inactive.into()
                }
            }
        },
    );
}

fn target_state(binder: &mut Binder<'_>, service: &ServiceId, schema: &SchemaDescriptor) {
    let code = schema.code.clone();

    binder.bind_read(
        service,
        CharacteristicKind::TargetAirPurifierState,
        &[code.as_str()],
        {
            let code = code.clone();
            move |snapshot| {
                if snapshot.token(&code).as_deref() == Some(AUTO_MODE) {
                    TargetAirPurifierState::Auto.into()
                } else {
                    TargetAirPurifierState::Manual.into()
                }
            }
        },
    );
    binder.bind_write(
        service,
        CharacteristicKind::TargetAirPurifierState,
        true,
        move |_, value: CharacteristicValue| {
            let mode = if value.as_i64() == TargetAirPurifierState::Auto as i64 {
                AUTO_MODE
            } else {
                MANUAL_MODE
            };
            Some(vec![Command::new(code.as_str(), mode)])
        },
    );
}

fn configure_light(binder: &mut Binder<'_>) {
    let Some(on_schema) = binder.schema(LIGHT_ON) else {
        debug!("Light is not supported by device `{}`", binder.device_id());
        return;
    };

    let schemas = LightSchemas {
        on: on_schema,
        bright: binder.schema(LIGHT_BRIGHT),
        temp: binder.schema(LIGHT_TEMP),
        colour: binder.schema(LIGHT_COLOUR),
        mode: binder.schema(LIGHT_MODE),
    };

    if schemas.bright.is_some()
        || schemas.temp.is_some()
        || schemas.colour.is_some()
        || schemas.mode.is_some()
    {
        let service = binder.service(ServiceKind::Lightbulb, None, "Light");
        light(binder, &service, &schemas);
    } else {
        let _ = on(binder, None, on_schema);
        binder.remove_service(ServiceKind::Lightbulb, None);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dpkit::characteristic::{
        CharacteristicKind, CharacteristicValue, CurrentAirPurifierState, Props,
        TargetAirPurifierState,
    };
    use dpkit::schema::{IntegerProperty, SchemaDescriptor};
    use dpkit::service::{ServiceId, ServiceKind};
    use dpkit::status::Command;

    use crate::accessory::{Accessory, AccessoryOptions, Category};
    use crate::tests::{MockDevice, configured};

    fn main() -> ServiceId {
        ServiceId::primary(ServiceKind::AirPurifier)
    }

    fn hood() -> MockDevice {
        MockDevice::new("yyj")
            .with_schema(SchemaDescriptor::boolean("switch"))
            .with_schema(SchemaDescriptor::enumeration("mode", ["manual", "auto"]))
            .with_schema(SchemaDescriptor::boolean("lock"))
            .with_schema(SchemaDescriptor::integer(
                "pm25",
                IntegerProperty::new(0, 999),
            ))
            .with_status("switch", true)
            .with_status("mode", "auto")
            .with_status("lock", false)
    }

    #[tokio::test]
    async fn test_air_purifier() {
        let device = Arc::new(hood());
        let accessory = configured(&device, Category::ExtractionHood);

        assert_eq!(
            accessory.read(&main(), CharacteristicKind::Active),
            Ok(CharacteristicValue::Int(1))
        );
        assert_eq!(
            accessory.read(&main(), CharacteristicKind::CurrentAirPurifierState),
            Ok(CurrentAirPurifierState::PurifyingAir.into())
        );
        assert_eq!(
            accessory.read(&main(), CharacteristicKind::TargetAirPurifierState),
            Ok(TargetAirPurifierState::Auto.into())
        );
        assert_eq!(
            accessory.read(&main(), CharacteristicKind::LockPhysicalControls),
            Ok(CharacteristicValue::Int(0))
        );
        // Neither a speed nor a light is declared.
        assert!(
            accessory
                .read(&main(), CharacteristicKind::RotationSpeed)
                .is_err()
        );
        assert_eq!(accessory.registry().len(), 1);

        accessory
            .write(
                &main(),
                CharacteristicKind::TargetAirPurifierState,
                TargetAirPurifierState::Manual.into(),
            )
            .await
            .unwrap();
        accessory
            .write(&main(), CharacteristicKind::Active, CharacteristicValue::Int(0))
            .await
            .unwrap();

        assert_eq!(
            device.dispatches(),
            [
                (vec![Command::new("mode", "manual")], true),
                (vec![Command::new("switch", false)], true),
            ]
        );
        assert_eq!(
            accessory.read(&main(), CharacteristicKind::CurrentAirPurifierState),
            Ok(CurrentAirPurifierState::Inactive.into())
        );
    }

    #[test]
    fn test_speed_selection() {
        // An integer `speed` is continuous.
        let device = Arc::new(
            hood()
                .with_schema(SchemaDescriptor::integer("speed", IntegerProperty::new(1, 100)))
                .with_schema(SchemaDescriptor::enumeration("fan_speed_enum", ["low", "high"])),
        );
        let accessory = configured(&device, Category::ExtractionHood);
        assert_eq!(
            accessory
                .registry()
                .characteristic(&main(), CharacteristicKind::RotationSpeed)
                .map(|characteristic| characteristic.props()),
            Ok(Props::new(1., 100., 1.))
        );

        // An enumerated `speed` is a level.
        let device = Arc::new(
            hood().with_schema(SchemaDescriptor::enumeration("speed", ["1", "2", "3", "4"])),
        );
        let accessory = configured(&device, Category::ExtractionHood);
        assert_eq!(
            accessory
                .registry()
                .characteristic(&main(), CharacteristicKind::RotationSpeed)
                .map(|characteristic| characteristic.props()),
            Ok(Props::new(0., 4., 1.))
        );
    }

    #[test]
    fn test_light_switch_replaces_lightbulb() {
        let device = Arc::new(
            hood()
                .with_schema(SchemaDescriptor::boolean("light"))
                .with_schema(SchemaDescriptor::integer(
                    "bright_value",
                    IntegerProperty::new(25, 255),
                ))
                .with_status("light", true),
        );
        let lightbulb = ServiceId::primary(ServiceKind::Lightbulb);
        let switch = ServiceId::with_subtype(ServiceKind::Switch, "light");

        let accessory = configured(&device, Category::ExtractionHood);
        assert_eq!(
            accessory.read(&lightbulb, CharacteristicKind::On),
            Ok(CharacteristicValue::Bool(true))
        );
        assert!(accessory.registry().get_service(&switch).is_none());

        // The brightness code is hidden, so the light degrades to a switch
        // and the light bulb created before goes away.
        let mut accessory = Accessory::new(
            device.clone(),
            Category::ExtractionHood,
            AccessoryOptions::new().hide("bright_value"),
        );
        let _ = accessory
            .registry
            .service(lightbulb.clone(), "Light")
            .get_or_add_characteristic(CharacteristicKind::On);
        assert!(accessory.configure().is_supported());

        assert!(accessory.registry().get_service(&lightbulb).is_none());
        assert_eq!(
            accessory.read(&switch, CharacteristicKind::On),
            Ok(CharacteristicValue::Bool(true))
        );
    }

    #[test]
    fn test_missing_switch() {
        let device = Arc::new(MockDevice::new("yyj").with_schema(SchemaDescriptor::boolean("light")));
        let mut accessory = Accessory::new(device, Category::ExtractionHood, AccessoryOptions::new());
        assert!(!accessory.configure().is_supported());
    }
}

use dpkit::characteristic::{CharacteristicKind, CharacteristicValue, Props};
use dpkit::schema::SchemaDescriptor;
use dpkit::service::{ServiceId, ServiceKind};

use serde_json::Value;

use tracing::warn;

use crate::binder::Binder;
use crate::characteristics::{momentary_trigger, on, read_only_percent};
use crate::device::Snapshot;
use crate::resolver::FeatureAlias;

use super::Category;

const ACTIVE: FeatureAlias = &["switch"];
const LIGHT: FeatureAlias = &["light"];
const BATTERY_PERCENTAGE: FeatureAlias = &["battery_percentage"];
const FEED_REPORT: FeatureAlias = &["feed_report"];
const FEED_STATE: FeatureAlias = &["feed_state"];

const FEEDING_STATE: &str = "feeding";

pub(crate) const REQUIRED: &[FeatureAlias] = &[ACTIVE];

// The value a trigger sends when fired.
#[derive(Clone, Copy)]
enum Pulse {
    Flag,
    Portion,
}

impl Pulse {
    fn value(self) -> Value {
        match self {
            Self::Flag => Value::Bool(true),
            Self::Portion => Value::from(1),
        }
    }
}

struct Trigger {
    aliases: FeatureAlias,
    feature: &'static str,
    pulse: Pulse,
}

const TRIGGERS: &[Trigger] = &[
    Trigger {
        aliases: &["quick_feed"],
        feature: "Quick feed",
        pulse: Pulse::Flag,
    },
    Trigger {
        aliases: &["slow_feed"],
        feature: "Slow feed",
        pulse: Pulse::Flag,
    },
    Trigger {
        aliases: &["manual_feed"],
        feature: "Manual feed",
        pulse: Pulse::Portion,
    },
    Trigger {
        aliases: &["meal_plan"],
        feature: "Meal plan",
        pulse: Pulse::Flag,
    },
];

pub(crate) fn configure(binder: &mut Binder<'_>) {
    let Some(switch) = binder.schema(ACTIVE) else {
        return;
    };

    let main = binder.service(ServiceKind::Switch, None, Category::PetFeeder.name());
    let _ = on(binder, Some(&main), switch);

    match binder.schema(LIGHT) {
        Some(light) => {
            let _ = on(binder, None, light);
        }
        None => warn!("Light is not supported."),
    }

    for trigger in TRIGGERS {
        let Some(schema) = binder.schema(trigger.aliases) else {
            warn!("{} is not supported.", trigger.feature);
            continue;
        };
        let service = binder.service(ServiceKind::Switch, Some(schema.code.as_str()), &schema.code);
        momentary_trigger(binder, &service, schema, trigger.pulse.value());
    }

    match binder.schema(BATTERY_PERCENTAGE) {
        Some(battery) => {
            read_only_percent(binder, &main, CharacteristicKind::BatteryLevel, battery);
        }
        None => warn!("Battery percentage is not supported."),
    }

    let report = binder.schema(FEED_REPORT);
    if report.is_none() {
        warn!("Feed report is not supported.");
    }
    let state = binder.schema(FEED_STATE);
    if state.is_none() {
        warn!("Feed state is not supported.");
    }
    if report.is_some() || state.is_some() {
        feeding(binder, &main, report, state);
    }
}

// `feed_state` decides whenever it is reported, `feed_report` otherwise.
fn feeding(
    binder: &mut Binder<'_>,
    service: &ServiceId,
    report: Option<&SchemaDescriptor>,
    state: Option<&SchemaDescriptor>,
) {
    let codes = [report, state]
        .into_iter()
        .flatten()
        .map(|schema| schema.code.as_str())
        .collect::<Vec<&str>>();
    let report = report.map(|schema| schema.code.clone());
    let state = state.map(|schema| schema.code.clone());

    binder.props(service, CharacteristicKind::StatusActive, Props::BOOLEAN);
    binder.bind_read(
        service,
        CharacteristicKind::StatusActive,
        &codes,
        move |snapshot: &Snapshot<'_>| {
            if let Some(state) = &state
                && let Some(token) = snapshot.token(state)
            {
                return CharacteristicValue::Bool(token == FEEDING_STATE);
            }
            let reported = report
                .as_ref()
                .and_then(|report| snapshot.number(report))
                .is_some_and(|report| report != 0.);
            CharacteristicValue::Bool(reported)
        },
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dpkit::characteristic::{CharacteristicKind, CharacteristicValue};
    use dpkit::schema::{IntegerProperty, SchemaDescriptor};
    use dpkit::service::{ServiceId, ServiceKind};
    use dpkit::status::{Command, Status};

    use crate::accessory::Category;
    use crate::tests::{MockDevice, configured, init_tracing};

    fn main() -> ServiceId {
        ServiceId::primary(ServiceKind::Switch)
    }

    fn trigger(code: &str) -> ServiceId {
        ServiceId::with_subtype(ServiceKind::Switch, code)
    }

    fn feeder() -> MockDevice {
        MockDevice::new("cwwsq")
            .with_schema(SchemaDescriptor::boolean("switch"))
            .with_schema(SchemaDescriptor::boolean("quick_feed"))
            .with_schema(SchemaDescriptor::integer(
                "manual_feed",
                IntegerProperty::new(1, 12),
            ))
            .with_schema(SchemaDescriptor::boolean("meal_plan"))
            .with_schema(SchemaDescriptor::integer(
                "battery_percentage",
                IntegerProperty::new(0, 100),
            ))
            .with_schema(SchemaDescriptor::integer(
                "feed_report",
                IntegerProperty::new(0, 12),
            ))
            .with_schema(SchemaDescriptor::enumeration(
                "feed_state",
                ["standby", "feeding", "done"],
            ))
            .with_status("switch", true)
            .with_status("battery_percentage", 87)
            .with_status("feed_report", 2)
    }

    #[tokio::test]
    async fn test_independent_triggers() {
        init_tracing();

        let device = Arc::new(feeder());
        let accessory = configured(&device, Category::PetFeeder);

        // Slow feed and light are not declared.
        assert!(accessory.registry().get_service(&trigger("slow_feed")).is_none());
        assert!(accessory.registry().get_service(&trigger("light")).is_none());

        for code in ["quick_feed", "manual_feed", "meal_plan"] {
            accessory
                .write(&trigger(code), CharacteristicKind::On, false.into())
                .await
                .unwrap();
        }
        assert!(device.dispatches().is_empty());

        accessory
            .write(&trigger("manual_feed"), CharacteristicKind::On, true.into())
            .await
            .unwrap();
        accessory
            .write(&trigger("quick_feed"), CharacteristicKind::On, true.into())
            .await
            .unwrap();

        assert_eq!(
            device.dispatches(),
            [
                (vec![Command::new("manual_feed", 1)], false),
                (vec![Command::new("quick_feed", true)], false),
            ]
        );

        // The main switch still drives `switch`.
        accessory
            .write(&main(), CharacteristicKind::On, false.into())
            .await
            .unwrap();
        assert_eq!(
            device.dispatches().last(),
            Some(&(vec![Command::new("switch", false)], true))
        );
    }

    #[test]
    fn test_feeding_status() {
        let device = Arc::new(feeder());
        let accessory = configured(&device, Category::PetFeeder);

        assert_eq!(
            accessory.read(&main(), CharacteristicKind::BatteryLevel),
            Ok(CharacteristicValue::Int(87))
        );
        // Only the report is known.
        assert_eq!(
            accessory.read(&main(), CharacteristicKind::StatusActive),
            Ok(CharacteristicValue::Bool(true))
        );

        device.set_status("feed_state", "done");
        assert_eq!(
            accessory.read(&main(), CharacteristicKind::StatusActive),
            Ok(CharacteristicValue::Bool(false))
        );

        let updates = accessory.updates();
        assert_eq!(accessory.handle_update(&Status::new("feed_state", "feeding")), 1);
        let update = updates.try_recv().unwrap();
        assert_eq!(update.characteristic, CharacteristicKind::StatusActive);
        assert_eq!(update.value, CharacteristicValue::Bool(true));
    }

    #[test]
    fn test_light_switch() {
        let device = Arc::new(
            feeder()
                .with_schema(SchemaDescriptor::boolean("light"))
                .with_status("light", true),
        );
        let accessory = configured(&device, Category::PetFeeder);

        assert_eq!(
            accessory.read(&trigger("light"), CharacteristicKind::On),
            Ok(CharacteristicValue::Bool(true))
        );
        assert_eq!(
            accessory.read(&main(), CharacteristicKind::On),
            Ok(CharacteristicValue::Bool(true))
        );
    }
}

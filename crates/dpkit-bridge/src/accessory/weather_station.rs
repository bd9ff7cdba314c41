use dpkit::characteristic::CharacteristicKind;
use dpkit::service::ServiceKind;

use tracing::{debug, warn};

use crate::binder::Binder;
use crate::characteristics::read_only_number;

const TEMPERATURE_MARKER: &str = "ToutCh";
const HUMIDITY_MARKER: &str = "HoutCh";

const HUMIDITY_RANGE: (f64, f64) = (0., 100.);

pub(crate) fn configure(binder: &mut Binder<'_>) {
    let temperatures = binder.matching(|schema| schema.code.contains(TEMPERATURE_MARKER));
    let humidities = binder.matching(|schema| {
        !schema.code.contains(TEMPERATURE_MARKER) && schema.code.contains(HUMIDITY_MARKER)
    });

    if temperatures.is_empty() && humidities.is_empty() {
        warn!("No sensor channels found for device `{}`", binder.device_id());
        return;
    }

    let temperature_range = binder.options().temperature_range;
    for (index, schema) in temperatures.into_iter().enumerate() {
        let number = index + 1;
        let subtype = format!("temperature_sensor_{number}");
        let service = binder.service(
            ServiceKind::TemperatureSensor,
            Some(subtype.as_str()),
            &format!("Temperature Sensor {number}"),
        );
        read_only_number(
            binder,
            &service,
            CharacteristicKind::CurrentTemperature,
            schema,
            temperature_range,
        );
    }

    for (index, schema) in humidities.into_iter().enumerate() {
        let number = index + 1;
        let subtype = format!("humidity_sensor_{number}");
        let service = binder.service(
            ServiceKind::HumiditySensor,
            Some(subtype.as_str()),
            &format!("Humidity Sensor {number}"),
        );
        read_only_number(
            binder,
            &service,
            CharacteristicKind::CurrentRelativeHumidity,
            schema,
            HUMIDITY_RANGE,
        );
    }

    debug!("Configure sensor channels of device `{}`", binder.device_id());
}

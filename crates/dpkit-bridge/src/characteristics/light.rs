use std::sync::Arc;

use dpkit::characteristic::{CharacteristicKind, CharacteristicValue, Props};
use dpkit::schema::{IntegerProperty, SchemaDescriptor};
use dpkit::service::ServiceId;
use dpkit::status::Command;

use crate::binder::Binder;
use crate::device::Snapshot;
use crate::translate::{
    ColourData, ColourRange, MIRED_MAX, MIRED_MIN, limit, mired_to_raw, raw_to_mired, remap,
};

const WHITE_MODE: &str = "white";
const COLOUR_MODE: &str = "colour";

/// The codes backing a tunable light.
#[derive(Debug, Clone, Copy)]
pub struct LightSchemas<'a> {
    /// On/off code.
    pub on: &'a SchemaDescriptor,
    /// White brightness code.
    pub bright: Option<&'a SchemaDescriptor>,
    /// Color temperature code.
    pub temp: Option<&'a SchemaDescriptor>,
    /// Colour code.
    pub colour: Option<&'a SchemaDescriptor>,
    /// Work mode code, switching between white and colour.
    pub mode: Option<&'a SchemaDescriptor>,
}

struct Colour {
    code: String,
    range: ColourRange,
}

impl Colour {
    fn new(schema: &SchemaDescriptor) -> Self {
        Self {
            code: schema.code.clone(),
            range: ColourRange::from_property(schema.json_property()),
        }
    }

    fn read(&self, snapshot: &Snapshot<'_>) -> ColourData {
        snapshot
            .value(&self.code)
            .and_then(|value| ColourData::parse(&value))
            .unwrap_or_default()
    }

    // An absent colour is merged into a fully saturated and bright one.
    fn current(&self, snapshot: &Snapshot<'_>) -> ColourData {
        snapshot
            .value(&self.code)
            .and_then(|value| ColourData::parse(&value))
            .unwrap_or(ColourData {
                h: 0.,
                s: self.range.s_max,
                v: self.range.v_max,
            })
    }

    fn commands(&self, mode: Option<&str>, colour: ColourData) -> Vec<Command> {
        let mut commands = Vec::with_capacity(2);
        if let Some(mode) = mode {
            commands.push(Command::new(mode, COLOUR_MODE));
        }
        commands.push(Command::new(self.code.as_str(), colour.to_value()));
        commands
    }
}

fn in_colour_mode(snapshot: &Snapshot<'_>, mode: Option<&str>) -> bool {
    mode.is_some_and(|mode| snapshot.token(mode).as_deref() == Some(COLOUR_MODE))
}

/// Binds a tunable light to a service.
///
/// `On` is always bound. `Brightness` is bound when either a white
/// brightness or a colour code exists: in colour mode, or without a white
/// brightness code, it drives the value channel of the colour.
/// `ColorTemperature` is bound to the temperature code, while `Hue` and
/// `Saturation` are bound to the colour code.
pub fn light(binder: &mut Binder<'_>, service: &ServiceId, schemas: &LightSchemas<'_>) {
    let _ = super::on(binder, Some(service), schemas.on);

    let mode = schemas.mode.map(|schema| schema.code.clone());
    let colour = schemas.colour.map(|schema| Arc::new(Colour::new(schema)));

    if schemas.bright.is_some() || colour.is_some() {
        brightness(binder, service, schemas.bright, colour.clone(), mode.clone());
    }

    if let Some(temp) = schemas.temp {
        color_temperature(binder, service, temp, mode.clone());
    }

    if let Some(colour) = colour {
        hue(binder, service, Arc::clone(&colour), mode.clone());
        saturation(binder, service, colour, mode);
    }
}

fn codes<'a>(codes: &[Option<&'a str>]) -> Vec<&'a str> {
    codes.iter().flatten().copied().collect()
}

fn brightness(
    binder: &mut Binder<'_>,
    service: &ServiceId,
    bright: Option<&SchemaDescriptor>,
    colour: Option<Arc<Colour>>,
    mode: Option<String>,
) {
    let bright = bright.map(|schema| {
        (
            schema.code.clone(),
            schema.integer_property().cloned().unwrap_or_default(),
        )
    });
    let subscribed = codes(&[
        bright.as_ref().map(|(code, _)| code.as_str()),
        colour.as_ref().map(|colour| colour.code.as_str()),
        mode.as_deref(),
    ]);

    // Colour drives brightness in colour mode, or when it is the only source.
    let colour_path = {
        let has_bright = bright.is_some();
        move |snapshot: &Snapshot<'_>, mode: Option<&str>| {
            !has_bright || in_colour_mode(snapshot, mode)
        }
    };

    binder.props(service, CharacteristicKind::Brightness, Props::PERCENTAGE);
    binder.bind_read(service, CharacteristicKind::Brightness, &subscribed, {
        let bright = bright.clone();
        let colour = colour.clone();
        let mode = mode.clone();
        move |snapshot| {
            if let Some(colour) = &colour
                && colour_path(snapshot, mode.as_deref())
            {
                return CharacteristicValue::Int(colour.range.brightness(&colour.read(snapshot)));
            }
            let Some((code, property)) = &bright else {
                return CharacteristicValue::Int(0);
            };
            let raw = snapshot.number(code).unwrap_or(property.min as f64);
            let percent = remap(raw, (property.min as f64, property.max as f64), (0., 100.));
            CharacteristicValue::Int(limit(percent.round(), 0., 100.) as i64)
        }
    });
    binder.bind_write(
        service,
        CharacteristicKind::Brightness,
        true,
        move |snapshot, value| {
            if let Some(colour) = &colour
                && colour_path(snapshot, mode.as_deref())
            {
                let mut current = colour.current(snapshot);
                current.v = colour.range.device_value(value.as_f64());
                return Some(vec![Command::new(colour.code.as_str(), current.to_value())]);
            }
            let (code, property) = bright.as_ref()?;
            Some(vec![Command::new(code.as_str(), bright_raw(value.as_f64(), property))])
        },
    );
}

fn bright_raw(percent: f64, property: &IntegerProperty) -> i64 {
    let raw = remap(
        limit(percent, 0., 100.),
        (0., 100.),
        (property.min as f64, property.max as f64),
    )
    .round() as i64;
    raw.max(property.min).min(property.max)
}

fn color_temperature(
    binder: &mut Binder<'_>,
    service: &ServiceId,
    schema: &SchemaDescriptor,
    mode: Option<String>,
) {
    let code = schema.code.clone();
    let property = schema.integer_property().cloned().unwrap_or_default();

    binder.props(
        service,
        CharacteristicKind::ColorTemperature,
        Props::new(MIRED_MIN, MIRED_MAX, 1.),
    );
    binder.bind_read(service, CharacteristicKind::ColorTemperature, &[code.as_str()], {
        let code = code.clone();
        let property = property.clone();
        move |snapshot| {
            let mired = snapshot
                .number(&code)
                .map_or(MIRED_MIN as i64, |raw| raw_to_mired(raw, &property));
            CharacteristicValue::Int(mired)
        }
    });
    binder.bind_write(
        service,
        CharacteristicKind::ColorTemperature,
        true,
        move |_, value| {
            let mut commands = Vec::with_capacity(2);
            if let Some(mode) = &mode {
                commands.push(Command::new(mode.as_str(), WHITE_MODE));
            }
            commands.push(Command::new(
                code.as_str(),
                mired_to_raw(value.as_f64(), &property),
            ));
            Some(commands)
        },
    );
}

fn hue(binder: &mut Binder<'_>, service: &ServiceId, colour: Arc<Colour>, mode: Option<String>) {
    binder.props(
        service,
        CharacteristicKind::Hue,
        CharacteristicKind::Hue.default_props(),
    );
    binder.bind_read(service, CharacteristicKind::Hue, &[colour.code.as_str()], {
        let colour = Arc::clone(&colour);
        move |snapshot| {
            CharacteristicValue::Int(limit(colour.read(snapshot).h.round(), 0., 360.) as i64)
        }
    });
    binder.bind_write(service, CharacteristicKind::Hue, true, move |snapshot, value| {
        let mut current = colour.current(snapshot);
        current.h = limit(value.as_f64(), 0., 360.);
        Some(colour.commands(mode.as_deref(), current))
    });
}

fn saturation(
    binder: &mut Binder<'_>,
    service: &ServiceId,
    colour: Arc<Colour>,
    mode: Option<String>,
) {
    binder.props(service, CharacteristicKind::Saturation, Props::PERCENTAGE);
    binder.bind_read(service, CharacteristicKind::Saturation, &[colour.code.as_str()], {
        let colour = Arc::clone(&colour);
        move |snapshot| CharacteristicValue::Int(colour.range.saturation(&colour.read(snapshot)))
    });
    binder.bind_write(
        service,
        CharacteristicKind::Saturation,
        true,
        move |snapshot, value| {
            let mut current = colour.current(snapshot);
            current.s = colour.range.device_saturation(value.as_f64());
            Some(colour.commands(mode.as_deref(), current))
        },
    );
}

use std::sync::Arc;

use dpkit::characteristic::{CharacteristicKind, CharacteristicValue, PositionState, Props};
use dpkit::schema::SchemaDescriptor;
use dpkit::service::{ServiceId, ServiceKind};
use dpkit::status::Command;

use tracing::{debug, warn};

use crate::binder::Binder;
use crate::device::Snapshot;
use crate::resolver::FeatureAlias;
use crate::translate::{CoverDialect, coarse_position_or_midpoint, limit, percent};

const CURRENT_POSITION: FeatureAlias = &["percent_state"];
const CONTROL: FeatureAlias = &["control", "mach_operate"];

pub(crate) const REQUIRED: &[FeatureAlias] = &[CONTROL];

struct Channel {
    name: &'static str,
    control: FeatureAlias,
    percent: FeatureAlias,
}

const CHANNELS: [Channel; 2] = [
    Channel {
        name: "control",
        control: CONTROL,
        percent: &["percent_control", "position"],
    },
    Channel {
        name: "control_2",
        control: &["control_2", "mach_operate"],
        percent: &["percent_control_2", "position"],
    },
];

const SECOND_CHANNEL: &str = "control_2";

// The code backing the current position of a channel.
enum PositionSource {
    Percent(String),
    Token(String),
}

impl PositionSource {
    fn new(
        current: Option<&SchemaDescriptor>,
        percent: Option<&SchemaDescriptor>,
        control: &SchemaDescriptor,
    ) -> Self {
        match current.or(percent) {
            Some(schema) => Self::Percent(schema.code.clone()),
            None => Self::Token(control.code.clone()),
        }
    }

    fn code(&self) -> &str {
        match self {
            Self::Percent(code) | Self::Token(code) => code,
        }
    }

    fn read(&self, snapshot: &Snapshot<'_>) -> Option<i64> {
        match self {
            Self::Percent(code) => snapshot.value(code).and_then(|value| percent(&value)),
            Self::Token(code) => snapshot
                .token(code)
                .map(|token| coarse_position_or_midpoint(Some(&token), "current position")),
        }
    }

    const fn fallback(&self) -> i64 {
        match self {
            Self::Percent(_) => 0,
            Self::Token(_) => 50,
        }
    }
}

pub(crate) fn configure(binder: &mut Binder<'_>) {
    let amount = if binder.has(SECOND_CHANNEL) { 2 } else { 1 };
    debug!("Device `{}` has {amount} cover channels", binder.device_id());

    for channel in &CHANNELS[..amount] {
        let Some(control) = binder.schema(channel.control) else {
            warn!(
                "Skip channel `{}` of device `{}`: no control code",
                channel.name,
                binder.device_id()
            );
            continue;
        };

        let service = binder.service(ServiceKind::WindowCovering, Some(channel.name), channel.name);
        let target = binder.schema(channel.percent);
        let source = Arc::new(PositionSource::new(
            binder.schema(CURRENT_POSITION),
            target,
            control,
        ));

        current_position(binder, &service, Arc::clone(&source));
        position_state(binder, &service, source);

        match target {
            Some(target) => target_position_percent(binder, &service, target),
            None => target_position_control(binder, &service, control),
        }
    }
}

fn current_position(binder: &mut Binder<'_>, service: &ServiceId, source: Arc<PositionSource>) {
    let code = source.code().to_owned();

    binder.props(service, CharacteristicKind::CurrentPosition, Props::PERCENTAGE);
    binder.bind_read(
        service,
        CharacteristicKind::CurrentPosition,
        &[code.as_str()],
        move |snapshot| {
            CharacteristicValue::Int(
                source
                    .read(snapshot)
                    .unwrap_or_else(|| source.fallback()),
            )
        },
    );
}

// Pull reads and live updates sample the same tracker.
fn position_state(binder: &mut Binder<'_>, service: &ServiceId, source: Arc<PositionSource>) {
    let code = source.code().to_owned();
    let tracker = binder.tracker(service);

    binder.bind_read(
        service,
        CharacteristicKind::PositionState,
        &[code.as_str()],
        move |snapshot| {
            let state = source.read(snapshot).map_or(PositionState::Stopped, |position| {
                tracker.observe(position as f64).into()
            });
            state.into()
        },
    );
}

fn target_position_percent(binder: &mut Binder<'_>, service: &ServiceId, schema: &SchemaDescriptor) {
    let code = schema.code.clone();

    binder.props(service, CharacteristicKind::TargetPosition, Props::PERCENTAGE);
    binder.bind_read(service, CharacteristicKind::TargetPosition, &[code.as_str()], {
        let code = code.clone();
        move |snapshot| {
            let position = snapshot
                .value(&code)
                .and_then(|value| percent(&value))
                .unwrap_or(0);
            CharacteristicValue::Int(position)
        }
    });
    binder.bind_write(
        service,
        CharacteristicKind::TargetPosition,
        true,
        move |_, value| {
            let position = limit(value.as_f64().round(), 0., 100.) as i64;
            Some(vec![Command::new(code.as_str(), position)])
        },
    );
}

fn target_position_control(binder: &mut Binder<'_>, service: &ServiceId, schema: &SchemaDescriptor) {
    let code = schema.code.clone();
    let dialect = CoverDialect::detect(schema.enum_property());
    debug!("Control code `{code}` uses the {dialect:?} dialect");

    binder.props(
        service,
        CharacteristicKind::TargetPosition,
        Props::PERCENTAGE.step(50.),
    );
    binder.bind_read(service, CharacteristicKind::TargetPosition, &[code.as_str()], {
        let code = code.clone();
        move |snapshot| {
            let position =
                coarse_position_or_midpoint(snapshot.token(&code).as_deref(), "target position");
            CharacteristicValue::Int(position)
        }
    });
    binder.bind_write(
        service,
        CharacteristicKind::TargetPosition,
        true,
        move |_, value| {
            let token = dialect.command(value.as_f64().round() as i64);
            Some(vec![Command::new(code.as_str(), token)])
        },
    );
}

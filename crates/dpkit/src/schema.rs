use alloc::string::String;
use alloc::vec::Vec;

use log::warn;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema types.
///
/// Vendors spell the same type in different ways depending on the API
/// generation, so the lowercase and legacy spellings are accepted as well.
/// Opaque `Raw` data points are treated as [`SchemaType::String`] and
/// `Bitmap` data points as [`SchemaType::Json`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaType {
    /// A two-state value.
    #[serde(alias = "bool")]
    Boolean,
    /// An integer value with a decimal scale.
    #[serde(alias = "value")]
    Integer,
    /// One token out of an ordered set of tokens.
    #[serde(alias = "enum")]
    Enum,
    /// A free-form string.
    #[serde(alias = "string", alias = "Raw", alias = "raw")]
    String,
    /// A structured value.
    #[serde(alias = "json", alias = "Bitmap", alias = "bitmap")]
    Json,
}

impl SchemaType {
    const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Integer => "Integer",
            Self::Enum => "Enum",
            Self::String => "String",
            Self::Json => "Json",
        }
    }
}

impl core::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.name().fmt(f)
    }
}

const fn default_step() -> i64 {
    1
}

/// Metadata of an integer data point.
///
/// Raw values are integers: they must be divided by `10^scale` to obtain
/// engineering units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerProperty {
    /// Number of decimal digits encoded in a raw value.
    #[serde(default)]
    pub scale: u32,
    /// Minimum raw value.
    #[serde(default)]
    pub min: i64,
    /// Maximum raw value.
    #[serde(default)]
    pub max: i64,
    /// Raw step.
    #[serde(default = "default_step")]
    pub step: i64,
    /// Unit of measurement, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Default for IntegerProperty {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl IntegerProperty {
    /// Creates an [`IntegerProperty`] with the given raw bounds, no scale and
    /// a unitary step.
    #[must_use]
    pub const fn new(min: i64, max: i64) -> Self {
        Self {
            scale: 0,
            min,
            max,
            step: 1,
            unit: None,
        }
    }

    /// Sets the decimal scale.
    #[must_use]
    pub const fn scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the raw step.
    #[must_use]
    pub const fn step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    /// Sets the unit of measurement.
    #[must_use]
    #[inline]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Returns `10^scale`, the divisor that turns a raw value into
    /// engineering units.
    ///
    /// A scale too large to be represented saturates to [`i64::MAX`].
    #[must_use]
    pub const fn multiple(&self) -> i64 {
        match 10_i64.checked_pow(self.scale) {
            Some(multiple) => multiple,
            None => i64::MAX,
        }
    }

    /// Converts a raw value into engineering units, without clamping.
    #[must_use]
    pub const fn to_units(&self, raw: f64) -> f64 {
        raw / self.multiple() as f64
    }

    /// Returns the minimum value in engineering units.
    #[must_use]
    pub const fn min_units(&self) -> f64 {
        self.to_units(self.min as f64)
    }

    /// Returns the maximum value in engineering units.
    #[must_use]
    pub const fn max_units(&self) -> f64 {
        self.to_units(self.max as f64)
    }

    /// Returns the step in engineering units.
    #[must_use]
    pub const fn step_units(&self) -> f64 {
        self.to_units(self.step as f64)
    }
}

/// Metadata of an enumeration data point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumProperty {
    /// Allowed tokens, in the order declared by the device.
    #[serde(default)]
    pub range: Vec<String>,
}

impl EnumProperty {
    /// Creates an [`EnumProperty`] from a sequence of tokens.
    #[must_use]
    pub fn new<I, T>(range: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            range: range.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks whether the token belongs to the declared range.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.range.iter().any(|allowed| allowed == token)
    }

    /// Returns the position of the token inside the declared range.
    #[must_use]
    pub fn position(&self, token: &str) -> Option<usize> {
        self.range.iter().position(|allowed| allowed == token)
    }

    /// Returns the token at the given position.
    #[must_use]
    pub fn token(&self, index: usize) -> Option<&str> {
        self.range.get(index).map(String::as_str)
    }

    /// Returns the number of declared tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Checks whether no tokens are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Type-specific metadata of a schema code.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaProperty {
    /// A two-state value.
    Boolean,
    /// An integer value.
    Integer(IntegerProperty),
    /// An enumeration.
    Enum(EnumProperty),
    /// A free-form string.
    String,
    /// A structured value, its metadata is kept verbatim.
    Json(Value),
}

impl SchemaProperty {
    /// Returns the [`SchemaType`] of this property.
    #[must_use]
    pub const fn kind(&self) -> SchemaType {
        match self {
            Self::Boolean => SchemaType::Boolean,
            Self::Integer(_) => SchemaType::Integer,
            Self::Enum(_) => SchemaType::Enum,
            Self::String => SchemaType::String,
            Self::Json(_) => SchemaType::Json,
        }
    }
}

/// A single named data point of a device.
///
/// A descriptor is immutable once read from the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSchema", into = "RawSchema")]
pub struct SchemaDescriptor {
    /// Schema code.
    pub code: String,
    /// Type-specific metadata.
    pub property: SchemaProperty,
}

impl SchemaDescriptor {
    /// Creates a [`SchemaDescriptor`].
    #[must_use]
    #[inline]
    pub fn new(code: impl Into<String>, property: SchemaProperty) -> Self {
        Self {
            code: code.into(),
            property,
        }
    }

    /// Creates a boolean [`SchemaDescriptor`].
    #[must_use]
    #[inline]
    pub fn boolean(code: impl Into<String>) -> Self {
        Self::new(code, SchemaProperty::Boolean)
    }

    /// Creates an integer [`SchemaDescriptor`].
    #[must_use]
    #[inline]
    pub fn integer(code: impl Into<String>, property: IntegerProperty) -> Self {
        Self::new(code, SchemaProperty::Integer(property))
    }

    /// Creates an enumeration [`SchemaDescriptor`].
    #[must_use]
    #[inline]
    pub fn enumeration<I, T>(code: impl Into<String>, range: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::new(code, SchemaProperty::Enum(EnumProperty::new(range)))
    }

    /// Creates a string [`SchemaDescriptor`].
    #[must_use]
    #[inline]
    pub fn string(code: impl Into<String>) -> Self {
        Self::new(code, SchemaProperty::String)
    }

    /// Creates a structured [`SchemaDescriptor`].
    #[must_use]
    #[inline]
    pub fn json(code: impl Into<String>, property: Value) -> Self {
        Self::new(code, SchemaProperty::Json(property))
    }

    /// Returns the [`SchemaType`].
    #[must_use]
    pub const fn kind(&self) -> SchemaType {
        self.property.kind()
    }

    /// Returns the schema code as a [`&str`].
    #[must_use]
    #[inline]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the [`IntegerProperty`], if this is an integer data point.
    #[must_use]
    pub const fn integer_property(&self) -> Option<&IntegerProperty> {
        match &self.property {
            SchemaProperty::Integer(property) => Some(property),
            _ => None,
        }
    }

    /// Returns the [`EnumProperty`], if this is an enumeration data point.
    #[must_use]
    pub const fn enum_property(&self) -> Option<&EnumProperty> {
        match &self.property {
            SchemaProperty::Enum(property) => Some(property),
            _ => None,
        }
    }

    /// Returns the structured metadata, if this is a structured data point.
    #[must_use]
    pub const fn json_property(&self) -> Option<&Value> {
        match &self.property {
            SchemaProperty::Json(property) => Some(property),
            _ => None,
        }
    }
}

// The vendor wire shape: `{ "code", "type", "property" }`, where `property`
// may also arrive as a JSON-encoded string under the `values` key.
#[derive(Serialize, Deserialize)]
struct RawSchema {
    code: String,
    #[serde(rename = "type")]
    kind: SchemaType,
    #[serde(default, alias = "values")]
    property: Value,
}

fn parse_property<T: DeserializeOwned + Default>(code: &str, property: Value) -> T {
    serde_json::from_value(property).unwrap_or_else(|e| {
        warn!("Malformed property for schema code `{code}`, using defaults: {e}");
        T::default()
    })
}

impl From<RawSchema> for SchemaDescriptor {
    fn from(raw: RawSchema) -> Self {
        let RawSchema {
            code,
            kind,
            property,
        } = raw;

        let property = match property {
            Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::Null),
            property => property,
        };

        let property = match kind {
            SchemaType::Boolean => SchemaProperty::Boolean,
            SchemaType::Integer => SchemaProperty::Integer(parse_property(&code, property)),
            SchemaType::Enum => SchemaProperty::Enum(parse_property(&code, property)),
            SchemaType::String => SchemaProperty::String,
            SchemaType::Json => SchemaProperty::Json(property),
        };

        Self { code, property }
    }
}

impl From<SchemaDescriptor> for RawSchema {
    fn from(schema: SchemaDescriptor) -> Self {
        let kind = schema.kind();
        let property = match schema.property {
            SchemaProperty::Boolean | SchemaProperty::String => Value::Object(Default::default()),
            SchemaProperty::Integer(property) => {
                serde_json::to_value(property).unwrap_or(Value::Null)
            }
            SchemaProperty::Enum(property) => serde_json::to_value(property).unwrap_or(Value::Null),
            SchemaProperty::Json(property) => property,
        };

        Self {
            code: schema.code,
            kind,
            property,
        }
    }
}

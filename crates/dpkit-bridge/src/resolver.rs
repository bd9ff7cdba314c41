use dpkit::schema::{SchemaDescriptor, SchemaType};

/// An ordered list of synonymous schema codes.
///
/// Earlier codes have priority over later ones.
pub type FeatureAlias = &'static [&'static str];

/// A schema resolver.
///
/// It looks up features in the schema of a device through ordered aliases.
/// Hidden codes are invisible to every query, as if the device had never
/// reported them.
#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver<'a> {
    schemas: &'a [SchemaDescriptor],
    hidden: &'a [String],
}

impl<'a> SchemaResolver<'a> {
    /// Creates a [`SchemaResolver`] over a list of [`SchemaDescriptor`]s.
    #[must_use]
    pub const fn new(schemas: &'a [SchemaDescriptor]) -> Self {
        Self {
            schemas,
            hidden: &[],
        }
    }

    /// Hides a set of schema codes.
    #[must_use]
    pub const fn hidden(mut self, hidden: &'a [String]) -> Self {
        self.hidden = hidden;
        self
    }

    /// Resolves the first alias present in the schema.
    #[must_use]
    pub fn resolve(&self, aliases: &[&str]) -> Option<&'a SchemaDescriptor> {
        aliases.iter().find_map(|alias| self.find(alias))
    }

    /// Resolves the first alias present in the schema whose descriptor has
    /// the given [`SchemaType`].
    ///
    /// Aliases whose descriptor has a different type are skipped.
    #[must_use]
    pub fn resolve_typed(&self, aliases: &[&str], kind: SchemaType) -> Option<&'a SchemaDescriptor> {
        aliases
            .iter()
            .filter_map(|alias| self.find(alias))
            .find(|schema| schema.kind() == kind)
    }

    /// Checks whether a schema code is present.
    #[must_use]
    #[inline]
    pub fn contains(&self, code: &str) -> bool {
        self.find(code).is_some()
    }

    /// Returns all visible descriptors that satisfy a predicate, in schema
    /// order.
    pub fn matching<P>(&self, predicate: P) -> impl Iterator<Item = &'a SchemaDescriptor> + use<'a, P>
    where
        P: Fn(&SchemaDescriptor) -> bool,
    {
        let hidden = self.hidden;
        self.schemas
            .iter()
            .filter(move |schema| !hidden.iter().any(|code| *code == schema.code))
            .filter(move |schema| predicate(*schema))
    }

    fn find(&self, code: &str) -> Option<&'a SchemaDescriptor> {
        if self.hidden.iter().any(|hidden| hidden == code) {
            return None;
        }
        self.schemas.iter().find(|schema| schema.code == code)
    }
}

#[cfg(test)]
mod tests {
    use dpkit::schema::{IntegerProperty, SchemaDescriptor, SchemaType};

    use super::SchemaResolver;

    fn schemas() -> Vec<SchemaDescriptor> {
        vec![
            SchemaDescriptor::boolean("switch"),
            SchemaDescriptor::enumeration("speed", ["low", "middle", "high"]),
            SchemaDescriptor::integer("bright_value_v2", IntegerProperty::new(10, 1000)),
            SchemaDescriptor::integer("Temp_ToutCh1", IntegerProperty::new(-400, 800).scale(1)),
            SchemaDescriptor::integer("Temp_ToutCh2", IntegerProperty::new(-400, 800).scale(1)),
        ]
    }

    #[test]
    fn test_first_alias_wins() {
        let schemas = schemas();
        let resolver = SchemaResolver::new(&schemas);

        assert_eq!(
            resolver
                .resolve(&["bright_value", "bright_value_v2"])
                .map(SchemaDescriptor::code),
            Some("bright_value_v2")
        );
        assert_eq!(
            resolver.resolve(&["speed", "switch"]).map(SchemaDescriptor::code),
            Some("speed")
        );
        assert!(resolver.resolve(&["light", "switch_led"]).is_none());
        assert!(resolver.resolve(&[]).is_none());
    }

    #[test]
    fn test_typed_resolution() {
        let schemas = schemas();
        let resolver = SchemaResolver::new(&schemas);

        assert!(resolver.resolve_typed(&["speed"], SchemaType::Integer).is_none());
        assert_eq!(
            resolver
                .resolve_typed(&["fan_speed_enum", "speed"], SchemaType::Enum)
                .map(SchemaDescriptor::code),
            Some("speed")
        );
    }

    #[test]
    fn test_hidden_codes() {
        let schemas = schemas();
        let hidden = vec![String::from("speed"), String::from("Temp_ToutCh2")];
        let resolver = SchemaResolver::new(&schemas).hidden(&hidden);

        assert!(resolver.resolve(&["speed"]).is_none());
        assert!(!resolver.contains("speed"));
        assert!(resolver.contains("switch"));
        assert_eq!(
            resolver
                .matching(|schema| schema.code.contains("ToutCh"))
                .map(SchemaDescriptor::code)
                .collect::<Vec<_>>(),
            ["Temp_ToutCh1"]
        );
    }
}

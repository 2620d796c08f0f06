use crate::fields::Fields;
use crate::keys;
use crate::level::Severity;

/// Destination for enriched events produced by a [`Logger`](crate::Logger).
///
/// Implementations merge, serialize and output one record per call. They
/// are shared by every logger bound to them, so they must tolerate
/// concurrent calls from any number of threads.
pub trait Writer: Send + Sync {
    /// Serialize and (if enabled) output one record.
    ///
    /// **Parameters**
    /// - `severity`: severity of the event, used for level gating.
    /// - `system`: enriched system fields, emitted at the top level.
    /// - `properties`: caller property sets, merged right-biased and nested
    ///   under `properties` when non-empty.
    ///
    /// **Returns**
    /// - The serialized JSON line, whether or not it was written.
    fn write_fields(&self, severity: Severity, system: Fields, properties: &[Fields]) -> String;

    /// `true` if events of `severity` pass the configured threshold.
    ///
    /// Callers can use this to skip building expensive fields.
    fn is_enabled(&self, severity: Severity) -> bool;
}

/// Combine system and property fields into the final JSON record.
///
/// Property sets are merged with later sets winning, nested under
/// `properties` if anything remains, then every key is snake_cased.
pub fn render_record(mut system: Fields, properties: &[Fields], omit_empty: bool) -> String {
    let merged = Fields::new().merge(properties);
    if !merged.is_empty() {
        system.insert(keys::PROPERTIES, merged);
    }
    system.to_snake_case().to_json(omit_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;

    #[test]
    fn property_sets_nest_right_biased() {
        let json = render_record(
            fields! { "event" => "e" },
            &[fields! { "a" => 1 }, fields! { "a" => 2, "b" => 3 }],
            false,
        );
        assert_eq!(json, r#"{"event":"e","properties":{"a":2,"b":3}}"#);
    }

    #[test]
    fn no_property_sets_means_no_properties_key() {
        let json = render_record(fields! { "event" => "e" }, &[], false);
        assert_eq!(json, r#"{"event":"e"}"#);

        let json = render_record(fields! { "event" => "e" }, &[Fields::new()], false);
        assert!(!json.contains("properties"));
    }

    #[test]
    fn keys_are_snake_cased_after_nesting() {
        let json = render_record(
            fields! { "EventName" => "e" },
            &[fields! { "userId" => 7 }],
            false,
        );
        assert_eq!(json, r#"{"event_name":"e","properties":{"user_id":7}}"#);
    }
}

//! Normalization boundary for date-like wire values.
//!
//! Stored documents have accumulated several timestamp shapes over time:
//! RFC 3339 strings, numeric epochs (seconds or milliseconds), and
//! document-store timestamp objects of the form
//! `{"seconds": 1700000000, "nanoseconds": 0}`. Everything is converted to
//! a single `DateTime<Utc>` here, before any other module sees it.
//! Values that cannot be read resolve to the Unix epoch rather than
//! failing the whole document.

use chrono::{DateTime, Utc};

/// Numeric epochs at or above this magnitude are read as milliseconds.
/// (10^11 seconds is the year 5138; no real second-resolution timestamp
/// gets that large.)
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

pub fn from_epoch_number(value: i64) -> DateTime<Utc> {
    let normalized = if value.abs() >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    };
    normalized.unwrap_or(DateTime::UNIX_EPOCH)
}

pub fn from_date_str(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

pub mod wire_date_serde {
    use std::fmt;

    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::{IgnoredAny, MapAccess, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(WireDateVisitor)
    }

    struct WireDateVisitor;

    impl<'de> Visitor<'de> for WireDateVisitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an RFC 3339 string, a numeric epoch, or a timestamp object")
        }

        fn visit_str<E>(self, raw: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(super::from_date_str(raw))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(super::from_epoch_number(value))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(super::from_epoch_number(i64::try_from(value).unwrap_or(i64::MAX)))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(super::from_epoch_number(value as i64))
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut seconds: Option<i64> = None;
            let mut nanoseconds: u32 = 0;

            while let Some(key) = map.next_key::<String>()? {
                match key.as_str() {
                    "seconds" => seconds = Some(map.next_value()?),
                    "nanoseconds" => nanoseconds = map.next_value()?,
                    _ => {
                        let _: IgnoredAny = map.next_value()?;
                    }
                }
            }

            let dt = seconds
                .and_then(|secs| Utc.timestamp_opt(secs, nanoseconds).single())
                .unwrap_or(DateTime::UNIX_EPOCH);
            Ok(dt)
        }
    }

    pub mod option {
        use std::fmt;

        use chrono::{DateTime, Utc};
        use serde::de::Visitor;
        use serde::{Deserializer, Serializer};

        pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match dt {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_option(OptionalWireDateVisitor)
        }

        struct OptionalWireDateVisitor;

        impl<'de> Visitor<'de> for OptionalWireDateVisitor {
            type Value = Option<DateTime<Utc>>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an optional wire timestamp")
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(None)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(None)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                super::deserialize(deserializer).map(Some)
            }
        }
    }
}

//! Drink record codec.
//!
//! The tag carries a UTF-8 JSON object with the fields `drink_id`,
//! `alcohol_grams` and `timestamp`, in that order. Decoding never fails: a
//! payload that is not a JSON object is kept as an opaque drink id with the
//! configured default dose, and only an empty payload yields
//! [`DecodedTag::NoData`].

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::ndef;
use crate::error::ValidationError;
use crate::storage::config::TagConfig;

const UNKNOWN_DRINK_ID: &str = "unknown";
const ID_SUFFIX_LEN: usize = 6;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// One dispensed drink as written to a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrinkEvent {
    pub drink_id: String,
    pub alcohol_grams: f64,
    #[serde(rename = "timestamp")]
    pub issued_at: DateTime<Utc>,
}

impl DrinkEvent {
    /// Build an event, rejecting empty ids and non-positive doses.
    pub fn new(
        drink_id: impl Into<String>,
        alcohol_grams: f64,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let drink_id = drink_id.into();
        if drink_id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "drink_id".into(),
                message: "must not be empty".into(),
            });
        }
        if !alcohol_grams.is_finite() || alcohol_grams <= 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "alcohol_grams".into(),
                message: format!("must be a positive number, got {alcohol_grams}"),
            });
        }
        Ok(Self {
            drink_id,
            alcohol_grams,
            issued_at,
        })
    }

    /// Issue a fresh event at the bar with a `drink-<millis>-<suffix>` id.
    pub fn issue<R: Rng + ?Sized>(
        alcohol_grams: f64,
        issued_at: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Self, ValidationError> {
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        let drink_id = format!("drink-{}-{}", issued_at.timestamp_millis(), suffix);
        Self::new(drink_id, alcohol_grams, issued_at)
    }
}

/// Result of reading a tag payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedTag {
    /// The payload was a drink record.
    Structured(DrinkEvent),
    /// The payload was foreign or corrupted; the id is the raw content.
    Degraded(DrinkEvent),
    /// Nothing usable on the tag.
    NoData,
}

impl DecodedTag {
    pub fn event(&self) -> Option<&DrinkEvent> {
        match self {
            DecodedTag::Structured(e) | DecodedTag::Degraded(e) => Some(e),
            DecodedTag::NoData => None,
        }
    }

    pub fn into_event(self) -> Option<DrinkEvent> {
        match self {
            DecodedTag::Structured(e) | DecodedTag::Degraded(e) => Some(e),
            DecodedTag::NoData => None,
        }
    }
}

/// Encoder/decoder for drink records, parameterized by the fallback policy.
#[derive(Debug, Clone)]
pub struct TagCodec {
    default_dose_grams: f64,
    fallback_id_max_chars: usize,
}

impl Default for TagCodec {
    fn default() -> Self {
        let config = TagConfig::default();
        Self {
            default_dose_grams: config.default_dose_grams,
            fallback_id_max_chars: config.fallback_id_max_chars,
        }
    }
}

impl TagCodec {
    /// Degraded decodes carry `default_dose_grams`, so it must itself be a
    /// valid dose.
    pub fn new(default_dose_grams: f64, fallback_id_max_chars: usize) -> Result<Self, ValidationError> {
        if !default_dose_grams.is_finite() || default_dose_grams <= 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "default_dose_grams".into(),
                message: format!("must be a positive number, got {default_dose_grams}"),
            });
        }
        Ok(Self {
            default_dose_grams,
            fallback_id_max_chars,
        })
    }

    pub fn from_config(config: &TagConfig) -> Result<Self, ValidationError> {
        Self::new(config.default_dose_grams, config.fallback_id_max_chars)
    }

    /// Serialize to the canonical JSON text.
    pub fn encode(event: &DrinkEvent) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(event)
    }

    /// Serialize and frame as an NDEF text record, ready to write.
    pub fn encode_record(event: &DrinkEvent) -> Result<Vec<u8>, serde_json::Error> {
        let json = serde_json::to_string(event)?;
        Ok(ndef::encode_text(&json))
    }

    /// Decode raw bytes read off a tag, unwrapping NDEF framing when present.
    pub fn decode_record(&self, raw: &[u8], received_at: DateTime<Utc>) -> DecodedTag {
        match ndef::decode_text(raw) {
            Ok(record) => self.decode(record.text.as_bytes(), received_at),
            Err(err) => {
                debug!(%err, "payload is not NDEF framed, decoding as raw text");
                self.decode(raw, received_at)
            }
        }
    }

    /// Decode a JSON text payload. `received_at` stands in for a missing
    /// or unreadable timestamp.
    pub fn decode(&self, raw: &[u8], received_at: DateTime<Utc>) -> DecodedTag {
        let text = String::from_utf8_lossy(raw);
        let trimmed = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
        if trimmed.is_empty() {
            return DecodedTag::NoData;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(fields)) => DecodedTag::Structured(self.from_fields(&fields, received_at)),
            _ => {
                let drink_id: String = trimmed.chars().take(self.fallback_id_max_chars).collect();
                warn!(%drink_id, "tag payload is not a drink record, using raw content as id");
                DecodedTag::Degraded(DrinkEvent {
                    drink_id: if drink_id.is_empty() {
                        UNKNOWN_DRINK_ID.to_string()
                    } else {
                        drink_id
                    },
                    alcohol_grams: self.default_dose_grams,
                    issued_at: received_at,
                })
            }
        }
    }

    fn from_fields(&self, fields: &Map<String, Value>, received_at: DateTime<Utc>) -> DrinkEvent {
        let drink_id = field(fields, "drink_id", "drinkId")
            .and_then(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| UNKNOWN_DRINK_ID.to_string());

        let alcohol_grams = field(fields, "alcohol_grams", "alcoholGrams")
            .and_then(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
            .filter(|g| g.is_finite() && *g > 0.0)
            .unwrap_or(self.default_dose_grams);

        // chrono's own deserializer also reads the `+YYYYYY` years its
        // serializer emits, which plain RFC 3339 parsing rejects.
        let issued_at = fields
            .get("timestamp")
            .filter(|v| v.is_string())
            .and_then(|v| DateTime::<Utc>::deserialize(v).ok())
            .unwrap_or(received_at);

        DrinkEvent {
            drink_id,
            alcohol_grams,
            issued_at,
        }
    }
}

fn field<'a>(fields: &'a Map<String, Value>, snake: &str, camel: &str) -> Option<&'a Value> {
    fields
        .get(snake)
        .filter(|v| !v.is_null())
        .or_else(|| fields.get(camel).filter(|v| !v.is_null()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 22, 15, 0).unwrap()
    }

    #[test]
    fn encode_uses_canonical_field_order() {
        let event = DrinkEvent::new("drink-1", 14.0, at()).unwrap();
        let text = String::from_utf8(TagCodec::encode(&event).unwrap()).unwrap();
        assert_eq!(
            text,
            r#"{"drink_id":"drink-1","alcohol_grams":14.0,"timestamp":"2026-03-14T22:15:00Z"}"#
        );
    }

    #[test]
    fn roundtrip_through_ndef() {
        let codec = TagCodec::default();
        let event = DrinkEvent::new("drink-2", 21.5, at()).unwrap();
        let raw = TagCodec::encode_record(&event).unwrap();
        assert_eq!(
            codec.decode_record(&raw, Utc::now()),
            DecodedTag::Structured(event)
        );
    }

    #[test]
    fn empty_and_blank_payloads_have_no_data() {
        let codec = TagCodec::default();
        assert_eq!(codec.decode(b"", at()), DecodedTag::NoData);
        assert_eq!(codec.decode(b"  \n\0\0", at()), DecodedTag::NoData);
        assert_eq!(codec.decode_record(&[], at()), DecodedTag::NoData);
    }

    #[test]
    fn camel_case_aliases_are_accepted() {
        let codec = TagCodec::default();
        let decoded = codec.decode(br#"{"drinkId":"abc","alcoholGrams":"10.5"}"#, at());
        let event = decoded.into_event().unwrap();
        assert_eq!(event.drink_id, "abc");
        assert_eq!(event.alcohol_grams, 10.5);
        assert_eq!(event.issued_at, at());
    }

    #[test]
    fn bad_dose_falls_back_to_default() {
        let codec = TagCodec::new(14.0, 32).unwrap();
        for payload in [
            &br#"{"drink_id":"a","alcohol_grams":0}"#[..],
            br#"{"drink_id":"a","alcohol_grams":-3}"#,
            br#"{"drink_id":"a","alcohol_grams":"lots"}"#,
            br#"{"drink_id":"a"}"#,
        ] {
            let event = codec.decode(payload, at()).into_event().unwrap();
            assert_eq!(event.alcohol_grams, 14.0);
        }
    }

    #[test]
    fn object_without_id_is_unknown() {
        let codec = TagCodec::default();
        let event = codec.decode(br#"{"alcohol_grams":7}"#, at()).into_event().unwrap();
        assert_eq!(event.drink_id, "unknown");
        assert_eq!(event.alcohol_grams, 7.0);
    }

    #[test]
    fn garbage_is_truncated_to_fallback_length() {
        let codec = TagCodec::new(14.0, 8).unwrap();
        let decoded = codec.decode(b"https://venue.example/promo/1234", at());
        assert_eq!(
            decoded,
            DecodedTag::Degraded(DrinkEvent {
                drink_id: "https://".into(),
                alcohol_grams: 14.0,
                issued_at: at(),
            })
        );
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let codec = TagCodec::new(14.0, 3).unwrap();
        let event = codec.decode("ßßßß".as_bytes(), at()).into_event().unwrap();
        assert_eq!(event.drink_id, "ßßß");
    }

    #[test]
    fn non_object_json_degrades() {
        let codec = TagCodec::default();
        assert!(matches!(codec.decode(b"null", at()), DecodedTag::Degraded(_)));
        assert!(matches!(codec.decode(b"[1,2]", at()), DecodedTag::Degraded(_)));
    }

    #[test]
    fn issued_ids_are_prefixed_and_valid() {
        let mut rng = rand_pcg::Pcg64::seed_from_u64(7);
        let event = DrinkEvent::issue(14.0, at(), &mut rng).unwrap();
        let expected_prefix = format!("drink-{}-", at().timestamp_millis());
        assert!(event.drink_id.starts_with(&expected_prefix));
        assert_eq!(event.drink_id.len(), expected_prefix.len() + 6);
    }

    #[test]
    fn codec_rejects_unusable_default_dose() {
        assert!(TagCodec::new(0.0, 32).is_err());
        assert!(TagCodec::new(-1.0, 32).is_err());
        assert!(TagCodec::new(f64::INFINITY, 32).is_err());
        let config = TagConfig {
            default_dose_grams: 0.0,
            ..TagConfig::default()
        };
        assert!(TagCodec::from_config(&config).is_err());
    }

    #[test]
    fn timestamps_beyond_year_9999_survive_roundtrip() {
        let codec = TagCodec::default();
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        let event = DrinkEvent::new("d1", 14.0, far).unwrap();
        let text = String::from_utf8(TagCodec::encode(&event).unwrap()).unwrap();
        assert!(text.contains("+10000-01-01T00:00:00Z"));
        assert_eq!(codec.decode(text.as_bytes(), at()), DecodedTag::Structured(event));
    }

    #[test]
    fn non_string_timestamp_uses_receive_time() {
        let codec = TagCodec::default();
        let event = codec
            .decode(br#"{"drink_id":"a","alcohol_grams":7,"timestamp":1700000000}"#, at())
            .into_event()
            .unwrap();
        assert_eq!(event.issued_at, at());
    }

    #[test]
    fn new_rejects_non_positive_dose() {
        assert!(DrinkEvent::new("a", 0.0, at()).is_err());
        assert!(DrinkEvent::new("a", f64::NAN, at()).is_err());
        assert!(DrinkEvent::new("", 14.0, at()).is_err());
    }
}

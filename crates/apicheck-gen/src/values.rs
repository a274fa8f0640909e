//! Leaf value heuristics.
//!
//! Every generator here honours the bounds declared on the field, so a
//! freshly generated leaf never violates its own descriptor.

use apicheck_core::{FieldSchema, FieldType, StringFormat};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{Number, Value};

const WORDS: &[&str] = &[
    "alpha", "amber", "arbor", "basil", "birch", "cedar", "civic", "delta", "ember", "fable",
    "focal", "grove", "harbor", "ivory", "jasper", "kestrel", "lumen", "maple", "nectar",
    "onyx", "pilot", "quartz", "raven", "sable", "tidal", "umber", "vivid", "willow", "zephyr",
];

/// 2024-01-01T00:00:00Z; generated timestamps fall within two years of it.
const EPOCH_2024: i64 = 1_704_067_200;
const TWO_YEARS_SECS: i64 = 2 * 365 * 24 * 60 * 60;

const DEFAULT_MAX_STRING: u64 = 24;
const DEFAULT_INTEGER_SPAN: i64 = 999;

/// A non-null value satisfying `field`'s own constraints. Object fields
/// with a nested schema are handled by the caller.
pub(crate) fn leaf(rng: &mut StdRng, field: &FieldSchema) -> Value {
    if let Some(choice) = pick_enum(rng, field) {
        return choice;
    }
    match field.field_type {
        FieldType::String => Value::String(string(rng, field)),
        FieldType::Integer => Value::from(integer(rng, field)),
        FieldType::Number => number(rng, field),
        FieldType::Boolean => Value::Bool(rng.gen_bool(0.5)),
        FieldType::Object => Value::Object(Default::default()),
        FieldType::Array => Value::Array(Vec::new()),
    }
}

fn pick_enum(rng: &mut StdRng, field: &FieldSchema) -> Option<Value> {
    let candidates: Vec<&Value> = field
        .enum_values
        .as_ref()?
        .iter()
        .filter(|v| !v.is_null())
        .collect();
    candidates.choose(rng).map(|v| (*v).clone())
}

pub(crate) fn word(rng: &mut StdRng) -> &'static str {
    WORDS.choose(rng).copied().unwrap_or("value")
}

fn string(rng: &mut StdRng, field: &FieldSchema) -> String {
    match field.format {
        Some(format) => formatted(rng, format),
        None => {
            let min = field.min_length.unwrap_or(1);
            let max = field
                .max_length
                .unwrap_or_else(|| DEFAULT_MAX_STRING.max(min + 8))
                .max(min);
            // Prefer short values; long-text fields still land in bounds.
            let ceiling = max.min(min.max(DEFAULT_MAX_STRING));
            let target = rng.gen_range(min..=ceiling) as usize;
            words_of_len(rng, target)
        }
    }
}

/// Space-separated words cut to exactly `len` ASCII characters.
pub(crate) fn words_of_len(rng: &mut StdRng, len: usize) -> String {
    let mut out = String::with_capacity(len + 8);
    while out.len() < len {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word(rng));
    }
    out.truncate(len);
    if out.ends_with(' ') {
        out.pop();
        out.push('s');
    }
    out
}

fn formatted(rng: &mut StdRng, format: StringFormat) -> String {
    match format {
        StringFormat::Email => format!("{}.{}{}@example.com", word(rng), word(rng), rng.gen_range(1..1000)),
        StringFormat::Uri => format!("https://files.example.com/{}/{}.pdf", word(rng), rng.gen_range(1..100_000)),
        StringFormat::DateTime => timestamp(rng).to_rfc3339_opts(SecondsFormat::Secs, true),
        StringFormat::Date => timestamp(rng).format("%Y-%m-%d").to_string(),
        StringFormat::Uuid => uuid::Builder::from_random_bytes(rng.gen()).into_uuid().to_string(),
        StringFormat::Ipv4 => format!(
            "{}.{}.{}.{}",
            rng.gen_range(1..=223),
            rng.gen_range(0..=255),
            rng.gen_range(0..=255),
            rng.gen_range(1..=254)
        ),
    }
}

fn timestamp(rng: &mut StdRng) -> DateTime<Utc> {
    let base = DateTime::from_timestamp(EPOCH_2024, 0).unwrap_or_default();
    base + Duration::seconds(rng.gen_range(0..TWO_YEARS_SECS))
}

fn integer(rng: &mut StdRng, field: &FieldSchema) -> i64 {
    let lo = field.minimum.map(|m| m.ceil() as i64).unwrap_or(1);
    let hi = field
        .maximum
        .map(|m| m.floor() as i64)
        .unwrap_or(lo.saturating_add(DEFAULT_INTEGER_SPAN))
        .max(lo);
    rng.gen_range(lo..=hi)
}

fn number(rng: &mut StdRng, field: &FieldSchema) -> Value {
    let lo = field.minimum.unwrap_or(1.0);
    let hi = field.maximum.unwrap_or(lo + DEFAULT_INTEGER_SPAN as f64).max(lo);
    let raw = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
    let rounded = ((raw * 100.0).round() / 100.0).clamp(lo, hi);
    Number::from_f64(rounded)
        .map(Value::Number)
        .unwrap_or_else(|| Value::from(lo as i64))
}

/// Number of array elements to emit.
pub(crate) fn item_count(rng: &mut StdRng, field: &FieldSchema) -> usize {
    let min = field.min_items.unwrap_or(1);
    let max = field.max_items.unwrap_or(min.max(3)).max(min);
    rng.gen_range(min..=max) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn strings_respect_length_bounds() {
        let mut rng = rng();
        let field = FieldSchema::string().with_min_length(10).with_max_length(12);
        for _ in 0..200 {
            let Value::String(s) = leaf(&mut rng, &field) else {
                panic!("expected string")
            };
            assert!((10..=12).contains(&s.len()), "{s:?}");
            assert!(!s.ends_with(' '));
        }
    }

    #[test]
    fn long_minimums_are_met() {
        let mut rng = rng();
        let field = FieldSchema::string().with_min_length(40);
        let Value::String(s) = leaf(&mut rng, &field) else {
            panic!("expected string")
        };
        assert!(s.len() >= 40);
    }

    #[test]
    fn formats_parse() {
        let mut rng = rng();
        let dt = formatted(&mut rng, StringFormat::DateTime);
        assert!(DateTime::parse_from_rfc3339(&dt).is_ok(), "{dt}");
        let date = formatted(&mut rng, StringFormat::Date);
        assert!(chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok(), "{date}");
        let id = formatted(&mut rng, StringFormat::Uuid);
        assert!(uuid::Uuid::parse_str(&id).is_ok(), "{id}");
        assert!(formatted(&mut rng, StringFormat::Email).contains('@'));
        assert!(formatted(&mut rng, StringFormat::Uri).starts_with("https://"));
        let ip = formatted(&mut rng, StringFormat::Ipv4);
        assert!(ip.parse::<std::net::Ipv4Addr>().is_ok(), "{ip}");
    }

    #[test]
    fn numbers_stay_in_range() {
        let mut rng = rng();
        let int_field = FieldSchema::integer().with_range(Some(10.0), Some(12.0));
        let num_field = FieldSchema::number().with_range(Some(1.0), Some(1.5));
        for _ in 0..200 {
            let i = leaf(&mut rng, &int_field).as_i64().unwrap();
            assert!((10..=12).contains(&i));
            let n = leaf(&mut rng, &num_field).as_f64().unwrap();
            assert!((1.0..=1.5).contains(&n));
        }
    }

    #[test]
    fn enums_never_yield_null() {
        let mut rng = rng();
        let field = FieldSchema::string().nullable().with_enum([Value::Null, Value::from("only")]);
        for _ in 0..20 {
            assert_eq!(leaf(&mut rng, &field), Value::from("only"));
        }
    }
}

//! core::transform
//!
//! Value transforms applied when a typed property is staged.
//!
//! A transform is looked up by the declared value type of an attribute or
//! relationship. The built-in transforms coerce loosely typed input (for
//! example text typed into a form field) into the declared type:
//!
//! | name      | input            | result                               |
//! |-----------|------------------|--------------------------------------|
//! | `string`  | any non-null     | `Text` rendering of the value        |
//! | `number`  | text, bool       | `Number`, or `Null` if not numeric   |
//! | `boolean` | any              | truthiness of the value              |
//! | `date`    | `YYYY-MM-DD` text| `Date`, or `Null` if unparseable     |
//!
//! `Null` passes through every transform except `boolean`, which maps it to
//! `false`.

use std::rc::Rc;

use chrono::{DateTime, NaiveDate};

use super::value::Value;

/// A named value coercion.
pub trait Transform {
    /// Name the transform is registered under.
    fn name(&self) -> &str;

    /// Coerce `value` into the transform's type.
    fn apply(&self, value: Value) -> Value;
}

/// Look up a built-in transform by name.
pub fn builtin(name: &str) -> Option<Rc<dyn Transform>> {
    match name {
        "string" => Some(Rc::new(StringTransform)),
        "number" => Some(Rc::new(NumberTransform)),
        "boolean" => Some(Rc::new(BooleanTransform)),
        "date" => Some(Rc::new(DateTransform)),
        _ => None,
    }
}

/// Names of the built-in transforms.
pub fn builtin_names() -> &'static [&'static str] {
    &["string", "number", "boolean", "date"]
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringTransform;

impl Transform for StringTransform {
    fn name(&self) -> &str {
        "string"
    }

    fn apply(&self, value: Value) -> Value {
        match value {
            Value::Null | Value::Text(_) => value,
            other => Value::Text(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NumberTransform;

impl Transform for NumberTransform {
    fn name(&self) -> &str {
        "number"
    }

    fn apply(&self, value: Value) -> Value {
        match value {
            Value::Number(n) if n.is_nan() => Value::Null,
            Value::Number(_) | Value::Null => value,
            Value::Bool(b) => Value::Number(if b { 1.0 } else { 0.0 }),
            Value::Text(s) => match s.trim() {
                "" => Value::Null,
                trimmed => trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|n| !n.is_nan())
                    .map_or(Value::Null, Value::Number),
            },
            _ => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanTransform;

impl Transform for BooleanTransform {
    fn name(&self) -> &str {
        "boolean"
    }

    fn apply(&self, value: Value) -> Value {
        let truthy = match &value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
            Value::Entity(e) => e.content().is_some(),
            Value::Date(_) | Value::Entities(_) => true,
        };
        Value::Bool(truthy)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DateTransform;

impl Transform for DateTransform {
    fn name(&self) -> &str {
        "date"
    }

    fn apply(&self, value: Value) -> Value {
        match value {
            Value::Date(_) | Value::Null => value,
            Value::Text(s) => parse_date(s.trim()).map_or(Value::Null, Value::Date),
            _ => Value::Null,
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup() {
        for name in builtin_names() {
            assert_eq!(builtin(name).unwrap().name(), *name);
        }
        assert!(builtin("person").is_none());
    }

    #[test]
    fn string_renders_scalars() {
        let t = StringTransform;
        assert_eq!(t.apply(Value::from(123)), Value::from("123"));
        assert_eq!(t.apply(Value::from(true)), Value::from("true"));
        assert_eq!(t.apply(Value::Null), Value::Null);
    }

    #[test]
    fn number_parses_text() {
        let t = NumberTransform;
        assert_eq!(t.apply(Value::from("2")), Value::Number(2.0));
        assert_eq!(t.apply(Value::from(" 2.5 ")), Value::Number(2.5));
        assert_eq!(t.apply(Value::from("")), Value::Null);
        assert_eq!(t.apply(Value::from("two")), Value::Null);
        assert_eq!(t.apply(Value::from(false)), Value::Number(0.0));
    }

    #[test]
    fn boolean_uses_truthiness() {
        let t = BooleanTransform;
        assert_eq!(t.apply(Value::from("not boolean")), Value::Bool(true));
        assert_eq!(t.apply(Value::from("")), Value::Bool(false));
        assert_eq!(t.apply(Value::from(0)), Value::Bool(false));
        assert_eq!(t.apply(Value::Null), Value::Bool(false));
    }

    #[test]
    fn date_parses_iso_forms() {
        let t = DateTransform;
        let expected = NaiveDate::from_ymd_opt(1990, 4, 12).unwrap();

        assert_eq!(t.apply(Value::from("1990-04-12")), Value::Date(expected));
        assert_eq!(
            t.apply(Value::from("1990-04-12T08:30:00Z")),
            Value::Date(expected)
        );
        assert_eq!(t.apply(Value::from("April")), Value::Null);
    }
}

//! Target schema model and structural re-validation of extracted items.
//!
//! A schema is the JSON document a job supplies: an object mapping field names
//! to `"string"`, `"number"`, `"boolean"`, `"datetime"` (or `"date"`), a nested
//! object, or a one-element array holding an object for repeating records.
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use gleaner_common::GleanerError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::sync::LazyLock;

// A space or no-break space only joins digit groups of exactly three, so
// "Pack of 6 12 oz" yields 6 while "1 299 kr" yields 1299.
static NUMBER_TOKEN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"-?\d{1,3}(?:[ \x{A0}]\d{3})+(?:[.,]\d+)?|-?\d[\d.,]*").ok()
});

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Datetime,
    Object(Schema),
    List(Schema),
}

impl FieldType {
    fn parse(path: &str, v: &Value) -> Result<Self, GleanerError> {
        match v {
            Value::String(name) => match name.as_str() {
                "string" => Ok(FieldType::String),
                "number" => Ok(FieldType::Number),
                "boolean" => Ok(FieldType::Boolean),
                "datetime" | "date" => Ok(FieldType::Datetime),
                other => Err(GleanerError::Config(format!(
                    "unknown field type '{other}' at '{path}'"
                ))),
            },
            Value::Object(_) => Ok(FieldType::Object(Schema::parse_at(path, v)?)),
            Value::Array(elems) => match elems.as_slice() {
                [elem @ Value::Object(_)] => Ok(FieldType::List(Schema::parse_at(path, elem)?)),
                _ => Err(GleanerError::Config(format!(
                    "list field '{path}' must hold exactly one object schema"
                ))),
            },
            other => Err(GleanerError::Config(format!(
                "field '{path}' has an invalid type declaration: {other}"
            ))),
        }
    }
}

/// Ordered field declarations plus the JSON they were parsed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Schema {
    fields: Vec<(String, FieldType)>,
    source: Value,
}

impl TryFrom<Value> for Schema {
    type Error = GleanerError;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        Schema::parse_at("", &v)
    }
}

impl From<Schema> for Value {
    fn from(schema: Schema) -> Self {
        schema.source
    }
}

impl Schema {
    fn parse_at(prefix: &str, v: &Value) -> Result<Self, GleanerError> {
        let obj = v.as_object().ok_or_else(|| {
            GleanerError::Config(format!(
                "schema at '{}' must be a JSON object",
                if prefix.is_empty() { "<root>" } else { prefix }
            ))
        })?;

        let mut fields = Vec::with_capacity(obj.len());
        for (name, decl) in obj {
            let path = join_path(prefix, name);
            fields.push((name.clone(), FieldType::parse(&path, decl)?));
        }
        Ok(Self {
            fields,
            source: v.clone(),
        })
    }

    pub fn fields(&self) -> &[(String, FieldType)] {
        &self.fields
    }

    /// The JSON document as the job supplied it.
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Schema of one extracted item: the element schema of the first list
    /// field, searched depth-first in field order through nested objects,
    /// else the whole schema.
    pub fn item_schema(&self) -> &Schema {
        self.first_list().unwrap_or(self)
    }

    fn first_list(&self) -> Option<&Schema> {
        self.fields.iter().find_map(|(_, ty)| match ty {
            FieldType::List(inner) => Some(inner),
            FieldType::Object(inner) => inner.first_list(),
            _ => None,
        })
    }

    /// Rebuild `value` so it has exactly the declared fields, in order, each
    /// coerced to its declared type or `null`.
    pub fn conform(&self, value: &Value) -> Value {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        let mut out = Map::with_capacity(self.fields.len());
        for (name, ty) in &self.fields {
            let coerced = obj.get(name).map(|v| coerce(ty, v)).unwrap_or(Value::Null);
            out.insert(name.clone(), coerced);
        }
        Value::Object(out)
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn coerce(ty: &FieldType, v: &Value) -> Value {
    if v.is_null() {
        return Value::Null;
    }
    match ty {
        FieldType::String => coerce_string(v),
        FieldType::Number => coerce_number(v),
        FieldType::Boolean => coerce_boolean(v),
        FieldType::Datetime => coerce_datetime(v),
        FieldType::Object(inner) if v.is_object() => inner.conform(v),
        FieldType::Object(_) => Value::Null,
        FieldType::List(inner) => match v {
            Value::Array(elems) => Value::Array(elems.iter().map(|e| inner.conform(e)).collect()),
            Value::Object(_) => Value::Array(vec![inner.conform(v)]),
            _ => Value::Null,
        },
    }
}

fn coerce_string(v: &Value) -> Value {
    match v {
        Value::String(_) => v.clone(),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        _ => Value::Null,
    }
}

fn coerce_number(v: &Value) -> Value {
    match v {
        Value::Number(_) => v.clone(),
        Value::String(s) => parse_number(s).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Parse the first numeric token of a display string such as `"$1,299.00"`
/// or `"12,50 €"`.
fn parse_number(raw: &str) -> Option<Value> {
    let token = NUMBER_TOKEN.as_ref()?.find(raw)?.as_str();
    let compact: String = token
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let compact = compact.trim_end_matches(['.', ',']);

    let normalized = match (compact.rfind('.'), compact.rfind(',')) {
        // Both present: whichever comes last is the decimal mark.
        (Some(dot), Some(comma)) if dot > comma => compact.replace(',', ""),
        (Some(_), Some(_)) => compact.replace('.', "").replace(',', "."),
        (None, Some(comma)) => {
            let decimals = compact.len() - comma - 1;
            if decimals == 3 || compact.matches(',').count() > 1 {
                compact.replace(',', "")
            } else {
                compact.replace(',', ".")
            }
        }
        (Some(_), None) if compact.matches('.').count() > 1 => compact.replace('.', ""),
        _ => compact.to_string(),
    };

    if !normalized.contains('.') {
        if let Ok(i) = normalized.parse::<i64>() {
            return Some(Value::Number(i.into()));
        }
    }
    let f = normalized.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

fn coerce_boolean(v: &Value) -> Value {
    match v {
        Value::Bool(_) => v.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => Value::Bool(false),
            Some(f) if f == 1.0 => Value::Bool(true),
            _ => Value::Null,
        },
        Value::String(s) => {
            let phrase = s.trim().to_lowercase();
            match phrase.as_str() {
                "true" | "yes" | "y" | "1" | "in stock" | "instock" | "available" => {
                    Value::Bool(true)
                }
                "false" | "no" | "n" | "0" | "out of stock" | "outofstock" | "sold out"
                | "unavailable" => Value::Bool(false),
                _ => Value::Null,
            }
        }
        _ => Value::Null,
    }
}

fn coerce_datetime(v: &Value) -> Value {
    match v.as_str().and_then(parse_datetime) {
        Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => Value::Null,
    }
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

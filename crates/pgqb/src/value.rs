//! Dynamic SQL values.
//!
//! [`Value`] is both the bind-parameter type of the builder and the cell type of
//! every decoded [`Record`]. It is deliberately JSON-shaped so rows can be
//! serialized without a schema.

use crate::record::Record;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::error::Error;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

/// A JSON-compatible SQL value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Map(Record),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in decode/bind error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self.clone())
    }
}

// ==================== Conversions ====================

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(v.into())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::String(v.to_string())
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Value {
    fn from(v: chrono::DateTime<chrono::Utc>) -> Self {
        Value::String(v.to_rfc3339())
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => Value::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            // NaN/inf have no JSON representation
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

// ==================== Binding (ToSql) ====================

fn is_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

fn is_json(ty: &Type) -> bool {
    matches!(*ty, Type::JSON | Type::JSONB)
}

fn is_enum(ty: &Type) -> bool {
    matches!(ty.kind(), Kind::Enum(_))
}

fn refuse(what: &str, ty: &Type) -> Result<IsNull, BoxError> {
    Err(format!("cannot bind {what} to column of type {ty}").into())
}

#[cfg(feature = "rust_decimal")]
fn bind_numeric(text: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    text.trim().parse::<rust_decimal::Decimal>()?.to_sql(ty, out)
}

#[cfg(not(feature = "rust_decimal"))]
fn bind_numeric(_text: &str, ty: &Type, _out: &mut BytesMut) -> Result<IsNull, BoxError> {
    Err(format!("binding to {ty} requires the `rust_decimal` feature").into())
}

fn bind_int(i: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(i)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(i)?.to_sql(ty, out),
        Type::OID => u32::try_from(i)?.to_sql(ty, out),
        Type::FLOAT4 => (i as f32).to_sql(ty, out),
        Type::FLOAT8 => (i as f64).to_sql(ty, out),
        Type::BOOL => (i != 0).to_sql(ty, out),
        Type::NUMERIC => bind_numeric(&i.to_string(), ty, out),
        _ if is_text(ty) => i.to_string().to_sql(ty, out),
        _ if is_json(ty) => serde_json::Value::from(i).to_sql(ty, out),
        _ if <i64 as ToSql>::accepts(ty) => i.to_sql(ty, out),
        _ => refuse("int", ty),
    }
}

fn bind_float(f: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (f as f32).to_sql(ty, out),
        // shortest round-trip text, so 9.99 stays 9.99 rather than its binary expansion
        Type::NUMERIC => bind_numeric(&f.to_string(), ty, out),
        _ if is_text(ty) => f.to_string().to_sql(ty, out),
        _ if is_json(ty) => Value::Float(f).to_json().to_sql(ty, out),
        _ if <f64 as ToSql>::accepts(ty) => f.to_sql(ty, out),
        _ => refuse("float", ty),
    }
}

fn bind_bool(b: bool, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if is_text(ty) {
        b.to_string().to_sql(ty, out)
    } else if is_json(ty) {
        serde_json::Value::Bool(b).to_sql(ty, out)
    } else if <bool as ToSql>::accepts(ty) {
        b.to_sql(ty, out)
    } else {
        refuse("bool", ty)
    }
}

/// Strings cover every type with a text form handled here. Types without a
/// binary mapping (`interval`, ranges, ...) need an explicit cast in the
/// fragment, e.g. `?::text::interval`.
fn bind_string(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => bind_int(s.trim().parse()?, ty, out),
        Type::FLOAT4 | Type::FLOAT8 => bind_float(s.trim().parse()?, ty, out),
        Type::NUMERIC => bind_numeric(s, ty, out),
        Type::UUID => uuid::Uuid::parse_str(s)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => chrono::DateTime::parse_from_rfc3339(s)?.to_sql(ty, out),
        Type::TIMESTAMP => chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))?
            .to_sql(ty, out),
        Type::DATE => s.parse::<chrono::NaiveDate>()?.to_sql(ty, out),
        // JSON columns take the text as a document when it parses, otherwise as a JSON string
        _ if is_json(ty) => serde_json::from_str::<serde_json::Value>(s)
            .unwrap_or_else(|_| serde_json::Value::String(s.to_string()))
            .to_sql(ty, out),
        // enum labels travel as their text
        _ if is_enum(ty) => {
            out.extend_from_slice(s.as_bytes());
            Ok(IsNull::No)
        }
        _ if <&str as ToSql>::accepts(ty) => s.to_sql(ty, out),
        _ => refuse("string", ty),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if let Kind::Domain(base) = ty.kind() {
            return self.to_sql(base, out);
        }

        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => bind_bool(*b, ty, out),
            Value::Int(i) => bind_int(*i, ty, out),
            Value::Float(f) => bind_float(*f, ty, out),
            Value::String(s) => bind_string(s, ty, out),
            Value::Array(items) => match ty.kind() {
                Kind::Array(_) => items.to_sql(ty, out),
                _ if is_json(ty) => self.to_json().to_sql(ty, out),
                _ => refuse("array", ty),
            },
            Value::Map(_) if is_json(ty) => self.to_json().to_sql(ty, out),
            Value::Map(_) => refuse("map", ty),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

// ==================== Decoding (FromSql) ====================

fn decode_bytes(raw: &[u8]) -> Result<Value, BoxError> {
    // Byte payloads are expected to carry a JSON document
    serde_json::from_slice::<serde_json::Value>(raw)
        .map(Value::from)
        .map_err(|e| format!("bytea is not a JSON document: {e}").into())
}

#[cfg(feature = "rust_decimal")]
fn decode_numeric(ty: &Type, raw: &[u8]) -> Result<Value, BoxError> {
    use rust_decimal::prelude::ToPrimitive;

    let d = rust_decimal::Decimal::from_sql(ty, raw)?;
    Ok(match d.to_f64() {
        Some(f) => Value::Float(f),
        None => Value::String(d.to_string()),
    })
}

#[cfg(not(feature = "rust_decimal"))]
fn decode_numeric(_ty: &Type, _raw: &[u8]) -> Result<Value, BoxError> {
    Err("numeric columns require the `rust_decimal` feature".into())
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        match ty.kind() {
            Kind::Array(_) => return Ok(Value::Array(Vec::<Value>::from_sql(ty, raw)?)),
            Kind::Domain(base) => return Value::from_sql(base, raw),
            Kind::Enum(_) => return Ok(Value::String(std::str::from_utf8(raw)?.to_string())),
            _ => {}
        }

        match *ty {
            Type::BOOL => Ok(Value::Bool(bool::from_sql(ty, raw)?)),
            Type::CHAR => Ok(Value::Int(i8::from_sql(ty, raw)?.into())),
            Type::INT2 => Ok(Value::Int(i16::from_sql(ty, raw)?.into())),
            Type::INT4 => Ok(Value::Int(i32::from_sql(ty, raw)?.into())),
            Type::INT8 => Ok(Value::Int(i64::from_sql(ty, raw)?)),
            Type::OID => Ok(Value::Int(u32::from_sql(ty, raw)?.into())),
            Type::FLOAT4 => Ok(Value::Float(f32::from_sql(ty, raw)?.into())),
            Type::FLOAT8 => Ok(Value::Float(f64::from_sql(ty, raw)?)),
            Type::NUMERIC => decode_numeric(ty, raw),
            Type::JSON | Type::JSONB => Ok(serde_json::Value::from_sql(ty, raw)?.into()),
            Type::UUID => Ok(uuid::Uuid::from_sql(ty, raw)?.into()),
            Type::TIMESTAMPTZ => Ok(chrono::DateTime::<chrono::Utc>::from_sql(ty, raw)?.into()),
            Type::TIMESTAMP => Ok(Value::String(
                chrono::NaiveDateTime::from_sql(ty, raw)?
                    .format("%Y-%m-%dT%H:%M:%S%.f")
                    .to_string(),
            )),
            Type::DATE => Ok(Value::String(chrono::NaiveDate::from_sql(ty, raw)?.to_string())),
            Type::TIME => Ok(Value::String(chrono::NaiveTime::from_sql(ty, raw)?.to_string())),
            Type::BYTEA => decode_bytes(raw),
            _ if <&str as FromSql>::accepts(ty) => Ok(Value::String(String::from_sql(ty, raw)?)),
            _ => Err(format!("unsupported column type {ty}").into()),
        }
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

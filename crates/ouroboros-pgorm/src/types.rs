//! Column types and runtime values.
//!
//! [`SqlType`] is the semantic type tag attached to every declared column.
//! [`SqlValue`] is the runtime value that flows into bound parameters and
//! out of fetched rows. Binding and extraction happen here so the rest of
//! the crate never touches `PgArguments` or `PgRow` directly.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use ipnetwork::IpNetwork;
use mac_address::MacAddress;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::postgres::types::{PgInterval, PgMoney};
use sqlx::postgres::{PgArguments, PgHasArrayType, PgRow, PgTypeInfo, PgTypeKind};
use sqlx::{Arguments, Column, Postgres, Row as SqlxRow, Type, TypeInfo};
use uuid::Uuid;

use crate::{OrmError, Result};

/// Semantic column type.
///
/// Built-in tags map to a fixed PostgreSQL type. `Enum` names a declared
/// enumeration (schema-qualified, e.g. `"public.mood"`) and `Custom` names a
/// tag registered on the [`TypeRegistry`](crate::TypeRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    SmallInt,
    Integer,
    BigInt,
    SmallSerial,
    Serial,
    BigSerial,
    Real,
    DoublePrecision,
    Numeric,
    Money,
    /// Fixed-length text, `CHARACTER(n)`
    Char(u32),
    /// Variable-length text with an optional limit
    VarChar(Option<u32>),
    Text,
    Bytea,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Interval,
    Boolean,
    Cidr,
    Inet,
    MacAddr,
    Uuid,
    Json,
    Jsonb,
    Enum(String),
    Array(Box<SqlType>),
    Custom(String),
}

impl SqlType {
    /// Shorthand for `SqlType::Array(Box::new(inner))`.
    pub fn array(inner: SqlType) -> Self {
        SqlType::Array(Box::new(inner))
    }

    /// Auto-incrementing integer types.
    pub fn is_serial(&self) -> bool {
        matches!(self, SqlType::SmallSerial | SqlType::Serial | SqlType::BigSerial)
    }

    /// DDL name for built-in tags. `None` for `Enum`, `Custom` and arrays,
    /// which are resolved through the registry.
    pub fn builtin_ddl_name(&self) -> Option<String> {
        let name = match self {
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::SmallSerial => "SMALLSERIAL".to_string(),
            SqlType::Serial => "SERIAL".to_string(),
            SqlType::BigSerial => "BIGSERIAL".to_string(),
            SqlType::Real => "REAL".to_string(),
            SqlType::DoublePrecision => "DOUBLE PRECISION".to_string(),
            SqlType::Numeric => "NUMERIC".to_string(),
            SqlType::Money => "MONEY".to_string(),
            SqlType::Char(n) => format!("CHARACTER({})", n),
            SqlType::VarChar(Some(n)) => format!("VARCHAR({})", n),
            SqlType::VarChar(None) => "VARCHAR".to_string(),
            SqlType::Text => "TEXT".to_string(),
            SqlType::Bytea => "BYTEA".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::TimestampTz => "TIMESTAMP WITH TIME ZONE".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::Interval => "INTERVAL".to_string(),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Cidr => "CIDR".to_string(),
            SqlType::Inet => "INET".to_string(),
            SqlType::MacAddr => "MACADDR".to_string(),
            SqlType::Uuid => "UUID".to_string(),
            SqlType::Json => "JSON".to_string(),
            SqlType::Jsonb => "JSONB".to_string(),
            SqlType::Enum(_) | SqlType::Array(_) | SqlType::Custom(_) => return None,
        };
        Some(name)
    }

    /// Value kinds a built-in column accepts.
    pub(crate) fn builtin_accepts(&self) -> &'static [ValueKind] {
        use ValueKind::*;
        match self {
            SqlType::SmallInt
            | SqlType::Integer
            | SqlType::BigInt
            | SqlType::SmallSerial
            | SqlType::Serial
            | SqlType::BigSerial => &[Integer],
            SqlType::Real | SqlType::DoublePrecision => &[Float, Integer],
            SqlType::Numeric | SqlType::Money => &[Decimal, Integer, Float],
            SqlType::Char(_) | SqlType::VarChar(_) | SqlType::Text => &[Text],
            SqlType::Bytea => &[Bytes],
            SqlType::Timestamp => &[Timestamp],
            SqlType::TimestampTz => &[TimestampTz],
            SqlType::Date => &[Date],
            SqlType::Time => &[Time],
            SqlType::Interval => &[Interval],
            SqlType::Boolean => &[Bool],
            SqlType::Cidr | SqlType::Inet => &[Network],
            SqlType::MacAddr => &[MacAddr],
            SqlType::Uuid => &[Uuid],
            SqlType::Json | SqlType::Jsonb => &[Json],
            SqlType::Enum(_) => &[Text],
            SqlType::Array(_) => &[Array],
            SqlType::Custom(_) => &[Text],
        }
    }
}

/// Coarse classification of a [`SqlValue`], used to check a value against
/// the column it is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Integer,
    Float,
    Decimal,
    Text,
    Bytes,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,
    Network,
    MacAddr,
    Json,
    Array,
}

/// A value bound to a statement or read back from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    /// Text, also used for enum labels
    String(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Interval(PgInterval),
    /// INET or CIDR
    Network(IpNetwork),
    MacAddr(MacAddress),
    Json(JsonValue),
    Array(Vec<SqlValue>),
}

impl SqlValue {
    /// Builds an array value from anything convertible to `SqlValue`.
    pub fn array<T, I>(items: I) -> Self
    where
        T: Into<SqlValue>,
        I: IntoIterator<Item = T>,
    {
        SqlValue::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Kind of this value, `None` for NULL.
    pub fn kind(&self) -> Option<ValueKind> {
        let kind = match self {
            SqlValue::Null => return None,
            SqlValue::Bool(_) => ValueKind::Bool,
            SqlValue::SmallInt(_) | SqlValue::Int(_) | SqlValue::BigInt(_) => ValueKind::Integer,
            SqlValue::Float(_) | SqlValue::Double(_) => ValueKind::Float,
            SqlValue::Decimal(_) => ValueKind::Decimal,
            SqlValue::String(_) => ValueKind::Text,
            SqlValue::Bytes(_) => ValueKind::Bytes,
            SqlValue::Uuid(_) => ValueKind::Uuid,
            SqlValue::Date(_) => ValueKind::Date,
            SqlValue::Time(_) => ValueKind::Time,
            SqlValue::Timestamp(_) => ValueKind::Timestamp,
            SqlValue::TimestampTz(_) => ValueKind::TimestampTz,
            SqlValue::Interval(_) => ValueKind::Interval,
            SqlValue::Network(_) => ValueKind::Network,
            SqlValue::MacAddr(_) => ValueKind::MacAddr,
            SqlValue::Json(_) => ValueKind::Json,
            SqlValue::Array(_) => ValueKind::Array,
        };
        Some(kind)
    }

    /// Binds this value as the next positional parameter.
    ///
    /// NULL is sent as untyped text; statement builders add an explicit cast
    /// to the column type wherever a NULL lands in a typed position.
    pub fn bind_to_arguments(&self, arguments: &mut PgArguments) -> Result<()> {
        match self {
            SqlValue::Null => add(arguments, Option::<String>::None, "NULL"),
            SqlValue::Bool(v) => add(arguments, *v, "BOOLEAN"),
            SqlValue::SmallInt(v) => add(arguments, *v, "SMALLINT"),
            SqlValue::Int(v) => add(arguments, *v, "INTEGER"),
            SqlValue::BigInt(v) => add(arguments, *v, "BIGINT"),
            SqlValue::Float(v) => add(arguments, *v, "REAL"),
            SqlValue::Double(v) => add(arguments, *v, "DOUBLE PRECISION"),
            SqlValue::Decimal(v) => add(arguments, *v, "NUMERIC"),
            SqlValue::String(v) => add(arguments, v.clone(), "TEXT"),
            SqlValue::Bytes(v) => add(arguments, v.clone(), "BYTEA"),
            SqlValue::Uuid(v) => add(arguments, *v, "UUID"),
            SqlValue::Date(v) => add(arguments, *v, "DATE"),
            SqlValue::Time(v) => add(arguments, *v, "TIME"),
            SqlValue::Timestamp(v) => add(arguments, *v, "TIMESTAMP"),
            SqlValue::TimestampTz(v) => add(arguments, *v, "TIMESTAMPTZ"),
            SqlValue::Interval(v) => add(arguments, *v, "INTERVAL"),
            SqlValue::Network(v) => add(arguments, *v, "INET"),
            SqlValue::MacAddr(v) => add(arguments, *v, "MACADDR"),
            SqlValue::Json(v) => add(arguments, v.clone(), "JSONB"),
            SqlValue::Array(values) => bind_array(values, arguments),
        }
    }

    /// JSON rendering used by [`Row::to_json`](crate::Row::to_json) and the
    /// JSON exporter.
    pub fn to_json(&self) -> JsonValue {
        match self {
            SqlValue::Null => JsonValue::Null,
            SqlValue::Bool(v) => JsonValue::Bool(*v),
            SqlValue::SmallInt(v) => JsonValue::from(*v),
            SqlValue::Int(v) => JsonValue::from(*v),
            SqlValue::BigInt(v) => JsonValue::from(*v),
            SqlValue::Float(v) => serde_json::Number::from_f64(*v as f64)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::Double(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::Decimal(v) => JsonValue::String(v.to_string()),
            SqlValue::String(v) => JsonValue::String(v.clone()),
            SqlValue::Bytes(v) => JsonValue::String(hex(v)),
            SqlValue::Uuid(v) => JsonValue::String(v.to_string()),
            SqlValue::Date(v) => JsonValue::String(v.to_string()),
            SqlValue::Time(v) => JsonValue::String(v.to_string()),
            SqlValue::Timestamp(v) => JsonValue::String(v.to_string()),
            SqlValue::TimestampTz(v) => JsonValue::String(v.to_rfc3339()),
            SqlValue::Interval(v) => serde_json::json!({
                "months": v.months,
                "days": v.days,
                "microseconds": v.microseconds,
            }),
            SqlValue::Network(v) => JsonValue::String(v.to_string()),
            SqlValue::MacAddr(v) => JsonValue::String(v.to_string()),
            SqlValue::Json(v) => v.clone(),
            SqlValue::Array(values) => JsonValue::Array(values.iter().map(SqlValue::to_json).collect()),
        }
    }

    /// Plain text rendering, empty for NULL. Used for CSV cells.
    pub fn to_text(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::String(v) => v.clone(),
            SqlValue::Interval(v) => format!(
                "{} mons {} days {} us",
                v.months, v.days, v.microseconds
            ),
            other => match other.to_json() {
                JsonValue::String(s) => s,
                json => json.to_string(),
            },
        }
    }
}

fn add<'q, T>(arguments: &mut PgArguments, value: T, type_name: &str) -> Result<()>
where
    T: sqlx::Encode<'q, Postgres> + Type<Postgres> + 'q,
{
    arguments
        .add(value)
        .map_err(|e| OrmError::Serialization(format!("Failed to bind {}: {}", type_name, e)))
}

/// Collects array elements of one kind, `None` if any element has another.
fn homogeneous<T>(values: &[SqlValue], pick: impl Fn(&SqlValue) -> Option<T>) -> Option<Vec<Option<T>>> {
    values
        .iter()
        .map(|v| match v {
            SqlValue::Null => Some(None),
            other => pick(other).map(Some),
        })
        .collect()
}

macro_rules! try_bind_array {
    ($values:expr, $arguments:expr, $variant:ident, $name:expr) => {
        if let Some(items) = homogeneous($values, |v| match v {
            SqlValue::$variant(x) => Some(x.clone()),
            _ => None,
        }) {
            return add($arguments, items, $name);
        }
    };
}

/// Homogeneous arrays bind as native PostgreSQL arrays; anything else falls
/// back to a JSONB array.
fn bind_array(values: &[SqlValue], arguments: &mut PgArguments) -> Result<()> {
    let first = values.iter().find(|v| !v.is_null());
    let Some(first) = first else {
        // Empty or all-NULL: send TEXT[]; placeholders for array columns carry a cast.
        let items: Vec<Option<String>> = values.iter().map(|_| None).collect();
        return add(arguments, items, "TEXT[]");
    };

    match first {
        SqlValue::Bool(_) => try_bind_array!(values, arguments, Bool, "BOOLEAN[]"),
        SqlValue::SmallInt(_) => try_bind_array!(values, arguments, SmallInt, "SMALLINT[]"),
        SqlValue::Int(_) => try_bind_array!(values, arguments, Int, "INTEGER[]"),
        SqlValue::BigInt(_) => try_bind_array!(values, arguments, BigInt, "BIGINT[]"),
        SqlValue::Float(_) => try_bind_array!(values, arguments, Float, "REAL[]"),
        SqlValue::Double(_) => try_bind_array!(values, arguments, Double, "DOUBLE PRECISION[]"),
        SqlValue::Decimal(_) => try_bind_array!(values, arguments, Decimal, "NUMERIC[]"),
        SqlValue::String(_) => try_bind_array!(values, arguments, String, "TEXT[]"),
        SqlValue::Uuid(_) => try_bind_array!(values, arguments, Uuid, "UUID[]"),
        SqlValue::Date(_) => try_bind_array!(values, arguments, Date, "DATE[]"),
        SqlValue::Timestamp(_) => try_bind_array!(values, arguments, Timestamp, "TIMESTAMP[]"),
        SqlValue::TimestampTz(_) => try_bind_array!(values, arguments, TimestampTz, "TIMESTAMPTZ[]"),
        SqlValue::Network(_) => try_bind_array!(values, arguments, Network, "INET[]"),
        SqlValue::Time(_) => try_bind_array!(values, arguments, Time, "TIME[]"),
        SqlValue::Bytes(_) => try_bind_array!(values, arguments, Bytes, "BYTEA[]"),
        SqlValue::Interval(_) => try_bind_array!(values, arguments, Interval, "INTERVAL[]"),
        SqlValue::MacAddr(_) => try_bind_array!(values, arguments, MacAddr, "MACADDR[]"),
        _ => {}
    }

    let json: Vec<JsonValue> = values.iter().map(SqlValue::to_json).collect();
    add(arguments, JsonValue::Array(json), "JSONB")
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Reads every column of a row, in result order.
///
/// Decode failures are driver errors and are returned unmodified.
pub fn row_to_values(row: &PgRow) -> Result<Vec<(String, SqlValue)>> {
    let mut columns = Vec::with_capacity(row.columns().len());

    for (idx, column) in row.columns().iter().enumerate() {
        let column_name = column.name().to_string();
        let type_name = column.type_info().name();

        let value = match type_name {
            "BOOL" => decode(row, idx, SqlValue::Bool)?,
            "INT2" => decode(row, idx, SqlValue::SmallInt)?,
            "INT4" => decode(row, idx, SqlValue::Int)?,
            "INT8" => decode(row, idx, SqlValue::BigInt)?,
            "FLOAT4" => decode(row, idx, SqlValue::Float)?,
            "FLOAT8" => decode(row, idx, SqlValue::Double)?,
            "NUMERIC" => decode(row, idx, SqlValue::Decimal)?,
            "MONEY" => decode(row, idx, |m: PgMoney| SqlValue::Decimal(m.to_decimal(2)))?,
            "VARCHAR" | "TEXT" | "BPCHAR" | "NAME" => decode(row, idx, SqlValue::String)?,
            "BYTEA" => decode(row, idx, SqlValue::Bytes)?,
            "UUID" => decode(row, idx, SqlValue::Uuid)?,
            "DATE" => decode(row, idx, SqlValue::Date)?,
            "TIME" => decode(row, idx, SqlValue::Time)?,
            "TIMESTAMP" => decode(row, idx, SqlValue::Timestamp)?,
            "TIMESTAMPTZ" => decode(row, idx, SqlValue::TimestampTz)?,
            "INTERVAL" => decode(row, idx, SqlValue::Interval)?,
            "INET" | "CIDR" => decode(row, idx, SqlValue::Network)?,
            "MACADDR" => decode(row, idx, SqlValue::MacAddr)?,
            "JSON" | "JSONB" => decode(row, idx, SqlValue::Json)?,
            "_BOOL" => decode_array(row, idx, SqlValue::Bool)?,
            "_INT2" => decode_array(row, idx, SqlValue::SmallInt)?,
            "_INT4" => decode_array(row, idx, SqlValue::Int)?,
            "_INT8" => decode_array(row, idx, SqlValue::BigInt)?,
            "_FLOAT4" => decode_array(row, idx, SqlValue::Float)?,
            "_FLOAT8" => decode_array(row, idx, SqlValue::Double)?,
            "_NUMERIC" => decode_array(row, idx, SqlValue::Decimal)?,
            "_TEXT" | "_VARCHAR" | "_BPCHAR" => decode_array(row, idx, SqlValue::String)?,
            "_UUID" => decode_array(row, idx, SqlValue::Uuid)?,
            "_DATE" => decode_array(row, idx, SqlValue::Date)?,
            "_TIMESTAMP" => decode_array(row, idx, SqlValue::Timestamp)?,
            "_TIMESTAMPTZ" => decode_array(row, idx, SqlValue::TimestampTz)?,
            "_INET" | "_CIDR" => decode_array(row, idx, SqlValue::Network)?,
            "_JSONB" | "_JSON" => decode_array(row, idx, SqlValue::Json)?,
            "_TIME" => decode_array(row, idx, SqlValue::Time)?,
            "_BYTEA" => decode_array(row, idx, SqlValue::Bytes)?,
            "_INTERVAL" => decode_array(row, idx, SqlValue::Interval)?,
            "_MACADDR" => decode_array(row, idx, SqlValue::MacAddr)?,
            _ if is_enum_array(column.type_info()) => {
                // Enum labels travel as their text, element by element.
                match row.try_get_unchecked::<Option<Vec<Option<String>>>, _>(idx)? {
                    Some(items) => SqlValue::Array(
                        items
                            .into_iter()
                            .map(|item| item.map(SqlValue::String).unwrap_or(SqlValue::Null))
                            .collect(),
                    ),
                    None => SqlValue::Null,
                }
            }
            // Enum labels and other text-compatible user types
            other => {
                tracing::debug!(
                    pg_type = other,
                    column = %column_name,
                    "Reading column of unregistered type as text"
                );
                row.try_get_unchecked::<Option<String>, _>(idx)?
                    .map(SqlValue::String)
                    .unwrap_or(SqlValue::Null)
            }
        };

        columns.push((column_name, value));
    }

    Ok(columns)
}

fn is_enum_array(info: &PgTypeInfo) -> bool {
    match info.kind() {
        PgTypeKind::Array(element) => matches!(element.kind(), PgTypeKind::Enum(_)),
        _ => false,
    }
}

fn decode<T>(row: &PgRow, idx: usize, wrap: impl FnOnce(T) -> SqlValue) -> Result<SqlValue>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + Type<Postgres>,
{
    Ok(row
        .try_get::<Option<T>, _>(idx)?
        .map(wrap)
        .unwrap_or(SqlValue::Null))
}

fn decode_array<T>(row: &PgRow, idx: usize, wrap: impl Fn(T) -> SqlValue) -> Result<SqlValue>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + Type<Postgres> + PgHasArrayType,
{
    Ok(match row.try_get::<Option<Vec<Option<T>>>, _>(idx)? {
        Some(items) => SqlValue::Array(
            items
                .into_iter()
                .map(|item| item.map(&wrap).unwrap_or(SqlValue::Null))
                .collect(),
        ),
        None => SqlValue::Null,
    })
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    SqlValue::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    PgInterval => Interval,
    IpNetwork => Network,
    MacAddress => MacAddr,
    JsonValue => Json,
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ddl_names() {
        assert_eq!(SqlType::Serial.builtin_ddl_name().unwrap(), "SERIAL");
        assert_eq!(SqlType::Char(3).builtin_ddl_name().unwrap(), "CHARACTER(3)");
        assert_eq!(SqlType::VarChar(Some(40)).builtin_ddl_name().unwrap(), "VARCHAR(40)");
        assert_eq!(
            SqlType::TimestampTz.builtin_ddl_name().unwrap(),
            "TIMESTAMP WITH TIME ZONE"
        );
        assert!(SqlType::Enum("public.mood".into()).builtin_ddl_name().is_none());
        assert!(SqlType::array(SqlType::Integer).builtin_ddl_name().is_none());
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(SqlValue::from(5i16).kind(), Some(ValueKind::Integer));
        assert_eq!(SqlValue::from(5i64).kind(), Some(ValueKind::Integer));
        assert_eq!(SqlValue::from("x").kind(), Some(ValueKind::Text));
        assert_eq!(SqlValue::Null.kind(), None);
        assert_eq!(SqlValue::from(Option::<i32>::None), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(3)), SqlValue::Int(3));
    }

    #[test]
    fn test_bind_to_arguments() {
        let mut args = PgArguments::default();
        assert!(SqlValue::Int(42).bind_to_arguments(&mut args).is_ok());
        assert!(SqlValue::String("test".into()).bind_to_arguments(&mut args).is_ok());
        assert!(SqlValue::Null.bind_to_arguments(&mut args).is_ok());
        assert!(SqlValue::Interval(PgInterval { months: 1, days: 2, microseconds: 3 })
            .bind_to_arguments(&mut args)
            .is_ok());
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn test_bind_arrays() {
        let mut args = PgArguments::default();
        SqlValue::array([1, 2, 3]).bind_to_arguments(&mut args).unwrap();
        SqlValue::Array(vec![SqlValue::String("a".into()), SqlValue::Null])
            .bind_to_arguments(&mut args)
            .unwrap();
        SqlValue::Array(vec![]).bind_to_arguments(&mut args).unwrap();
        // Mixed kinds fall back to JSONB
        SqlValue::Array(vec![SqlValue::Int(1), SqlValue::String("a".into())])
            .bind_to_arguments(&mut args)
            .unwrap();
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn test_bind_time_bytes_interval_mac_arrays() {
        let mut args = PgArguments::default();
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        SqlValue::Array(vec![SqlValue::Time(noon), SqlValue::Null])
            .bind_to_arguments(&mut args)
            .unwrap();
        SqlValue::Array(vec![SqlValue::Bytes(vec![1, 2]), SqlValue::Bytes(vec![])])
            .bind_to_arguments(&mut args)
            .unwrap();
        SqlValue::Array(vec![SqlValue::Interval(PgInterval { months: 0, days: 1, microseconds: 0 })])
            .bind_to_arguments(&mut args)
            .unwrap();
        SqlValue::Array(vec![SqlValue::MacAddr(MacAddress::new([0, 1, 2, 3, 4, 5]))])
            .bind_to_arguments(&mut args)
            .unwrap();
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn test_homogeneous_detection() {
        let ints = vec![SqlValue::Int(1), SqlValue::Null, SqlValue::Int(3)];
        let picked = homogeneous(&ints, |v| match v {
            SqlValue::Int(i) => Some(*i),
            _ => None,
        });
        assert_eq!(picked, Some(vec![Some(1), None, Some(3)]));

        let mixed = vec![SqlValue::Int(1), SqlValue::Bool(true)];
        let picked = homogeneous(&mixed, |v| match v {
            SqlValue::Int(i) => Some(*i),
            _ => None,
        });
        assert!(picked.is_none());
    }

    #[test]
    fn test_to_json() {
        assert_eq!(SqlValue::Int(7).to_json(), serde_json::json!(7));
        assert_eq!(SqlValue::Bytes(vec![0xde, 0xad]).to_json(), serde_json::json!("dead"));
        assert_eq!(
            SqlValue::Decimal(Decimal::new(1234, 2)).to_json(),
            serde_json::json!("12.34")
        );
        assert_eq!(
            SqlValue::array(["a", "b"]).to_json(),
            serde_json::json!(["a", "b"])
        );
        assert_eq!(SqlValue::Double(f64::NAN).to_json(), JsonValue::Null);
    }

    #[test]
    fn test_to_text() {
        assert_eq!(SqlValue::Null.to_text(), "");
        assert_eq!(SqlValue::String("a,b".into()).to_text(), "a,b");
        assert_eq!(SqlValue::Bool(true).to_text(), "true");
        assert_eq!(SqlValue::Json(serde_json::json!({"k": 1})).to_text(), "{\"k\":1}");
        let net: IpNetwork = "10.0.0.0/8".parse().unwrap();
        assert_eq!(SqlValue::Network(net).to_text(), "10.0.0.0/8");
    }
}

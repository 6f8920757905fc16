use mongodb::bson::Bson;

/// Dot-joined location of a value inside a BSON reply, kept for error context.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Path(Vec<String>);

impl Path {
    fn from_keys(keys: &[&str]) -> Self {
        Self(keys.iter().map(|key| key.to_string()).collect())
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("not found")]
    NotFound,
    #[error("invalid type: expected {expected}, found {found:?}")]
    InvalidType { expected: &'static str, found: Bson },
}

#[derive(Debug, thiserror::Error)]
#[error("{path}: {source}")]
pub struct Error {
    pub path: Path,
    #[source]
    pub source: ValueError,
}

impl Error {
    fn not_found(keys: &[&str]) -> Self {
        Self {
            path: Path::from_keys(keys),
            source: ValueError::NotFound,
        }
    }

    fn invalid_type(keys: &[&str], expected: &'static str, found: &Bson) -> Self {
        Self {
            path: Path::from_keys(keys),
            source: ValueError::InvalidType {
                expected,
                found: found.clone(),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.source, ValueError::NotFound)
    }
}

pub fn get_path<'a>(document: &'a Bson, keys: &[&str]) -> Result<&'a Bson, Error> {
    let mut value = document;
    for key in keys {
        value = match value {
            Bson::Document(doc) => doc.get(key).ok_or_else(|| Error::not_found(keys))?,
            _ => return Err(Error::not_found(keys)),
        };
    }
    Ok(value)
}

/// Integer read with type coercion: the server reports counters as int32,
/// int64, or double depending on version and field.
pub fn get_i64(document: &Bson, keys: &[&str]) -> Result<i64, Error> {
    match get_path(document, keys)? {
        Bson::Int64(value) => Ok(*value),
        Bson::Int32(value) => Ok(i64::from(*value)),
        Bson::Double(value) => Ok(*value as i64),
        other => Err(Error::invalid_type(keys, "integer", other)),
    }
}

/// Like [`get_i64`], but a missing field reads as 0. Absent sections are
/// normal across server versions; a present field of the wrong type is not.
pub fn get_i64_or_default(document: &Bson, keys: &[&str]) -> Result<i64, Error> {
    match get_i64(document, keys) {
        Err(err) if err.is_not_found() => Ok(0),
        other => other,
    }
}

pub fn get_str<'a>(document: &'a Bson, keys: &[&str]) -> Result<&'a str, Error> {
    match get_path(document, keys)? {
        Bson::String(value) => Ok(value.as_str()),
        other => Err(Error::invalid_type(keys, "string", other)),
    }
}

pub fn get_datetime(document: &Bson, keys: &[&str]) -> Result<mongodb::bson::DateTime, Error> {
    match get_path(document, keys)? {
        Bson::DateTime(value) => Ok(*value),
        other => Err(Error::invalid_type(keys, "datetime", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::bson;

    fn sample() -> Bson {
        bson!({
            "host": "db1:27017",
            "uptime": 12345.0,
            "connections": {
                "current": 12,
                "available": Bson::Int64(812),
            },
            "globalLock": {
                "currentQueue": { "readers": 1, "writers": 0, "total": 1 },
            },
        })
    }

    #[test]
    fn get_path_resolves_nested_keys() {
        let doc = sample();
        let value = get_path(&doc, &["globalLock", "currentQueue", "readers"]).unwrap();
        assert_eq!(value, &Bson::Int32(1));
    }

    #[test]
    fn get_i64_coerces_integer_widths_and_doubles() {
        let doc = sample();
        assert_eq!(get_i64(&doc, &["connections", "current"]).unwrap(), 12);
        assert_eq!(get_i64(&doc, &["connections", "available"]).unwrap(), 812);
        assert_eq!(get_i64(&doc, &["uptime"]).unwrap(), 12345);
    }

    #[test]
    fn get_i64_rejects_non_numeric_values() {
        let doc = sample();
        let err = get_i64(&doc, &["host"]).unwrap_err();
        assert!(matches!(
            err.source,
            ValueError::InvalidType { expected: "integer", .. }
        ));
        assert_eq!(err.path.to_string(), "host");
    }

    #[test]
    fn get_i64_or_default_reads_missing_fields_as_zero() {
        let doc = sample();
        assert_eq!(get_i64_or_default(&doc, &["mem", "resident"]).unwrap(), 0);
        assert_eq!(
            get_i64_or_default(&doc, &["connections", "current"]).unwrap(),
            12
        );
    }

    #[test]
    fn missing_path_reports_full_location() {
        let doc = sample();
        let err = get_path(&doc, &["globalLock", "activeClients", "total"]).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "globalLock.activeClients.total: not found");
    }

    #[test]
    fn get_str_and_get_datetime() {
        let doc = bson!({
            "host": "db1",
            "localTime": mongodb::bson::DateTime::from_millis(1_500_000_000_000),
        });
        assert_eq!(get_str(&doc, &["host"]).unwrap(), "db1");
        assert_eq!(
            get_datetime(&doc, &["localTime"]).unwrap().timestamp_millis(),
            1_500_000_000_000
        );
        assert!(get_str(&doc, &["localTime"]).is_err());
    }
}

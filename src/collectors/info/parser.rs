//! Parser for the `INFO all` report.
//!
//! The report is a `\r\n` separated list of `key:value` lines, interleaved
//! with `# Section` headers and blank lines. Every field is decoded on its
//! own: a value that does not parse drops that field and nothing else.

use std::fmt;

const COMMAND_PREFIX: &str = "cmdstat_";
const DATABASE_PREFIX: &str = "db";

/// Replication role reported by the `role` field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Role {
    Master,
    Slave,
    #[default]
    Unknown,
}

impl Role {
    #[must_use]
    pub fn from_field(value: &str) -> Self {
        match value.trim() {
            "master" => Self::Master,
            "slave" => Self::Slave,
            _ => Self::Unknown,
        }
    }

    /// Label value used by the per-database families.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Slave => "slave",
            Self::Unknown => "none",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded line of the report.
#[derive(Clone, Debug, PartialEq)]
pub enum Field<'a> {
    /// `used_memory:1024`
    Scalar { key: &'a str, value: f64 },
    /// `cmdstat_get:calls=42,usec=10,...`
    Command { command: &'a str, calls: f64 },
    /// `db0:keys=5,expires=2,avg_ttl=0`
    Database {
        db: &'a str,
        keys: Option<f64>,
        expires: Option<f64>,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InfoReport<'a> {
    pub role: Role,
    pub fields: Vec<Field<'a>>,
}

impl InfoReport<'_> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Numeric value of a scalar field, if present.
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.fields.iter().find_map(|field| match field {
            Field::Scalar { key, value } if *key == name => Some(*value),
            _ => None,
        })
    }
}

/// Parse a raw `INFO` report.
#[must_use]
pub fn parse(raw: &str) -> InfoReport<'_> {
    let mut report = InfoReport::default();

    for line in raw.split("\r\n") {
        let Some((key, value)) = split_line(line) else {
            continue;
        };

        if key == "role" {
            report.role = Role::from_field(value);
            continue;
        }

        if let Some(field) = parse_field(key, value) {
            report.fields.push(field);
        }
    }

    report
}

/// Split on the first colon; headers, blanks and lines starting with a colon yield `None`.
fn split_line(line: &str) -> Option<(&str, &str)> {
    match line.split_once(':') {
        Some((key, value)) if !key.is_empty() => Some((key, value)),
        _ => None,
    }
}

fn parse_field<'a>(key: &'a str, value: &'a str) -> Option<Field<'a>> {
    if let Some(command) = key.strip_prefix(COMMAND_PREFIX) {
        return parse_command_calls(value).map(|calls| Field::Command { command, calls });
    }

    if let Some(db) = key.strip_prefix(DATABASE_PREFIX) {
        if db.is_empty() {
            return None;
        }
        return parse_database(db, value);
    }

    value
        .parse::<f64>()
        .ok()
        .map(|value| Field::Scalar { key, value })
}

/// Count from the first `name=value` segment of a `cmdstat_*` value.
///
/// The `=` must appear after the first character and before the first `,`.
fn parse_command_calls(value: &str) -> Option<f64> {
    let eq = value.find('=')?;
    let comma = value.find(',')?;

    if eq == 0 || eq >= comma {
        return None;
    }

    value.get(eq + 1..comma)?.parse::<f64>().ok()
}

fn parse_database<'a>(db: &'a str, value: &str) -> Option<Field<'a>> {
    let mut keys = None;
    let mut expires = None;

    for segment in value.split(',') {
        if let Some(n) = segment.strip_prefix("keys=") {
            keys = n.parse::<f64>().ok().or(keys);
        } else if let Some(n) = segment.strip_prefix("expires=") {
            expires = n.parse::<f64>().ok().or(expires);
        }
    }

    if keys.is_none() && expires.is_none() {
        return None;
    }

    Some(Field::Database { db, keys, expires })
}

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A recording as it comes out of a parser: per-subscription raw columns plus
/// global metadata. Timestamps are integer microseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecording {
    pub start_timestamp: u64,
    pub last_timestamp: u64,
    pub datasets: Vec<RawDataset>,
    pub initial_parameters: BTreeMap<String, ParamValue>,
    pub changed_parameters: Vec<ParameterChange>,
    pub logged_messages: Vec<LoggedMessage>,
    pub dropouts: Vec<Dropout>,
    pub info: BTreeMap<String, InfoValue>,
    /// Each key maps to a list of groups; a group is extended by messages
    /// flagged as continuations.
    pub info_multiple: BTreeMap<String, Vec<Vec<InfoValue>>>,
}

/// All samples logged for one (topic, instance) subscription.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDataset {
    pub name: String,
    pub multi_id: u8,
    /// Bytes per sample, excluding padding.
    pub message_size: usize,
    pub timestamps: Vec<u64>,
    /// Every non-timestamp field, flattened (`q[0]`, `current.lat`, ...).
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl RawDataset {
    /// `"<name>_<multi_id>"`, the key used for topic tables.
    pub fn table_name(&self) -> String {
        format!("{}_{}", self.name, self.multi_id)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i32),
    Float(f32),
}

impl ParamValue {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => f64::from(v),
            Self::Float(v) => f64::from(v),
        }
    }

    /// Truncating integer view, as used for ids stored in float parameters.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Int(v) => i64::from(v),
            Self::Float(v) => v as i64,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// A parameter changed while logging, stamped with the last data timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterChange {
    pub timestamp: u64,
    pub name: String,
    pub value: ParamValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedMessage {
    pub level: LogLevel,
    pub tag: Option<u16>,
    pub timestamp: u64,
    pub message: String,
}

/// Syslog-style severity, stored in the log as an ASCII digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
    Unknown(u8),
}

impl LogLevel {
    pub fn from_byte(b: u8) -> Self {
        match b {
            b'0' => Self::Emergency,
            b'1' => Self::Alert,
            b'2' => Self::Critical,
            b'3' => Self::Error,
            b'4' => Self::Warning,
            b'5' => Self::Notice,
            b'6' => Self::Info,
            b'7' => Self::Debug,
            other => Self::Unknown(other),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emergency => "EMERGENCY",
            Self::Alert => "ALERT",
            Self::Critical => "CRITICAL",
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Notice => "NOTICE",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gap in the log where the logger could not keep up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dropout {
    pub timestamp: u64,
    pub duration_ms: u16,
}

/// A typed value from an info message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InfoValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    /// Arrays of numbers (anything but `char[n]`).
    List(Vec<f64>),
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{}", if *v { "True" } else { "False" }),
            Self::List(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

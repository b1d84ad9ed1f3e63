use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{
    Dropout, InfoValue, LogLevel, LoggedMessage, ParamValue, ParameterChange, RawDataset,
    RawRecording,
};

/// First seven bytes of every ULog file; followed by a version byte.
pub const HEADER_MAGIC: [u8; 7] = [0x55, 0x4c, 0x6f, 0x67, 0x01, 0x12, 0x35];
const SYNC_MAGIC: [u8; 8] = [0x2f, 0x73, 0x13, 0x20, 0x25, 0x0c, 0xbb, 0x12];
const HEADER_LEN: usize = 16;
const MSG_HEADER_LEN: usize = 3;
const FLAG_BITS_LEN: usize = 40;
const MAX_NESTING: usize = 16;
/// Largest payload a message header can announce.
const MAX_MESSAGE_SIZE: usize = u16::MAX as usize;

#[derive(Debug, Error)]
pub enum UlogParseError {
    #[error("file too short for a ULog header ({0} bytes)")]
    TooShort(usize),
    #[error("missing ULog magic bytes")]
    BadMagic,
    #[error("unknown incompatible flag bits set: {0:02x?}")]
    IncompatibleFlags([u8; 8]),
    #[error("malformed '{kind}' message at offset {offset}")]
    Malformed { kind: char, offset: usize },
    #[error("invalid format definition `{0}`")]
    InvalidFormat(String),
    #[error("unknown field type `{type_name}` in format `{format}`")]
    UnknownType { format: String, type_name: String },
    #[error("subscription to undefined format `{0}`")]
    UndefinedFormat(String),
}

/// Parse a complete ULog byte stream.
///
/// Content problems (truncated tail, corrupt regions, short samples) are
/// recovered from; only structural problems in the header and definitions
/// are errors.
pub fn parse_ulog(data: &[u8]) -> Result<RawRecording, UlogParseError> {
    let mut parser = Parser::new(data)?;
    parser.run()?;
    Ok(parser.finish())
}

/// Whether `data` starts with the ULog magic.
pub fn is_ulog(data: &[u8]) -> bool {
    data.starts_with(&HEADER_MAGIC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    Bool,
    Char,
}

impl BaseType {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "int8_t" => Self::Int8,
            "uint8_t" => Self::UInt8,
            "int16_t" => Self::Int16,
            "uint16_t" => Self::UInt16,
            "int32_t" => Self::Int32,
            "uint32_t" => Self::UInt32,
            "int64_t" => Self::Int64,
            "uint64_t" => Self::UInt64,
            "float" => Self::Float,
            "double" => Self::Double,
            "bool" => Self::Bool,
            "char" => Self::Char,
            _ => return None,
        })
    }

    fn size(self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 | Self::Bool | Self::Char => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float => 4,
            Self::Int64 | Self::UInt64 | Self::Double => 8,
        }
    }

    fn read(self, b: &[u8]) -> Option<f64> {
        Some(match self {
            Self::Int8 => f64::from(i8::from_le_bytes(take(b)?)),
            Self::UInt8 | Self::Char => f64::from(*b.first()?),
            Self::Bool => {
                if *b.first()? != 0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Int16 => f64::from(i16::from_le_bytes(take(b)?)),
            Self::UInt16 => f64::from(u16::from_le_bytes(take(b)?)),
            Self::Int32 => f64::from(i32::from_le_bytes(take(b)?)),
            Self::UInt32 => f64::from(u32::from_le_bytes(take(b)?)),
            Self::Int64 => i64::from_le_bytes(take(b)?) as f64,
            Self::UInt64 => u64::from_le_bytes(take(b)?) as f64,
            Self::Float => f64::from(f32::from_le_bytes(take(b)?)),
            Self::Double => f64::from_le_bytes(take(b)?),
        })
    }

    /// Lossless scalar decode for info messages.
    fn read_info(self, b: &[u8]) -> Option<InfoValue> {
        Some(match self {
            Self::Int8 => InfoValue::Int(i64::from(i8::from_le_bytes(take(b)?))),
            Self::Int16 => InfoValue::Int(i64::from(i16::from_le_bytes(take(b)?))),
            Self::Int32 => InfoValue::Int(i64::from(i32::from_le_bytes(take(b)?))),
            Self::Int64 => InfoValue::Int(i64::from_le_bytes(take(b)?)),
            Self::UInt8 | Self::Char => InfoValue::UInt(u64::from(*b.first()?)),
            Self::UInt16 => InfoValue::UInt(u64::from(u16::from_le_bytes(take(b)?))),
            Self::UInt32 => InfoValue::UInt(u64::from(u32::from_le_bytes(take(b)?))),
            Self::UInt64 => InfoValue::UInt(u64::from_le_bytes(take(b)?)),
            Self::Float | Self::Double => InfoValue::Float(self.read(b)?),
            Self::Bool => InfoValue::Bool(*b.first()? != 0),
        })
    }
}

fn take<const N: usize>(b: &[u8]) -> Option<[u8; N]> {
    b.get(..N)?.try_into().ok()
}

/// Split `float[4]` into (`float`, Some(4)).
fn parse_type(s: &str) -> Option<(&str, Option<usize>)> {
    match s.split_once('[') {
        Some((name, rest)) => {
            let len = rest.strip_suffix(']')?.parse().ok()?;
            Some((name, Some(len)))
        }
        None => Some((s, None)),
    }
}

#[derive(Debug, Clone)]
struct FormatField {
    type_name: String,
    array_len: Option<usize>,
    name: String,
}

#[derive(Debug, Clone)]
struct MessageFormat {
    name: String,
    fields: Vec<FormatField>,
}

fn parse_format(text: &str) -> Result<MessageFormat, UlogParseError> {
    let invalid = || UlogParseError::InvalidFormat(text.to_string());
    let (name, body) = text.split_once(':').ok_or_else(invalid)?;
    let mut fields = Vec::new();
    for decl in body.split(';').map(str::trim).filter(|d| !d.is_empty()) {
        let (type_str, field_name) = decl.split_once(' ').ok_or_else(invalid)?;
        let (type_name, array_len) = parse_type(type_str).ok_or_else(invalid)?;
        fields.push(FormatField {
            type_name: type_name.to_string(),
            array_len,
            name: field_name.trim().to_string(),
        });
    }
    Ok(MessageFormat {
        name: name.to_string(),
        fields,
    })
}

#[derive(Debug, Clone)]
struct FlatField {
    name: String,
    base: BaseType,
    offset: usize,
}

impl FlatField {
    fn end(&self) -> usize {
        self.offset + self.base.size()
    }
}

fn flatten(
    formats: &HashMap<String, MessageFormat>,
    format: &MessageFormat,
    prefix: &str,
    offset: &mut usize,
    out: &mut Vec<FlatField>,
    depth: usize,
) -> Result<(), UlogParseError> {
    if depth > MAX_NESTING {
        return Err(UlogParseError::InvalidFormat(format.name.clone()));
    }
    let too_large = || UlogParseError::InvalidFormat(format.name.clone());
    for field in &format.fields {
        let padding = field.name.starts_with("_padding");
        let label = |i: Option<usize>| match i {
            Some(i) => format!("{prefix}{}[{i}]", field.name),
            None => format!("{prefix}{}", field.name),
        };
        let count = field.array_len.unwrap_or(1);
        if count > MAX_MESSAGE_SIZE {
            return Err(too_large());
        }
        let indices = (0..count).map(|i| field.array_len.map(|_| i));

        if let Some(base) = BaseType::parse(&field.type_name) {
            for i in indices {
                if *offset + base.size() > MAX_MESSAGE_SIZE {
                    return Err(too_large());
                }
                if !padding {
                    out.push(FlatField {
                        name: label(i),
                        base,
                        offset: *offset,
                    });
                }
                *offset += base.size();
            }
        } else {
            let nested =
                formats
                    .get(&field.type_name)
                    .ok_or_else(|| UlogParseError::UnknownType {
                        format: format.name.clone(),
                        type_name: field.type_name.clone(),
                    })?;
            for i in indices {
                let before = *offset;
                let nested_prefix = format!("{}.", label(i));
                flatten(formats, nested, &nested_prefix, offset, out, depth + 1)?;
                // An empty nested type adds nothing, however often repeated.
                if *offset == before {
                    break;
                }
            }
        }
    }
    Ok(())
}

struct Subscription {
    dataset: usize,
    timestamp: FlatField,
    fields: Vec<FlatField>,
}

struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
    recording: RawRecording,
    formats: HashMap<String, MessageFormat>,
    subscriptions: HashMap<u16, Subscription>,
    columns: Vec<Vec<Vec<f64>>>,
    in_data_section: bool,
    dropped_samples: usize,
}

impl<'a> Parser<'a> {
    fn new(data: &'a [u8]) -> Result<Self, UlogParseError> {
        if data.len() < HEADER_LEN {
            return Err(UlogParseError::TooShort(data.len()));
        }
        if !is_ulog(data) {
            return Err(UlogParseError::BadMagic);
        }
        let start = u64::from_le_bytes(take(&data[8..]).ok_or(UlogParseError::TooShort(data.len()))?);
        let recording = RawRecording {
            start_timestamp: start,
            last_timestamp: start,
            ..RawRecording::default()
        };
        Ok(Self {
            data,
            pos: HEADER_LEN,
            recording,
            formats: HashMap::new(),
            subscriptions: HashMap::new(),
            columns: Vec::new(),
            in_data_section: false,
            dropped_samples: 0,
        })
    }

    fn run(&mut self) -> Result<(), UlogParseError> {
        let mut first = true;
        while self.pos + MSG_HEADER_LEN <= self.data.len() {
            let offset = self.pos;
            let size = usize::from(u16::from_le_bytes([self.data[offset], self.data[offset + 1]]));
            let kind = self.data[offset + 2];
            let start = offset + MSG_HEADER_LEN;
            let end = start + size;
            if end > self.data.len() {
                debug!(offset, "log ends inside a message; stopping");
                break;
            }
            let payload = &self.data[start..end];
            self.pos = end;

            match kind {
                b'B' if first => self.flag_bits(payload, offset)?,
                b'B' => debug!(offset, "ignoring flag bits after the first message"),
                b'F' => self.format(payload, offset)?,
                b'I' => self.info(payload, offset)?,
                b'M' => self.info_multiple(payload, offset)?,
                b'P' => self.parameter(payload, offset)?,
                b'Q' | b'R' | b'S' => {}
                b'A' => self.subscribe(payload, offset)?,
                b'D' => self.data_message(payload),
                b'L' => self.logging(payload, false),
                b'C' => self.logging(payload, true),
                b'O' => self.dropout(payload),
                other => {
                    debug!(offset, kind = other, "unknown message type; searching for sync");
                    match find_sync(self.data, offset + 1) {
                        Some(next) => self.pos = next,
                        None => break,
                    }
                }
            }
            first = false;
        }
        Ok(())
    }

    fn flag_bits(&mut self, payload: &[u8], offset: usize) -> Result<(), UlogParseError> {
        let incompat: [u8; 8] = payload
            .get(8..16)
            .and_then(|b| b.try_into().ok())
            .filter(|_| payload.len() >= FLAG_BITS_LEN)
            .ok_or(UlogParseError::Malformed { kind: 'B', offset })?;
        // Bit 0 of the first byte only announces appended data.
        if incompat[0] & !1 != 0 || incompat[1..].iter().any(|&b| b != 0) {
            return Err(UlogParseError::IncompatibleFlags(incompat));
        }
        Ok(())
    }

    fn format(&mut self, payload: &[u8], offset: usize) -> Result<(), UlogParseError> {
        let text =
            std::str::from_utf8(payload).map_err(|_| UlogParseError::Malformed { kind: 'F', offset })?;
        let format = parse_format(text)?;
        self.formats.insert(format.name.clone(), format);
        Ok(())
    }

    fn info(&mut self, payload: &[u8], offset: usize) -> Result<(), UlogParseError> {
        let (name, value) = split_key_value(payload, 'I', offset)?;
        self.recording.info.insert(name, value);
        Ok(())
    }

    fn info_multiple(&mut self, payload: &[u8], offset: usize) -> Result<(), UlogParseError> {
        let (&is_continued, rest) = payload
            .split_first()
            .ok_or(UlogParseError::Malformed { kind: 'M', offset })?;
        let (name, value) = split_key_value(rest, 'M', offset)?;
        let groups = self.recording.info_multiple.entry(name).or_default();
        match groups.last_mut() {
            Some(group) if is_continued != 0 => group.push(value),
            _ => groups.push(vec![value]),
        }
        Ok(())
    }

    fn parameter(&mut self, payload: &[u8], offset: usize) -> Result<(), UlogParseError> {
        let (key_len, rest) = payload.split_first().ok_or_else(|| malformed_p(offset))?;
        let key_len = usize::from(*key_len);
        let key = rest.get(..key_len).ok_or_else(|| malformed_p(offset))?;
        let raw = &rest[key_len..];
        let key = String::from_utf8_lossy(key);
        let Some((type_name, name)) = key.split_once(' ') else {
            return Err(malformed_p(offset));
        };
        let value = match type_name {
            "int32_t" => ParamValue::Int(i32::from_le_bytes(take(raw).ok_or_else(|| malformed_p(offset))?)),
            "float" => ParamValue::Float(f32::from_le_bytes(take(raw).ok_or_else(|| malformed_p(offset))?)),
            other => {
                debug!(param = name, type_name = other, "skipping parameter of unsupported type");
                return Ok(());
            }
        };
        if self.in_data_section {
            self.recording.changed_parameters.push(ParameterChange {
                timestamp: self.recording.last_timestamp,
                name: name.to_string(),
                value,
            });
        } else {
            self.recording.initial_parameters.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn subscribe(&mut self, payload: &[u8], offset: usize) -> Result<(), UlogParseError> {
        if payload.len() < 3 {
            return Err(UlogParseError::Malformed { kind: 'A', offset });
        }
        self.in_data_section = true;
        let multi_id = payload[0];
        let msg_id = u16::from_le_bytes([payload[1], payload[2]]);
        let name = String::from_utf8_lossy(&payload[3..]).trim_end_matches('\0').to_string();

        let format = self
            .formats
            .get(&name)
            .ok_or_else(|| UlogParseError::UndefinedFormat(name.clone()))?;
        let mut flat = Vec::new();
        let mut size = 0;
        flatten(&self.formats, format, "", &mut size, &mut flat, 0)?;

        let Some(ts_index) = flat
            .iter()
            .position(|f| f.name == "timestamp" && f.base == BaseType::UInt64)
        else {
            warn!(topic = %name, "format has no uint64_t timestamp; ignoring its data");
            return Ok(());
        };
        let timestamp = flat.remove(ts_index);
        let message_size = timestamp.base.size() + flat.iter().map(|f| f.base.size()).sum::<usize>();

        self.recording.datasets.push(RawDataset {
            name,
            multi_id,
            message_size,
            ..RawDataset::default()
        });
        self.columns.push(vec![Vec::new(); flat.len()]);
        self.subscriptions.insert(
            msg_id,
            Subscription {
                dataset: self.recording.datasets.len() - 1,
                timestamp,
                fields: flat,
            },
        );
        Ok(())
    }

    fn data_message(&mut self, payload: &[u8]) {
        let Some(id_bytes) = take::<2>(payload) else {
            self.dropped_samples += 1;
            return;
        };
        let Some(sub) = self.subscriptions.get(&u16::from_le_bytes(id_bytes)) else {
            return;
        };
        let body = &payload[2..];
        let complete = body.len() >= sub.timestamp.end()
            && sub.fields.iter().all(|f| body.len() >= f.end());
        if !complete {
            self.dropped_samples += 1;
            return;
        }
        let Some(ts) = take::<8>(&body[sub.timestamp.offset..]).map(u64::from_le_bytes) else {
            self.dropped_samples += 1;
            return;
        };

        let columns = &mut self.columns[sub.dataset];
        for (column, field) in columns.iter_mut().zip(&sub.fields) {
            column.push(field.base.read(&body[field.offset..]).unwrap_or(f64::NAN));
        }
        self.recording.datasets[sub.dataset].timestamps.push(ts);
        self.recording.last_timestamp = self.recording.last_timestamp.max(ts);
    }

    fn logging(&mut self, payload: &[u8], tagged: bool) {
        let header_len = if tagged { 11 } else { 9 };
        if payload.len() < header_len {
            self.dropped_samples += 1;
            return;
        }
        let level = LogLevel::from_byte(payload[0]);
        let (tag, ts_at) = if tagged {
            (Some(u16::from_le_bytes([payload[1], payload[2]])), 3)
        } else {
            (None, 1)
        };
        let Some(timestamp) = take::<8>(&payload[ts_at..]).map(u64::from_le_bytes) else {
            return;
        };
        let message = String::from_utf8_lossy(&payload[header_len..])
            .trim_end_matches('\0')
            .to_string();
        self.recording.logged_messages.push(LoggedMessage {
            level,
            tag,
            timestamp,
            message,
        });
        self.recording.last_timestamp = self.recording.last_timestamp.max(timestamp);
    }

    fn dropout(&mut self, payload: &[u8]) {
        if let Some(duration) = take::<2>(payload).map(u16::from_le_bytes) {
            self.recording.dropouts.push(Dropout {
                timestamp: self.recording.last_timestamp,
                duration_ms: duration,
            });
        }
    }

    fn finish(mut self) -> RawRecording {
        if self.dropped_samples > 0 {
            warn!(count = self.dropped_samples, "dropped incomplete samples");
        }
        let fields: HashMap<usize, Vec<String>> = self
            .subscriptions
            .values()
            .map(|s| (s.dataset, s.fields.iter().map(|f| f.name.clone()).collect()))
            .collect();
        for (index, (dataset, columns)) in self
            .recording
            .datasets
            .iter_mut()
            .zip(self.columns)
            .enumerate()
        {
            if let Some(names) = fields.get(&index) {
                dataset.columns = names.iter().cloned().zip(columns).collect();
            }
        }
        self.recording.datasets.retain(|d| !d.is_empty());
        self.recording
    }
}

fn malformed_p(offset: usize) -> UlogParseError {
    UlogParseError::Malformed { kind: 'P', offset }
}

/// Decode `u8 key_len, "type name", value` as used by info messages.
fn split_key_value(
    payload: &[u8],
    kind: char,
    offset: usize,
) -> Result<(String, InfoValue), UlogParseError> {
    let malformed = || UlogParseError::Malformed { kind, offset };
    let (&key_len, rest) = payload.split_first().ok_or_else(malformed)?;
    let key_len = usize::from(key_len);
    let key = String::from_utf8_lossy(rest.get(..key_len).ok_or_else(malformed)?).into_owned();
    let value = &rest[key_len..];
    let (type_str, name) = key.split_once(' ').ok_or_else(malformed)?;
    Ok((name.to_string(), decode_info_value(type_str, value)))
}

fn decode_info_value(type_str: &str, value: &[u8]) -> InfoValue {
    let text = || InfoValue::Str(String::from_utf8_lossy(value).trim_end_matches('\0').to_string());
    let Some((type_name, array_len)) = parse_type(type_str) else {
        return text();
    };
    if type_name == "char" {
        return text();
    }
    let Some(base) = BaseType::parse(type_name) else {
        return text();
    };
    if array_len.is_some() {
        return InfoValue::List(
            value
                .chunks_exact(base.size())
                .filter_map(|chunk| base.read(chunk))
                .collect(),
        );
    }
    base.read_info(value).unwrap_or_else(text)
}

/// Position right after the next sync magic at or after `from`.
fn find_sync(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(SYNC_MAGIC.len())
        .position(|w| w == SYNC_MAGIC)
        .map(|p| from + p + SYNC_MAGIC.len())
}

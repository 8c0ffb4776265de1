use chrono::{DateTime, FixedOffset};
use fitparser::profile::MesgNum;
use fitparser::Value;

use crate::error::ParseError;
use crate::pipeline::parse::records::{parse_records, FieldValue, FitRecord};
use crate::pipeline::parse::Parser;
use crate::types::activity::{ActivityHeader, ParsedActivity};

pub struct FitParser {
    pub local: FixedOffset,
}

impl Parser for FitParser {
    fn parse(&self, bytes: &[u8], src_file: &str) -> Result<ParsedActivity, ParseError> {
        let records = decode_records(bytes)?;
        if records.is_empty() {
            return Err(ParseError::EmptyFile);
        }

        let header = ActivityHeader {
            dtime: None,
            sport: None,
            title: String::new(),
            src_file: src_file.to_string(),
        };
        parse_records(&records, header, self.local)
    }
}

/// Decodes every `record` message of a binary FIT file into a key/value map.
pub fn decode_records(bytes: &[u8]) -> Result<Vec<FitRecord>, ParseError> {
    let data = fitparser::from_bytes(bytes)
        .map_err(|e| ParseError::InvalidFit(format!("Failed to parse FIT file: {}", e)))?;

    let mut records = Vec::new();
    for message in data {
        if message.kind() != MesgNum::Record {
            continue;
        }

        let mut record = FitRecord::new();
        for field in message.fields() {
            if let Some(value) = field_value(field.value()) {
                record.insert(field.name().to_string(), value);
            }
        }
        // Newer devices only write the enhanced variants.
        for (enhanced, plain) in [("enhanced_altitude", "altitude"), ("enhanced_speed", "speed")] {
            if !record.contains_key(plain) {
                if let Some(value) = record.get(enhanced).cloned() {
                    record.insert(plain.to_string(), value);
                }
            }
        }
        records.push(record);
    }

    Ok(records)
}

fn field_value(value: &Value) -> Option<FieldValue> {
    let number = match value {
        Value::Timestamp(val) => {
            return DateTime::from_timestamp(val.timestamp(), 0)
                .map(|t| FieldValue::Timestamp(t.naive_utc()));
        }
        Value::String(s) => return Some(FieldValue::Text(s.clone())),
        Value::Byte(v) | Value::Enum(v) | Value::UInt8(v) | Value::UInt8z(v) => f64::from(*v),
        Value::SInt8(v) => f64::from(*v),
        Value::SInt16(v) => f64::from(*v),
        Value::UInt16(v) | Value::UInt16z(v) => f64::from(*v),
        Value::SInt32(v) => f64::from(*v),
        Value::UInt32(v) | Value::UInt32z(v) => f64::from(*v),
        Value::SInt64(v) => *v as f64,
        Value::UInt64(v) | Value::UInt64z(v) => *v as f64,
        Value::Float32(v) => f64::from(*v),
        Value::Float64(v) => *v,
        _ => return None,
    };
    Some(FieldValue::Number(number))
}

use chrono::{FixedOffset, NaiveDateTime};

use crate::error::ParseError;
use crate::pipeline::parse::xml::{parse_number, Element};
use crate::pipeline::parse::{local_time, Parser};
use crate::types::activity::{ActivityHeader, ParsedActivity, RawSample};

pub struct GpxParser {
    pub local: FixedOffset,
}

impl Parser for GpxParser {
    fn parse(&self, bytes: &[u8], src_file: &str) -> Result<ParsedActivity, ParseError> {
        let doc = Element::parse(bytes)?;

        let title = doc
            .optional_text(&["trk", "name"])?
            .unwrap_or_default()
            .to_string();
        let sport = infer_sport(&doc, &title)?;

        let mut samples = Vec::new();
        for trackpoint in doc.descendants("trkpt") {
            let raw_time = trackpoint.required_text(&["time"])?;
            let dtime = local_time(raw_time, self.local)?;
            let sample = read_trackpoint(trackpoint, dtime).map_err(|e| e.at(raw_time))?;
            samples.push(sample);
        }

        if samples.is_empty() {
            return Err(ParseError::EmptyFile);
        }

        Ok(ParsedActivity {
            header: ActivityHeader {
                dtime: samples.first().map(|s| s.dtime),
                sport: Some(sport),
                title,
                src_file: src_file.to_string(),
            },
            samples,
        })
    }
}

/// The track title wins over the declared `type`.
fn infer_sport(doc: &Element, title: &str) -> Result<String, ParseError> {
    let lowered = title.to_lowercase();
    if lowered.contains("ride") {
        Ok("biking".to_string())
    } else if lowered.contains("run") {
        Ok("running".to_string())
    } else {
        Ok(doc.required_text(&["trk", "type"])?.trim().to_lowercase())
    }
}

fn read_trackpoint(trackpoint: &Element, dtime: NaiveDateTime) -> Result<RawSample, ParseError> {
    Ok(RawSample {
        dtime,
        lat: Some(required_coordinate(trackpoint, "lat")?),
        lon: Some(required_coordinate(trackpoint, "lon")?),
        elevation: trackpoint.optional_f64(&["ele"])?,
        distance: None,
        heart_rate: trackpoint.first_f64(&[&["extensions", "gpxtpx:hr"], &["extensions", "hr"]])?,
        cadence: trackpoint.first_f64(&[&["extensions", "gpxtpx:cad"], &["extensions", "cad"]])?,
        speed: None,
        power: trackpoint.first_f64(&[&["extensions", "power"], &["extensions", "gpxtpx:power"]])?,
        temperature: trackpoint
            .first_f64(&[&["extensions", "gpxtpx:atemp"], &["extensions", "atemp"]])?,
    })
}

fn required_coordinate(trackpoint: &Element, key: &str) -> Result<f64, ParseError> {
    let raw = trackpoint
        .attribute(key)
        .ok_or_else(|| ParseError::MissingAttribute(key.to_string()))?;
    parse_number(key, raw)?.ok_or_else(|| ParseError::MissingAttribute(key.to_string()))
}

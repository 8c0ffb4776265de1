use chrono::FixedOffset;

use crate::error::ParseError;
use crate::pipeline::parse::xml::Element;
use crate::pipeline::parse::{local_time, Parser};
use crate::types::activity::{ActivityHeader, ParsedActivity, RawSample};

pub struct TcxParser {
    pub local: FixedOffset,
}

impl Parser for TcxParser {
    fn parse(&self, bytes: &[u8], src_file: &str) -> Result<ParsedActivity, ParseError> {
        let doc = Element::parse(bytes)?;

        let activity = doc
            .find_path(&["Activities", "Activity"])?
            .ok_or_else(|| ParseError::MissingTag("Activity".to_string()))?;
        let sport = activity
            .attribute("Sport")
            .ok_or_else(|| ParseError::MissingAttribute("Sport".to_string()))?
            .to_lowercase();
        let title = doc
            .optional_text(&["Activities", "Activity", "Notes"])?
            .unwrap_or_default()
            .to_string();

        let mut samples = Vec::new();
        for trackpoint in doc.descendants("Trackpoint") {
            let raw_time = trackpoint.required_text(&["Time"])?;
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

fn read_trackpoint(
    trackpoint: &Element,
    dtime: chrono::NaiveDateTime,
) -> Result<RawSample, ParseError> {
    Ok(RawSample {
        dtime,
        lat: trackpoint.optional_f64(&["LatitudeDegrees"])?,
        lon: trackpoint.optional_f64(&["LongitudeDegrees"])?,
        elevation: trackpoint.optional_f64(&["AltitudeMeters"])?,
        distance: trackpoint
            .optional_f64(&["DistanceMeters"])?
            .map(|meters| meters / 1000.0),
        heart_rate: trackpoint.optional_f64(&["HeartRateBpm", "Value"])?,
        cadence: trackpoint.optional_f64(&["Cadence"])?,
        speed: trackpoint.first_f64(&[&["Speed"], &["ns3:Speed"]])?,
        power: trackpoint.first_f64(&[&["Watts"], &["ns3:Watts"]])?,
        temperature: None,
    })
}

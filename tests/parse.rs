use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use ridelog_rs::error::ParseError;
use ridelog_rs::pipeline::parse::{self, parse_records, FieldValue, FitRecord, RecordShape};
use ridelog_rs::types::activity::{ActivityHeader, FileFormat};

fn local() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).expect("offset")
}

fn dt(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 1)
        .and_then(|d| d.and_hms_opt(h, m, s))
        .expect("valid time")
}

fn tcx(trackpoints: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<TrainingCenterDatabase xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2" xmlns:ns3="http://www.garmin.com/xmlschemas/ActivityExtension/v2">
  <Activities>
    <Activity Sport="Biking">
      <Id>2026-01-01T00:00:00Z</Id>
      <Lap StartTime="2026-01-01T00:00:00Z">
        <Track>{trackpoints}</Track>
      </Lap>
      <Notes>Morning spin</Notes>
    </Activity>
  </Activities>
</TrainingCenterDatabase>"#
    )
}

const TCX_POINTS: &str = r#"
  <Trackpoint>
    <Time>2026-01-01T00:00:00Z</Time>
    <Position><LatitudeDegrees>-6.2000</LatitudeDegrees><LongitudeDegrees>106.8000</LongitudeDegrees></Position>
    <AltitudeMeters>12.5</AltitudeMeters>
    <DistanceMeters>0.0</DistanceMeters>
    <HeartRateBpm><Value>120</Value></HeartRateBpm>
    <Cadence>80</Cadence>
    <Extensions><ns3:TPX><ns3:Speed>5.5</ns3:Speed><ns3:Watts>210</ns3:Watts></ns3:TPX></Extensions>
  </Trackpoint>
  <Trackpoint>
    <Time>2026-01-01T00:00:01Z</Time>
    <DistanceMeters>1500.0</DistanceMeters>
    <HeartRateBpm><Value>122</Value></HeartRateBpm>
  </Trackpoint>"#;

#[test]
fn tcx_reads_header_and_trackpoints() {
    let parsed = parse::parse(tcx(TCX_POINTS).as_bytes(), FileFormat::Tcx, "ride.tcx", local())
        .expect("parsed");

    assert_eq!(parsed.header.sport.as_deref(), Some("biking"));
    assert_eq!(parsed.header.title, "Morning spin");
    assert_eq!(parsed.header.src_file, "ride.tcx");
    assert_eq!(parsed.header.dtime, Some(dt(7, 0, 0)));
    assert_eq!(parsed.samples.len(), 2);

    let first = &parsed.samples[0];
    assert_eq!(first.dtime, dt(7, 0, 0));
    assert_eq!(first.lat, Some(-6.2));
    assert_eq!(first.lon, Some(106.8));
    assert_eq!(first.elevation, Some(12.5));
    assert_eq!(first.distance, Some(0.0));
    assert_eq!(first.heart_rate, Some(120.0));
    assert_eq!(first.cadence, Some(80.0));
    assert_eq!(first.speed, Some(5.5));
    assert_eq!(first.power, Some(210.0));

    let second = &parsed.samples[1];
    assert_eq!(second.dtime, dt(7, 0, 1));
    assert_eq!(second.distance, Some(1.5));
    assert_eq!(second.lat, None);
    assert_eq!(second.power, None);
}

#[test]
fn tcx_rejects_duplicate_time() {
    let points = r#"<Trackpoint>
        <Time>2026-01-01T00:00:00Z</Time>
        <Time>2026-01-01T00:00:01Z</Time>
      </Trackpoint>"#;
    let result = parse::parse(tcx(points).as_bytes(), FileFormat::Tcx, "ride.tcx", local());
    assert!(matches!(result, Err(ParseError::DuplicateTag(tag)) if tag == "Time"));
}

#[test]
fn tcx_wraps_trackpoint_errors_with_timestamp() {
    let points = r#"<Trackpoint>
        <Time>2026-01-01T00:00:00Z</Time>
        <Cadence>80</Cadence>
        <Cadence>81</Cadence>
      </Trackpoint>"#;
    let err = parse::parse(tcx(points).as_bytes(), FileFormat::Tcx, "ride.tcx", local())
        .expect_err("duplicate cadence");
    match err {
        ParseError::Record { timestamp, source } => {
            assert_eq!(timestamp, "2026-01-01T00:00:00Z");
            assert!(matches!(*source, ParseError::DuplicateTag(ref tag) if tag == "Cadence"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn tcx_requires_time_and_trackpoints() {
    let missing_time = tcx("<Trackpoint><Cadence>80</Cadence></Trackpoint>");
    let result = parse::parse(missing_time.as_bytes(), FileFormat::Tcx, "ride.tcx", local());
    assert!(matches!(result, Err(ParseError::MissingTag(tag)) if tag == "Time"));

    let empty = tcx("");
    let result = parse::parse(empty.as_bytes(), FileFormat::Tcx, "ride.tcx", local());
    assert!(matches!(result, Err(ParseError::EmptyFile)));
}

#[test]
fn tcx_non_finite_numbers_are_missing() {
    let points = r#"<Trackpoint>
        <Time>2026-01-01T00:00:00Z</Time>
        <AltitudeMeters>NaN</AltitudeMeters>
        <DistanceMeters>NaN</DistanceMeters>
        <HeartRateBpm><Value>inf</Value></HeartRateBpm>
        <Cadence>-inf</Cadence>
      </Trackpoint>"#;
    let parsed = parse::parse(tcx(points).as_bytes(), FileFormat::Tcx, "ride.tcx", local())
        .expect("parsed");

    let sample = &parsed.samples[0];
    assert_eq!(sample.elevation, None);
    assert_eq!(sample.distance, None);
    assert_eq!(sample.heart_rate, None);
    assert_eq!(sample.cadence, None);
}

#[test]
fn tcx_rejects_invalid_numbers() {
    let points = r#"<Trackpoint>
        <Time>2026-01-01T00:00:00Z</Time>
        <HeartRateBpm><Value>fast</Value></HeartRateBpm>
      </Trackpoint>"#;
    let err = parse::parse(tcx(points).as_bytes(), FileFormat::Tcx, "ride.tcx", local())
        .expect_err("bad number");
    assert!(matches!(err, ParseError::Record { .. }));
}

fn gpx(title: &str, kind: Option<&str>, trackpoints: &str) -> String {
    let kind = kind.map(|k| format!("<type>{k}</type>")).unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
  <metadata><time>2026-01-01T00:00:00Z</time></metadata>
  <trk>
    <name>{title}</name>
    {kind}
    <trkseg>{trackpoints}</trkseg>
  </trk>
</gpx>"#
    )
}

const GPX_POINTS: &str = r#"
  <trkpt lat="52.5200" lon="13.4050">
    <ele>34.0</ele>
    <time>2026-01-01T00:00:00Z</time>
    <extensions>
      <power>230</power>
      <gpxtpx:TrackPointExtension>
        <gpxtpx:atemp>21</gpxtpx:atemp>
        <gpxtpx:hr>140</gpxtpx:hr>
        <gpxtpx:cad>88</gpxtpx:cad>
      </gpxtpx:TrackPointExtension>
    </extensions>
  </trkpt>
  <trkpt lat="52.5201" lon="13.4050">
    <time>2026-01-01T00:00:01Z</time>
  </trkpt>"#;

#[test]
fn gpx_reads_trackpoints_and_extensions() {
    let doc = gpx("Evening Ride", None, GPX_POINTS);
    let parsed = parse::parse(doc.as_bytes(), FileFormat::Gpx, "evening.gpx", local())
        .expect("parsed");

    assert_eq!(parsed.header.sport.as_deref(), Some("biking"));
    assert_eq!(parsed.header.title, "Evening Ride");
    assert_eq!(parsed.samples.len(), 2);

    let first = &parsed.samples[0];
    assert_eq!(first.dtime, dt(7, 0, 0));
    assert_eq!(first.lat, Some(52.52));
    assert_eq!(first.lon, Some(13.405));
    assert_eq!(first.elevation, Some(34.0));
    assert_eq!(first.distance, None);
    assert_eq!(first.heart_rate, Some(140.0));
    assert_eq!(first.cadence, Some(88.0));
    assert_eq!(first.power, Some(230.0));
    assert_eq!(first.temperature, Some(21.0));

    let second = &parsed.samples[1];
    assert_eq!(second.heart_rate, None);
    assert_eq!(second.elevation, None);
}

#[test]
fn gpx_sport_comes_from_title_before_type() {
    let doc = gpx("Sunday Long Run", Some("cycling"), GPX_POINTS);
    let parsed = parse::parse(doc.as_bytes(), FileFormat::Gpx, "a.gpx", local()).expect("parsed");
    assert_eq!(parsed.header.sport.as_deref(), Some("running"));

    let doc = gpx("Lunch", Some("VirtualRide"), GPX_POINTS);
    let parsed = parse::parse(doc.as_bytes(), FileFormat::Gpx, "b.gpx", local()).expect("parsed");
    assert_eq!(parsed.header.sport.as_deref(), Some("virtualride"));
}

#[test]
fn gpx_without_sport_hint_fails() {
    let doc = gpx("Lunch", None, GPX_POINTS);
    let result = parse::parse(doc.as_bytes(), FileFormat::Gpx, "c.gpx", local());
    assert!(matches!(result, Err(ParseError::MissingTag(tag)) if tag == "type"));
}

#[test]
fn gpx_trackpoint_without_latitude_fails() {
    let points = r#"<trkpt lon="13.4050"><time>2026-01-01T00:00:00Z</time></trkpt>"#;
    let doc = gpx("Evening Ride", None, points);
    let err = parse::parse(doc.as_bytes(), FileFormat::Gpx, "d.gpx", local())
        .expect_err("missing lat");
    match err {
        ParseError::Record { source, .. } => {
            assert!(matches!(*source, ParseError::MissingAttribute(ref key) if key == "lat"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_xml_is_rejected() {
    let result = parse::parse(b"<gpx><trk>", FileFormat::Gpx, "broken.gpx", local());
    assert!(matches!(result, Err(ParseError::InvalidXml(_))));
}

fn header(sport: Option<&str>) -> ActivityHeader {
    ActivityHeader {
        dtime: None,
        sport: sport.map(str::to_string),
        title: String::new(),
        src_file: "device.fit".to_string(),
    }
}

fn device_record(second: u32, fields: &[(&str, f64)]) -> FitRecord {
    let mut record: FitRecord = fields
        .iter()
        .map(|(key, value)| (key.to_string(), FieldValue::Number(*value)))
        .collect();
    record.insert("timestamp".to_string(), FieldValue::Timestamp(dt(0, 0, second)));
    record
}

fn distances_after_parse(values: &[f64]) -> Vec<Option<f64>> {
    let records: Vec<FitRecord> = values
        .iter()
        .enumerate()
        .map(|(i, d)| device_record(i as u32, &[("distance", *d)]))
        .collect();
    parse_records(&records, header(Some("cycling")), local())
        .expect("parsed")
        .samples
        .iter()
        .map(|s| s.distance)
        .collect()
}

#[test]
fn fit_distance_units_are_guessed_from_magnitude() {
    assert_eq!(
        distances_after_parse(&[0.0, 0.5, 1.0]),
        vec![Some(0.0), Some(0.5), Some(1.0)]
    );
    assert_eq!(
        distances_after_parse(&[0.0, 500.0, 1500.0]),
        vec![Some(0.0), Some(0.5), Some(1.5)]
    );
    assert_eq!(
        distances_after_parse(&[0.0, 50_000.0, 1_500_000.0]),
        vec![Some(0.0), Some(0.5), Some(15.0)]
    );
}

#[test]
fn fit_semicircles_become_degrees() {
    let records = vec![
        device_record(0, &[("position_lat", 1_073_741_824.0), ("position_long", 536_870_912.0)]),
        device_record(1, &[]),
    ];
    let parsed = parse_records(&records, header(Some("cycling")), local()).expect("parsed");
    assert_eq!(parsed.samples[0].lat, Some(90.0));
    assert_eq!(parsed.samples[0].lon, Some(45.0));
    assert_eq!(parsed.samples[1].lat, None);
}

#[test]
fn fit_degrees_are_left_alone() {
    let records = vec![device_record(0, &[("position_lat", -6.2), ("position_long", 106.8)])];
    let parsed = parse_records(&records, header(Some("cycling")), local()).expect("parsed");
    assert_eq!(parsed.samples[0].lat, Some(-6.2));
    assert_eq!(parsed.samples[0].lon, Some(106.8));
}

#[test]
fn fit_timestamps_shift_into_local_zone() {
    let records = vec![device_record(0, &[]), device_record(1, &[])];
    let parsed = parse_records(&records, header(Some("cycling")), local()).expect("parsed");
    assert_eq!(parsed.samples[0].dtime, dt(7, 0, 0));
    assert_eq!(parsed.samples[1].dtime, dt(7, 0, 1));
    assert_eq!(parsed.header.dtime, Some(dt(7, 0, 0)));
}

#[test]
fn platform_records_use_their_own_names() {
    let record: FitRecord = [
        ("time", FieldValue::Text("2026-01-01T00:00:00Z".to_string())),
        ("lat", FieldValue::Number(-6.2)),
        ("lng", FieldValue::Number(106.8)),
        ("heartrate", FieldValue::Number(131.0)),
        ("distance", FieldValue::Number(1500.0)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    assert_eq!(RecordShape::detect(&record), Some(RecordShape::Platform));
    let parsed = parse_records(&[record], header(Some("ride")), local()).expect("parsed");
    let sample = &parsed.samples[0];
    assert_eq!(sample.dtime, dt(7, 0, 0));
    assert_eq!(sample.lat, Some(-6.2));
    assert_eq!(sample.lon, Some(106.8));
    assert_eq!(sample.heart_rate, Some(131.0));
    // Platform distances are already in their final unit.
    assert_eq!(sample.distance, Some(1500.0));
    assert_eq!(parsed.header.sport.as_deref(), Some("ride"));
}

#[test]
fn fit_sport_is_inferred_from_power_and_speed() {
    let with_power = vec![device_record(0, &[("power", 180.0)]), device_record(1, &[])];
    let parsed = parse_records(&with_power, header(None), local()).expect("parsed");
    assert_eq!(parsed.header.sport.as_deref(), Some("cycling"));

    let fast: Vec<FitRecord> = (0..121).map(|i| device_record(i, &[("speed", 25.0)])).collect();
    let parsed = parse_records(&fast, header(None), local()).expect("parsed");
    assert_eq!(parsed.header.sport.as_deref(), Some("cycling"));

    let slow: Vec<FitRecord> = (0..120).map(|i| device_record(i, &[("speed", 25.0)])).collect();
    let parsed = parse_records(&slow, header(Some("")), local()).expect("parsed");
    assert_eq!(parsed.header.sport.as_deref(), Some("running"));
}

#[test]
fn fit_record_without_timestamp_fails() {
    let mut records = vec![device_record(0, &[]), device_record(1, &[])];
    records[1].remove("timestamp");
    let result = parse_records(&records, header(None), local());
    assert!(matches!(result, Err(ParseError::MissingTimestamp(1))));

    let no_time: FitRecord = [("power".to_string(), FieldValue::Number(100.0))]
        .into_iter()
        .collect();
    let result = parse_records(&[no_time], header(None), local());
    assert!(matches!(result, Err(ParseError::MissingTimestamp(0))));
}

#[test]
fn unreadable_fit_bytes_are_rejected() {
    let result = parse::parse(b"not a fit file", FileFormat::Fit, "junk.fit", local());
    assert!(result.is_err());
}

#[test]
fn file_format_follows_extension() {
    assert_eq!(FileFormat::from_filename("a.TCX"), Some(FileFormat::Tcx));
    assert_eq!(FileFormat::from_filename("b.gpx"), Some(FileFormat::Gpx));
    assert_eq!(FileFormat::from_filename("c.fit"), Some(FileFormat::Fit));
    assert_eq!(FileFormat::from_filename("notes.txt"), None);
    assert_eq!(FileFormat::from_filename("README"), None);
}

use chrono::{Duration, NaiveDate, NaiveDateTime};
use ridelog_rs::error::ProcessingError;
use ridelog_rs::pipeline::normalize::{elevation_gain, rolling_mean, Limits, Normalizer, SportTable};
use ridelog_rs::types::activity::{ActivityHeader, ParsedActivity, RawSample, Sport};

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 1)
        .and_then(|d| d.and_hms_opt(7, 0, 0))
        .expect("valid start")
}

fn at(seconds: i64) -> RawSample {
    RawSample {
        dtime: start() + Duration::seconds(seconds),
        ..RawSample::default()
    }
}

/// 1 Hz samples with the given cumulative distances in km.
fn with_distances(distances: &[f64]) -> Vec<RawSample> {
    distances
        .iter()
        .enumerate()
        .map(|(i, d)| RawSample {
            distance: Some(*d),
            ..at(i as i64)
        })
        .collect()
}

fn activity(sport: &str, samples: Vec<RawSample>) -> ParsedActivity {
    ParsedActivity {
        header: ActivityHeader {
            dtime: Some(start()),
            sport: Some(sport.to_string()),
            title: "Test".to_string(),
            src_file: "test.fit".to_string(),
        },
        samples,
    }
}

fn steady_ride(n: usize) -> Vec<RawSample> {
    let distances: Vec<f64> = (0..n).map(|i| i as f64 * 0.005).collect();
    with_distances(&distances)
}

#[test]
fn durations_grow_and_moving_time_counts_samples() {
    let processed = Normalizer::default()
        .process(activity("ride", steady_ride(10)))
        .expect("processed");

    // The first sample has no movement and is dropped.
    assert_eq!(processed.samples.len(), 9);
    for (idx, sample) in processed.samples.iter().enumerate() {
        assert_eq!(sample.mov_duration, idx as u64);
    }
    for pair in processed.samples.windows(2) {
        assert!(pair[1].duration >= pair[0].duration);
    }
    assert_eq!(processed.samples[0].duration, 1.0);
    assert_eq!(processed.metadata.duration, Some(9));
    assert_eq!(processed.metadata.mov_duration, Some(8));
    assert_eq!(processed.metadata.distance, Some(0.045));
}

#[test]
fn stationary_samples_are_removed() {
    let mut distances = vec![0.0];
    for i in 1..=5 {
        distances.push(i as f64 * 0.005);
    }
    distances.extend(std::iter::repeat(0.025).take(5));
    for i in 1..=5 {
        distances.push(0.025 + i as f64 * 0.005);
    }
    let input_len = distances.len();

    let processed = Normalizer::default()
        .process(activity("ride", with_distances(&distances)))
        .expect("processed");

    // 1 leading sample + 5 paused samples fall below the threshold.
    assert_eq!(processed.samples.len(), input_len - 6);
    assert!(processed.samples.iter().all(|s| s.movement >= 3.0 / 3.6));
    let last = processed.samples.last().expect("samples");
    assert_eq!(last.mov_duration, 9);
    assert_eq!(last.duration, 15.0);
}

#[test]
fn speed_is_recomputed_from_movement_and_smoothed() {
    let mut samples = steady_ride(6);
    for sample in &mut samples {
        sample.speed = Some(99.0);
    }
    let processed = Normalizer::default()
        .process(activity("ride", samples))
        .expect("processed");

    // 5 m per second is 18 km/h; the first rows still average in the 0 km/h start.
    assert_eq!(processed.samples[0].speed, Some(9.0));
    assert_eq!(processed.samples[1].speed, Some(12.0));
    assert_eq!(processed.samples[2].speed, Some(18.0));
    assert_eq!(processed.metadata.speed_max, Some(18.0));
}

#[test]
fn zero_time_delta_leaves_speed_missing() {
    let mut samples = steady_ride(4);
    samples[2].dtime = samples[1].dtime;
    let processed = Normalizer::default()
        .process(activity("ride", samples))
        .expect("processed");

    // Row 2 has an infinite raw speed, which is dropped before smoothing.
    let speeds: Vec<Option<f64>> = processed.samples.iter().map(|s| s.speed).collect();
    assert!(speeds.iter().flatten().all(|v| v.is_finite() && *v <= 100.0));
    assert_eq!(speeds[1], Some(9.0));
}

#[test]
fn clamp_caps_at_ceiling_and_never_raises() {
    let limits = Limits::default();
    let high = RawSample {
        elevation: Some(12_000.0),
        heart_rate: Some(300.0),
        power: Some(4000.0),
        cadence: Some(250.0),
        speed: Some(150.0),
        temperature: Some(70.0),
        ..at(0)
    };
    let clamped = limits.clamp(high);
    assert_eq!(clamped.elevation, Some(9000.0));
    assert_eq!(clamped.heart_rate, Some(250.0));
    assert_eq!(clamped.power, Some(2500.0));
    assert_eq!(clamped.cadence, Some(210.0));
    assert_eq!(clamped.speed, Some(100.0));
    assert_eq!(clamped.temperature, Some(55.0));

    let low = RawSample {
        heart_rate: Some(120.0),
        power: Some(180.0),
        ..at(0)
    };
    let clamped = limits.clamp(low.clone());
    assert_eq!(clamped, low);
}

#[test]
fn sensor_values_stay_below_ceiling_after_processing() {
    let mut samples = steady_ride(8);
    for sample in &mut samples {
        sample.heart_rate = Some(320.0);
        sample.power = Some(2600.0);
    }
    let processed = Normalizer::default()
        .process(activity("ride", samples))
        .expect("processed");

    assert!(processed.samples.iter().all(|s| s.heart_rate == Some(250.0)));
    assert!(processed.samples.iter().all(|s| s.power == Some(2500.0)));
    assert_eq!(processed.metadata.hr_max, Some(250.0));
    assert_eq!(processed.metadata.power_avg, Some(2500.0));
}

#[test]
fn sport_labels_map_to_canonical_sports() {
    let table = SportTable::default();
    assert_eq!(table.canonical("virtualride").expect("known"), Sport::Cycling);
    assert_eq!(table.canonical("Biking").expect("known"), Sport::Cycling);
    assert_eq!(table.canonical("virtualrun").expect("known"), Sport::Running);
    assert_eq!(table.canonical("other").expect("known"), Sport::Other);
    assert!(matches!(
        table.canonical("unicycling"),
        Err(ProcessingError::UnknownSport(label)) if label == "unicycling"
    ));
}

#[test]
fn canonical_sport_names_parse() {
    assert_eq!("cycling".parse::<Sport>().expect("known"), Sport::Cycling);
    assert_eq!(" Running ".parse::<Sport>().expect("known"), Sport::Running);
    assert_eq!("OTHER".parse::<Sport>().expect("known"), Sport::Other);
    assert!(matches!(
        "bike".parse::<Sport>(),
        Err(ProcessingError::UnknownSport(label)) if label == "bike"
    ));
}

#[test]
fn unknown_sport_fails_processing() {
    let result = Normalizer::default().process(activity("unicycling", steady_ride(5)));
    assert!(matches!(result, Err(ProcessingError::UnknownSport(_))));
}

#[test]
fn missing_distance_and_coordinates_fail() {
    let samples = vec![at(0), at(1), at(2)];
    let result = Normalizer::default().process(activity("ride", samples));
    assert!(matches!(result, Err(ProcessingError::MissingDistanceSource)));
}

#[test]
fn empty_activity_fails() {
    let result = Normalizer::default().process(activity("ride", Vec::new()));
    assert!(matches!(result, Err(ProcessingError::EmptyActivity)));
}

#[test]
fn distance_is_integrated_from_coordinates() {
    let samples: Vec<RawSample> = (0..11)
        .map(|i| RawSample {
            lat: Some(i as f64 * 0.0001),
            lon: Some(0.0),
            ..at(i)
        })
        .collect();
    let processed = Normalizer::default()
        .process(activity("running", samples))
        .expect("processed");

    assert_eq!(processed.samples.len(), 10);
    for sample in &processed.samples {
        // 0.0001 degrees of latitude at the equator is about 11.06 m.
        assert!((11.0..11.2).contains(&sample.movement), "{}", sample.movement);
    }
    let distance = processed.metadata.distance.expect("distance");
    assert!((0.110..0.112).contains(&distance), "{distance}");
    assert_eq!(processed.metadata.sport, Sport::Running);
}

#[test]
fn movement_is_capped_per_sample() {
    let processed = Normalizer::default()
        .process(activity("ride", with_distances(&[0.0, 0.5, 0.505])))
        .expect("processed");

    let max = Limits::default().max_movement();
    assert!(processed.samples.iter().all(|s| s.movement <= max));
    assert_eq!(processed.samples[0].movement, max);
}

#[test]
fn fully_stationary_activity_has_no_summary() {
    let processed = Normalizer::default()
        .process(activity("ride", with_distances(&[0.0; 10])))
        .expect("processed");

    assert!(processed.samples.is_empty());
    let meta = &processed.metadata;
    assert_eq!(meta.sport, Sport::Cycling);
    assert_eq!(meta.distance, None);
    assert_eq!(meta.duration, None);
    assert_eq!(meta.mov_duration, None);
    assert_eq!(meta.elevation, None);
    assert_eq!(meta.speed_avg, None);
    assert_eq!(meta.hr_avg, None);
    assert_eq!(meta.power_max, None);
}

#[test]
fn cadence_average_ignores_coasting() {
    let mut samples = steady_ride(6);
    let cadence = [0.0, 0.0, 0.0, 90.0, 90.0, 90.0];
    for (sample, c) in samples.iter_mut().zip(cadence) {
        sample.cadence = Some(c);
    }
    let processed = Normalizer::default()
        .process(activity("ride", samples))
        .expect("processed");

    // Smoothed cadence after dropping the first row: 0, 0, 45, 90, 90.
    assert_eq!(processed.metadata.cadence_avg, Some(75.0));
    assert_eq!(processed.metadata.cadence_max, Some(90.0));
}

#[test]
fn elevation_gain_of_flat_series_is_zero() {
    let flat = vec![Some(100.0); 30];
    assert_eq!(elevation_gain(&flat, 6), 0.0);
}

#[test]
fn elevation_gain_follows_a_steady_climb() {
    let climb: Vec<Option<f64>> = (0..=1000).map(|i| Some(i as f64 * 0.1)).collect();
    let gain = elevation_gain(&climb, 6);
    // The 6-sample mean trims a quarter meter at each end.
    assert!((gain - 99.5).abs() < 1e-6, "{gain}");
    assert!((gain - 100.0).abs() < 1.0);
}

#[test]
fn elevation_gain_rejects_alternating_noise() {
    let noisy: Vec<Option<f64>> = (0..60)
        .map(|i| Some(if i % 2 == 0 { 100.0 } else { 101.0 }))
        .collect();
    assert!(elevation_gain(&noisy, 6).abs() < 1e-9);
}

#[test]
fn rolling_mean_skips_missing_values() {
    let values = [Some(2.0), None, Some(4.0), None, None];
    assert_eq!(
        rolling_mean(&values, 2),
        vec![Some(2.0), Some(2.0), Some(4.0), Some(4.0), None]
    );
}

use approx::assert_relative_eq;
use ndarray::Array1;

use geoswath::core::{
    Binner, Profile, ProfileCenter, ProfilePipeline, RampConfig, RampDegree, RampSupport,
    SwathInputs,
};
use geoswath::types::{
    CoordinateFrame, Fault, GpsNetwork, GpsOptions, InsarTrack, LinearFeature, PointSeries,
    Polyline, ReferencePoint, SeismicCatalog, TopographyGrid,
};

/// A planar track along the east axis: 0.5 units per kilometer plus a
/// deterministic oscillation standing in for noise.
fn ramped_track(label: &str, n: usize) -> InsarTrack {
    let x = Array1::linspace(-10.0, 10.0, n);
    let y = Array1::zeros(n);
    let ulos: PointSeries = x
        .iter()
        .enumerate()
        .map(|(i, &v)| 0.5 * v + 0.1 * ((i as f64) * 7.3).sin())
        .collect();
    InsarTrack::new(label, CoordinateFrame::Planar, x, y, ulos).unwrap()
}

fn flattened_profile() -> Profile {
    Profile::new("p1", ProfileCenter::Planar { x: 0.0, y: 0.0 }, 20.0, 5.0, 0.0)
        .unwrap()
        .with_flatten(RampConfig {
            degree: RampDegree::Linear,
            support: RampSupport::Positive,
        })
}

fn plain_profile() -> Profile {
    Profile::new("p1", ProfileCenter::Planar { x: 0.0, y: 0.0 }, 20.0, 5.0, 0.0).unwrap()
}

#[test]
fn test_single_track_flatten_end_to_end() {
    // Initialize logging to see per-profile diagnostics
    let _ = env_logger::try_init();

    let inputs = SwathInputs {
        insar: vec![ramped_track("t1", 2000)],
        ..Default::default()
    };
    let corrected = ProfilePipeline::new(vec![flattened_profile()], inputs.clone()).run();
    let baseline = ProfilePipeline::new(vec![plain_profile()], inputs).run();

    let track = &corrected.profiles[0].tracks[0];
    let raw = &baseline.profiles[0].tracks[0];

    // 2000 points over 20 km derive 1 km bins; the margin shifts the
    // centers by one meter and the thin trailing bin is dropped
    assert_eq!(track.binned.len(), 20);
    assert_relative_eq!(track.binned.distance[0], -9501.0);
    for w in track.binned.distance.windows(2) {
        assert_relative_eq!(w[1] - w[0], 1000.0);
    }

    // the fitted ramp recovers the 0.5 units/km trend from the
    // positive-distance bins alone
    let flatten = corrected.profiles[0].flatten.as_ref().expect("ramp fitted");
    assert_eq!(flatten.track, "t1");
    assert!(flatten.overlap.is_none());
    let ramp = &flatten.ramp;
    assert_relative_eq!(ramp.coeffs[0] * 1000.0, 0.5, max_relative = 0.05);
    assert!(ramp.coeffs[1].abs() < 0.1);

    // the correction is additive on every representation, each against
    // its own distance axis
    for i in 0..track.binned.len() {
        let expected = raw.binned.mean[i] + ramp.evaluate(track.binned.distance[i]);
        assert_relative_eq!(track.binned.mean[i], expected, epsilon = 1e-9);
        assert_relative_eq!(track.binned.std[i], raw.binned.std[i], epsilon = 1e-12);
    }
    for i in 0..track.values.len() {
        let expected = raw.values[i] + ramp.evaluate(track.swath_coords.perp[i]);
        assert_relative_eq!(track.values[i], expected, epsilon = 1e-9);
    }
    for i in 0..track.full_values.len() {
        let expected = raw.full_values[i] + ramp.evaluate(track.coords.perp[i]);
        assert_relative_eq!(track.full_values[i], expected, epsilon = 1e-9);
    }
    for i in 0..track.binned.detail.values.len() {
        let expected =
            raw.binned.detail.values[i] + ramp.evaluate(track.binned.detail.perp[i]);
        assert_relative_eq!(track.binned.detail.values[i], expected, epsilon = 1e-9);
    }

    // over the fitted support the corrected bins sit on the doubled
    // trend, so the fit residuals of the raw bins average out
    let mut residual = 0.0;
    let mut count = 0;
    for i in 0..raw.binned.len() {
        let d = raw.binned.distance[i];
        if d > 0.0 {
            residual += raw.binned.mean[i] - ramp.evaluate(d);
            count += 1;
        }
    }
    assert_eq!(count, 10);
    assert!((residual / count as f64).abs() < 0.05);

    // re-binning the corrected in-swath series reproduces the corrected
    // binned series
    let width = 20000.0 / (track.values.len() as f64 / 100.0);
    let rebinned = Binner::standard()
        .bin(20000.0, width, &track.swath_coords, &track.values)
        .unwrap();
    assert_eq!(rebinned.len(), track.binned.len());
    for i in 0..rebinned.len() {
        assert_relative_eq!(rebinned.distance[i], track.binned.distance[i]);
        assert_relative_eq!(rebinned.mean[i], track.binned.mean[i], epsilon = 0.1);
    }
}

#[test]
fn test_run_is_deterministic() {
    let inputs = SwathInputs {
        insar: vec![ramped_track("t1", 1000)],
        ..Default::default()
    };
    let pipeline = ProfilePipeline::new(vec![flattened_profile()], inputs);
    let first = pipeline.run();
    let second = pipeline.run();

    let a = &first.profiles[0].tracks[0];
    let b = &second.profiles[0].tracks[0];
    assert_eq!(a.binned.mean, b.binned.mean);
    assert_eq!(a.values, b.values);
    assert_eq!(
        first.profiles[0].flatten.as_ref().unwrap().ramp.coeffs,
        second.profiles[0].flatten.as_ref().unwrap().ramp.coeffs
    );
}

#[test]
fn test_geographic_multiset_profile() {
    let epsg = 32634;
    let frame = CoordinateFrame::Geographic { epsg };
    let reference = ReferencePoint { lon: 20.0, lat: 38.0 };

    // a track along a parallel, constant on each side of the center
    let n = 400;
    let lon = Array1::linspace(19.95, 20.05, n);
    let lat = Array1::from_elem(n, 38.0);
    let ulos = lon.mapv(|v| if v < 20.0 { 2.0 } else { 4.0 });
    let track = InsarTrack::new("asc", frame, lon.clone(), lat.clone(), ulos).unwrap();

    let gps = GpsNetwork::three_component(
        "network",
        frame,
        vec!["WEST".into(), "EAST".into()],
        Array1::from(vec![19.97, 20.03]),
        Array1::from(vec![38.0, 38.0]),
        Array1::zeros(2),
        Array1::zeros(2),
        Array1::from(vec![2.5, 3.5]),
        Array1::from_elem(2, 0.1),
        Array1::from_elem(2, 0.1),
        Array1::from(vec![0.15, 0.25]),
    )
    .unwrap()
    .with_options(GpsOptions {
        los_projection: Some([0.0, 0.0, 1.0]),
        ..Default::default()
    })
    .unwrap();

    let topo = TopographyGrid::new(
        "dem",
        frame,
        lon.clone(),
        lat.clone(),
        lon.mapv(|v| 500.0 + 1000.0 * (v - 20.0).abs()),
    )
    .unwrap();

    let quakes = SeismicCatalog::new(
        "catalog",
        frame,
        Array1::from(vec![19.99, 20.01]),
        Array1::from(vec![38.0, 38.0]),
        Array1::from(vec![7.0, 9.0]),
        Array1::from(vec![3.2, 4.1]),
    )
    .unwrap();

    let border = LinearFeature::new(
        "border",
        frame,
        vec![Polyline {
            x: Array1::from(vec![19.96, 20.04]),
            y: Array1::from(vec![37.99, 38.01]),
        }],
    )
    .unwrap();

    let fault = Fault::new("main", frame, 20.01, 38.0, Some(30.0));

    let profile = Profile::new(
        "geo",
        ProfileCenter::Geographic { lon: 20.0, lat: 38.0, epsg },
        12.0,
        5.0,
        0.0,
    )
    .unwrap()
    .with_reference(reference);

    let inputs = SwathInputs {
        insar: vec![track],
        gps: vec![gps],
        topography: vec![topo],
        seismicity: vec![quakes],
        features: vec![border],
        faults: vec![fault],
    };
    let pipeline = ProfilePipeline::new(vec![profile], inputs);
    assert_eq!(pipeline.reference(), Some(reference));
    assert!(pipeline.excluded().is_empty());
    assert!(pipeline.inputs().features[0].working.is_some());

    let report = pipeline.run();
    assert_eq!(report.reference, Some(reference));
    assert_eq!(report.profiles.len(), 1);
    let result = &report.profiles[0];

    assert!(!result.tracks[0].binned.is_empty());
    assert!(!result.topography[0].binned.is_empty());

    // catalog depths were delivered in kilometers
    assert_eq!(result.seismicity[0].depth.len(), 2);
    assert_relative_eq!(result.seismicity[0].depth[0], 7000.0);
    assert_relative_eq!(result.seismicity[0].depth[1], 9000.0);

    // one centesimal degree east of the center at 38 N
    assert_eq!(result.fault_offsets.len(), 1);
    assert_relative_eq!(result.fault_offsets[0].perpendicular, 878.0, max_relative = 0.01);

    // each station reads the plateau on its own side
    assert_eq!(result.cross_matches.len(), 1);
    let comparison = &result.cross_matches[0];
    assert_eq!(comparison.agreement.pairs, 2);
    assert_relative_eq!(comparison.matches[0].comparison, 2.0);
    assert_relative_eq!(comparison.matches[1].comparison, 4.0);
    assert_relative_eq!(comparison.agreement.mean_difference, 0.0, epsilon = 1e-12);
    assert_relative_eq!(comparison.agreement.std_difference, 0.5, epsilon = 1e-12);
    assert_relative_eq!(comparison.agreement.correlation, 1.0, epsilon = 1e-12);
}

#[test]
fn test_unprojectable_dataset_excluded_from_run() {
    let _ = env_logger::try_init();

    let bad = TopographyGrid::new(
        "bad-dem",
        CoordinateFrame::Geographic { epsg: 4326 },
        Array1::from(vec![20.0]),
        Array1::from(vec![38.0]),
        Array1::from(vec![100.0]),
    )
    .unwrap();
    let inputs = SwathInputs {
        insar: vec![ramped_track("t1", 500)],
        topography: vec![bad],
        ..Default::default()
    };
    let report = ProfilePipeline::new(vec![plain_profile()], inputs).run();
    assert_eq!(report.excluded, vec!["bad-dem".to_string()]);
    assert_eq!(report.profiles.len(), 1);
    assert!(report.profiles[0].topography.is_empty());
    assert!(!report.profiles[0].tracks[0].binned.is_empty());
}

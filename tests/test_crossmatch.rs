use approx::assert_relative_eq;
use ndarray::Array1;

use geoswath::core::{Profile, ProfileCenter, ProfilePipeline, RampConfig, SwathInputs};
use geoswath::types::{CoordinateFrame, GpsNetwork, GpsOptions, InsarTrack, PointSeries};

fn gps_vertical(
    names: Vec<String>,
    x_km: Vec<f64>,
    vu: Vec<f64>,
    svu: Vec<f64>,
) -> GpsNetwork {
    let n = names.len();
    GpsNetwork::three_component(
        "network",
        CoordinateFrame::Planar,
        names,
        Array1::from(x_km),
        Array1::zeros(n),
        Array1::zeros(n),
        Array1::zeros(n),
        Array1::from(vu),
        Array1::from_elem(n, 0.1),
        Array1::from_elem(n, 0.1),
        Array1::from(svu),
    )
    .unwrap()
    .with_options(GpsOptions {
        // a vertical unit vector makes the station LOS the vertical rate
        los_projection: Some([0.0, 0.0, 1.0]),
        ..Default::default()
    })
    .unwrap()
}

fn profile() -> Profile {
    Profile::new("p1", ProfileCenter::Planar { x: 0.0, y: 0.0 }, 20.0, 10.0, 0.0).unwrap()
}

#[test]
fn test_stations_matched_through_growing_windows() {
    // a 6 km cluster of constant values plus one isolated point at -6.5 km
    let mut x: Vec<f64> = Array1::linspace(-3.0, 3.0, 60).to_vec();
    let mut values = vec![2.0; 60];
    x.push(-6.5);
    values.push(7.5);
    let n = x.len();
    let track = InsarTrack::new(
        "asc",
        CoordinateFrame::Planar,
        Array1::from(x),
        Array1::zeros(n),
        Array1::from(values),
    )
    .unwrap();

    // near the isolated point, two windows from the cluster, out of reach
    let gps = gps_vertical(
        vec!["S1".into(), "S2".into(), "S3".into()],
        vec![-8.0, 7.0, 9.0],
        vec![7.0, 2.5, 0.0],
        vec![0.15, 0.25, 0.35],
    );

    let inputs = SwathInputs {
        insar: vec![track],
        gps: vec![gps],
        ..Default::default()
    };
    let report = ProfilePipeline::new(vec![profile()], inputs).run();
    let comparison = &report.profiles[0].cross_matches[0];
    assert_eq!(comparison.track, "asc");
    assert_eq!(comparison.network, "network");
    assert_eq!(comparison.matches.len(), 3);

    // S1 reaches only the isolated point within the first window
    let m = &comparison.matches[0];
    assert_eq!(m.station, "S1");
    assert_relative_eq!(m.reference, 7.0);
    assert_relative_eq!(m.reference_sigma, 0.15);
    assert_relative_eq!(m.comparison, 7.5);
    assert_relative_eq!(m.comparison_sigma, 0.0);

    // S2 needs the 4 km window to reach the cluster edge
    let m = &comparison.matches[1];
    assert_relative_eq!(m.reference, 2.5);
    assert_relative_eq!(m.comparison, 2.0);

    // S3 is out of reach of even the capped window
    let m = &comparison.matches[2];
    assert!(m.comparison.is_nan());
    assert!(m.comparison_sigma.is_nan());

    let agreement = &comparison.agreement;
    assert_eq!(agreement.pairs, 2);
    assert_relative_eq!(agreement.mean_difference, 0.0);
    assert_relative_eq!(agreement.std_difference, 0.5);
    assert_relative_eq!(agreement.correlation, 1.0, epsilon = 1e-12);
}

#[test]
fn test_comparison_reads_values_before_flattening() {
    // a strong gradient that the profile's ramp fit will double
    let n = 2000;
    let x = Array1::linspace(-10.0, 10.0, n);
    let ulos: PointSeries = x.mapv(|v| v);
    let track =
        InsarTrack::new("asc", CoordinateFrame::Planar, x, Array1::zeros(n), ulos).unwrap();
    let gps = gps_vertical(vec!["S1".into()], vec![5.0], vec![5.0], vec![0.2]);

    let inputs = SwathInputs {
        insar: vec![track],
        gps: vec![gps],
        ..Default::default()
    };
    let report =
        ProfilePipeline::new(vec![profile().with_flatten(RampConfig::default())], inputs).run();
    let result = &report.profiles[0];

    // the corrected track carries the doubled trend
    let flatten = result.flatten.as_ref().expect("ramp fitted");
    assert_relative_eq!(flatten.ramp.coeffs[0] * 1000.0, 1.0, max_relative = 0.02);

    // but the station was compared against the uncorrected values
    let m = &result.cross_matches[0].matches[0];
    assert_relative_eq!(m.comparison, 5.0, epsilon = 0.1);
    assert_relative_eq!(
        result.cross_matches[0].agreement.mean_difference,
        0.0,
        epsilon = 0.1
    );
}

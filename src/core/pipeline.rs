//! Sequential multi-profile processing.
//!
//! The pipeline resolves one reference point for the whole run (the
//! first profile's, when any), translates every dataset into working
//! meters once, then walks the profiles strictly in order. Failures are
//! confined: a dataset that cannot be translated is excluded from the
//! run, a track too sparse within one profile contributes no binned
//! series there, and a skipped profile leaves the other profiles'
//! results intact. Every output is an immutable per-(dataset, profile)
//! snapshot; the shared inputs are never written after translation.

use log::{debug, info, warn};
use ndarray::{Axis, Zip};

use crate::core::binning::{BinConfig, BinnedSeries, Binner};
use crate::core::crossmatch::{AgreementStats, CrossMatcher, StationMatch};
use crate::core::profile::{LocalCoords, Profile, ProfileFrame};
use crate::core::ramp::{OverlapResiduals, Ramp, RampConfig, RampEstimator};
use crate::core::reference::ReferenceFrame;
use crate::core::stats::{nan_mean, nan_percentile};
use crate::types::{
    Fault, GpsNetwork, InsarTrack, LinearFeature, PointSeries, ReferencePoint, SeismicCatalog,
    SwathError, SwathResult, TopographyGrid, UpComponent,
};

/// Tracks with fewer in-swath points contribute nothing to a profile
const MIN_TRACK_POINTS: usize = 50;

/// Datasets entering one run. Categories are always present; absent
/// ones are simply empty.
#[derive(Debug, Clone, Default)]
pub struct SwathInputs {
    pub insar: Vec<InsarTrack>,
    pub gps: Vec<GpsNetwork>,
    pub topography: Vec<TopographyGrid>,
    pub seismicity: Vec<SeismicCatalog>,
    pub features: Vec<LinearFeature>,
    pub faults: Vec<Fault>,
}

/// Per-profile snapshot of one InSAR track.
///
/// Carries the four representations touched by a ramp correction: the
/// binned series with its clipped per-point detail, the in-swath
/// filtered series, and the full unfiltered series, each against its
/// own distance axis.
#[derive(Debug, Clone)]
pub struct TrackSwath {
    pub label: String,
    /// Profile-local coordinates of the full series
    pub coords: LocalCoords,
    /// Indices of the in-swath points into the full series
    pub selected: Vec<usize>,
    /// Profile-local coordinates of the in-swath points
    pub swath_coords: LocalCoords,
    /// In-swath LOS values (corrected once the profile is flattened)
    pub values: PointSeries,
    /// Robust binned series (corrected once the profile is flattened)
    pub binned: BinnedSeries,
    /// Full LOS series (corrected once the profile is flattened)
    pub full_values: PointSeries,
}

/// Per-profile snapshot of a GPS network: in-swath stations rotated
/// into profile-parallel and profile-perpendicular components.
#[derive(Debug, Clone)]
pub struct GpsSwath {
    pub label: String,
    pub names: Vec<String>,
    pub coords: LocalCoords,
    /// Along-strike horizontal velocity
    pub upar: PointSeries,
    /// Strike-normal horizontal velocity
    pub uperp: PointSeries,
    pub sigma_par: PointSeries,
    pub sigma_perp: PointSeries,
    /// Vertical component of a three-component network
    pub up: Option<UpComponent>,
    /// LOS-projected velocities when the network declares a projection
    pub ulos: Option<PointSeries>,
    pub sigma_los: Option<PointSeries>,
}

/// Per-profile binned elevation
#[derive(Debug, Clone)]
pub struct TopoSwath {
    pub label: String,
    pub binned: BinnedSeries,
}

/// Per-profile in-swath hypocenters
#[derive(Debug, Clone)]
pub struct SeismicSwath {
    pub label: String,
    pub coords: LocalCoords,
    /// Depths in meters, positive down
    pub depth: PointSeries,
    pub magnitude: PointSeries,
}

/// A fault trace's position on a profile's distance axis
#[derive(Debug, Clone)]
pub struct FaultOffset {
    pub name: String,
    pub perpendicular: f64,
}

/// One GPS/InSAR comparison over a profile
#[derive(Debug, Clone)]
pub struct CrossMatchResult {
    pub track: String,
    pub network: String,
    pub matches: Vec<StationMatch>,
    pub agreement: AgreementStats,
}

/// Ramp correction applied to one track on one profile
#[derive(Debug, Clone)]
pub struct FlattenOutcome {
    /// Label of the corrected track
    pub track: String,
    pub ramp: Ramp,
    /// Dual-track overlap residuals; None for single-track fits
    pub overlap: Option<OverlapResiduals>,
}

/// Everything computed for one profile
#[derive(Debug, Clone)]
pub struct ProfileResult {
    /// Position of the profile in the run's profile list
    pub index: usize,
    pub name: String,
    pub frame: ProfileFrame,
    pub fault_offsets: Vec<FaultOffset>,
    pub topography: Vec<TopoSwath>,
    pub seismicity: Vec<SeismicSwath>,
    pub gps: Vec<GpsSwath>,
    pub tracks: Vec<TrackSwath>,
    pub cross_matches: Vec<CrossMatchResult>,
    pub flatten: Option<FlattenOutcome>,
}

/// Results of a whole run
#[derive(Debug, Clone)]
pub struct SwathReport {
    pub reference: Option<ReferencePoint>,
    pub profiles: Vec<ProfileResult>,
    /// Labels of datasets excluded at translation time
    pub excluded: Vec<String>,
}

/// Sequential multi-profile driver.
#[derive(Debug)]
pub struct ProfilePipeline {
    profiles: Vec<Profile>,
    reference: ReferenceFrame,
    inputs: SwathInputs,
    excluded: Vec<String>,
}

impl ProfilePipeline {
    /// Resolve the run's reference point from the first profile and
    /// translate every dataset into working meters. A dataset that
    /// fails to translate is excluded from the run with a warning.
    pub fn new(profiles: Vec<Profile>, mut inputs: SwathInputs) -> Self {
        let reference = Self::resolve_reference(&profiles);
        let frame = ReferenceFrame::new(reference);
        let mut excluded = Vec::new();

        inputs.insar.retain_mut(|track| {
            confine(frame.localize_insar(track), &track.label, &mut excluded)
        });
        inputs.gps.retain_mut(|network| {
            confine(frame.localize_gps(network), &network.label, &mut excluded)
        });
        inputs.topography.retain_mut(|grid| {
            confine(frame.localize_topography(grid), &grid.label, &mut excluded)
        });
        inputs.seismicity.retain_mut(|catalog| {
            confine(
                frame.localize_seismicity(catalog),
                &catalog.label,
                &mut excluded,
            )
        });
        inputs.features.retain_mut(|feature| {
            confine(frame.localize_feature(feature), &feature.label, &mut excluded)
        });
        inputs.faults.retain_mut(|fault| {
            confine(frame.localize_fault(fault), &fault.name, &mut excluded)
        });

        Self {
            profiles,
            reference: frame,
            inputs,
            excluded,
        }
    }

    /// First profile's reference point, if any. Later profiles carrying
    /// their own are reported and ignored.
    fn resolve_reference(profiles: &[Profile]) -> Option<ReferencePoint> {
        let reference = profiles.first().and_then(|p| p.reference);
        for profile in profiles.iter().skip(1) {
            if profile.reference.is_some() && profile.reference != reference {
                warn!(
                    "Profile {} declares its own reference point, the first profile's governs the run",
                    profile.name
                );
            }
        }
        reference
    }

    pub fn reference(&self) -> Option<ReferencePoint> {
        self.reference.reference()
    }

    /// Translated datasets of the run.
    pub fn inputs(&self) -> &SwathInputs {
        &self.inputs
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    /// Process every profile in declaration order. A profile whose
    /// frame cannot be resolved is skipped with a warning; completed
    /// profiles keep their results.
    pub fn run(&self) -> SwathReport {
        let mut results = Vec::with_capacity(self.profiles.len());
        for (index, profile) in self.profiles.iter().enumerate() {
            match self.run_profile(index, profile) {
                Ok(result) => results.push(result),
                Err(e) => warn!("Profile {} skipped: {}", profile.name, e),
            }
        }
        SwathReport {
            reference: self.reference.reference(),
            profiles: results,
            excluded: self.excluded.clone(),
        }
    }

    fn run_profile(&self, index: usize, profile: &Profile) -> SwathResult<ProfileResult> {
        info!(
            "Processing profile {}. length: {:.0} m, width: {:.0} m, strike: {:.1}",
            profile.name, profile.length, profile.width, profile.strike
        );
        let frame = ProfileFrame::build(profile, &self.reference)?;

        let mut fault_offsets = Vec::new();
        for fault in &self.inputs.faults {
            if let (Some(east), Some(north)) = (fault.east, fault.north) {
                let perpendicular = frame.fault_offset(east, north);
                debug!("Fault {} crosses the profile at {:.1} m", fault.name, perpendicular);
                fault_offsets.push(FaultOffset {
                    name: fault.name.clone(),
                    perpendicular,
                });
            }
        }

        let topography = self.project_topography(profile, &frame)?;
        let seismicity = self.project_seismicity(&frame);
        let gps = self.project_gps(&frame);
        let mut tracks = self.project_tracks(profile, &frame)?;
        let cross_matches = self.cross_match(&tracks, &gps)?;
        let flatten = profile
            .flatten
            .and_then(|config| Self::flatten_tracks(config, &mut tracks));

        Ok(ProfileResult {
            index,
            name: profile.name.clone(),
            frame,
            fault_offsets,
            topography,
            seismicity,
            gps,
            tracks,
            cross_matches,
            flatten,
        })
    }

    fn project_topography(
        &self,
        profile: &Profile,
        frame: &ProfileFrame,
    ) -> SwathResult<Vec<TopoSwath>> {
        let mut swaths = Vec::new();
        for grid in &self.inputs.topography {
            let (east, north) = match (&grid.east, &grid.north) {
                (Some(east), Some(north)) => (east, north),
                _ => continue,
            };
            let coords = frame.project(east, north);
            let keep = frame.select_in_swath(&coords);
            let swath_coords = coords.select(&keep);
            let z = grid.z.select(Axis(0), &keep);
            let width = BinConfig::resolve_width(profile.bin_width, profile.length, keep.len());
            debug!(
                "{} elevation points within the profile, bins every {:.1} m",
                keep.len(),
                width / 2.0
            );
            let binned = Binner::topographic().bin(profile.length, width / 2.0, &swath_coords, &z)?;
            swaths.push(TopoSwath {
                label: grid.label.clone(),
                binned,
            });
        }
        Ok(swaths)
    }

    fn project_seismicity(&self, frame: &ProfileFrame) -> Vec<SeismicSwath> {
        let mut swaths = Vec::new();
        for catalog in &self.inputs.seismicity {
            let (east, north) = match (&catalog.east, &catalog.north) {
                (Some(east), Some(north)) => (east, north),
                _ => continue,
            };
            let coords = frame.project(east, north);
            let keep = frame.select_in_swath(&coords);
            debug!("{} hypocenters within the profile", keep.len());
            swaths.push(SeismicSwath {
                label: catalog.label.clone(),
                coords: coords.select(&keep),
                depth: catalog.depth.select(Axis(0), &keep),
                magnitude: catalog.magnitude.select(Axis(0), &keep),
            });
        }
        swaths
    }

    fn project_gps(&self, frame: &ProfileFrame) -> Vec<GpsSwath> {
        let mut swaths = Vec::new();
        for network in &self.inputs.gps {
            let (east, north) = match (&network.east, &network.north) {
                (Some(east), Some(north)) => (east, north),
                _ => continue,
            };
            let coords = frame.project(east, north);
            let keep = frame.select_in_swath(&coords);
            debug!("{} stations within the profile", keep.len());

            let ve = network.ve.select(Axis(0), &keep);
            let vn = network.vn.select(Axis(0), &keep);
            let sigma_ve = network.sigma_ve.select(Axis(0), &keep);
            let sigma_vn = network.sigma_vn.select(Axis(0), &keep);

            // rotate horizontal velocities into the profile basis; the
            // uncertainties combine in quadrature
            let upar = &ve * frame.s[0] + &vn * frame.s[1];
            let uperp = &ve * frame.n[0] + &vn * frame.n[1];
            let sigma_par = Zip::from(&sigma_ve).and(&sigma_vn).map_collect(|&se, &sn| {
                ((se * frame.s[0]).powi(2) + (sn * frame.s[1]).powi(2)).sqrt()
            });
            let sigma_perp = Zip::from(&sigma_ve).and(&sigma_vn).map_collect(|&se, &sn| {
                ((se * frame.n[0]).powi(2) + (sn * frame.n[1]).powi(2)).sqrt()
            });

            swaths.push(GpsSwath {
                label: network.label.clone(),
                names: keep.iter().map(|&i| network.names[i].clone()).collect(),
                coords: coords.select(&keep),
                upar,
                uperp,
                sigma_par,
                sigma_perp,
                up: network.up.as_ref().map(|up| UpComponent {
                    velocity: up.velocity.select(Axis(0), &keep),
                    sigma: up.sigma.select(Axis(0), &keep),
                }),
                ulos: network.ulos.as_ref().map(|u| u.select(Axis(0), &keep)),
                sigma_los: network.sigma_los.as_ref().map(|s| s.select(Axis(0), &keep)),
            });
        }
        swaths
    }

    fn project_tracks(
        &self,
        profile: &Profile,
        frame: &ProfileFrame,
    ) -> SwathResult<Vec<TrackSwath>> {
        let mut swaths = Vec::new();
        for track in &self.inputs.insar {
            let (east, north) = match (&track.east, &track.north) {
                (Some(east), Some(north)) => (east, north),
                _ => continue,
            };
            debug!(
                "Track {}: mean {:.3}, 95th percentile {:.3}, 5th percentile {:.3}",
                track.label,
                nan_mean(&track.ulos),
                nan_percentile(&track.ulos, 95.0),
                nan_percentile(&track.ulos, 5.0)
            );
            let coords = frame.project(east, north);
            let keep = frame.select_in_swath(&coords);
            let swath_coords = coords.select(&keep);
            let values = track.ulos.select(Axis(0), &keep);
            debug!("{} points of track {} within the profile", keep.len(), track.label);

            let binned = match self.bin_track(profile, track, &swath_coords, &values) {
                Ok(binned) => binned,
                Err(e @ SwathError::InsufficientData(_)) => {
                    warn!(
                        "Track {} not binned on profile {}: {}",
                        track.label, profile.name, e
                    );
                    BinnedSeries::default()
                }
                Err(e) => return Err(e),
            };

            swaths.push(TrackSwath {
                label: track.label.clone(),
                coords,
                selected: keep,
                swath_coords,
                values,
                binned,
                full_values: track.ulos.clone(),
            });
        }
        Ok(swaths)
    }

    fn bin_track(
        &self,
        profile: &Profile,
        track: &InsarTrack,
        coords: &LocalCoords,
        values: &PointSeries,
    ) -> SwathResult<BinnedSeries> {
        if values.len() < MIN_TRACK_POINTS {
            return Err(SwathError::InsufficientData(format!(
                "track {}: {} points within the swath, need {}",
                track.label,
                values.len(),
                MIN_TRACK_POINTS
            )));
        }
        let width = BinConfig::resolve_width(profile.bin_width, profile.length, values.len());
        info!("Create bins every {:.1} m for track {}", width, track.label);
        let binner = Binner::new(BinConfig {
            clip_percentile: Some(track.clip_percentile),
            ..BinConfig::default()
        });
        binner.bin(profile.length, width, coords, values)
    }

    /// Compare every LOS-projected network against every track, on the
    /// uncorrected in-swath values.
    fn cross_match(
        &self,
        tracks: &[TrackSwath],
        gps: &[GpsSwath],
    ) -> SwathResult<Vec<CrossMatchResult>> {
        let matcher = CrossMatcher::new();
        let mut results = Vec::new();
        for track in tracks {
            for network in gps {
                let (ulos, sigma_los) = match (&network.ulos, &network.sigma_los) {
                    (Some(u), Some(s)) => (u, s),
                    _ => continue,
                };
                let matches = matcher.match_network(
                    &network.names,
                    &network.coords,
                    ulos,
                    sigma_los,
                    &track.swath_coords,
                    &track.values,
                )?;
                let agreement = AgreementStats::from_matches(&matches);
                info!(
                    "{} of {} stations of {} matched against {}: mean difference {:.3}, correlation {:.3}",
                    agreement.pairs,
                    matches.len(),
                    network.label,
                    track.label,
                    agreement.mean_difference,
                    agreement.correlation
                );
                results.push(CrossMatchResult {
                    track: track.label.clone(),
                    network: network.label.clone(),
                    matches,
                    agreement,
                });
            }
        }
        Ok(results)
    }

    /// Estimate and apply the profile's ramp correction. Two tracks fit
    /// the ramp from their overlap differences and correct the second
    /// track; any other count fits the first track along the profile.
    fn flatten_tracks(config: RampConfig, tracks: &mut [TrackSwath]) -> Option<FlattenOutcome> {
        let estimator = RampEstimator::new(config);
        match tracks.len() {
            0 => None,
            2 => {
                info!("Two tracks defined: flatten from the differences over the overlapping bins");
                let (ramp, overlap) = estimator.fit_dual(&tracks[0].binned, &tracks[1].binned);
                Self::apply_ramp(&ramp, &mut tracks[1]);
                Some(FlattenOutcome {
                    track: tracks[1].label.clone(),
                    ramp,
                    overlap: Some(overlap),
                })
            }
            n => {
                if n > 2 {
                    warn!("{} tracks defined, flattening only the first along the profile", n);
                } else {
                    info!("One track defined: flatten along the profile");
                }
                let ramp = estimator.fit_single(&tracks[0].binned);
                Self::apply_ramp(&ramp, &mut tracks[0]);
                Some(FlattenOutcome {
                    track: tracks[0].label.clone(),
                    ramp,
                    overlap: None,
                })
            }
        }
    }

    /// Add the fitted polynomial to every representation of the track,
    /// each evaluated at its own distance axis.
    fn apply_ramp(ramp: &Ramp, swath: &mut TrackSwath) {
        ramp.apply(&swath.binned.distance, &mut swath.binned.mean);
        ramp.apply(&swath.binned.detail.perp, &mut swath.binned.detail.values);
        ramp.apply(&swath.swath_coords.perp, &mut swath.values);
        ramp.apply(&swath.coords.perp, &mut swath.full_values);
    }
}

fn confine(result: SwathResult<()>, label: &str, excluded: &mut Vec<String>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Dataset {} excluded from the run: {}", label, e);
            excluded.push(label.to_string());
            false
        }
    }
}

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::Serialize;

use crate::elevation::ElevationProvider;
use crate::error::Result;
use crate::geo::{self, LengthMode, Location, UpDownHill};

/// Parsed GPX file: metadata plus all waypoints, routes, and tracks.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub creator: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
    pub urlname: Option<String>,
    pub time: Option<DateTime<Utc>>,
    pub keywords: Option<String>,

    pub waypoints: Vec<Waypoint>,
    pub routes: Vec<Route>,
    pub tracks: Vec<Track>,

    pub min_latitude: Option<f64>,
    pub max_latitude: Option<f64>,
    pub min_longitude: Option<f64>,
    pub max_longitude: Option<f64>,
}

/// A standalone or route point (`<wpt>`, `<rtept>`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    #[serde(flatten)]
    location: Location,
    pub time: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub symbol: Option<String>,
    pub point_type: Option<String>,
    pub comment: Option<String>,
    pub horizontal_dilution: Option<f64>,
    pub vertical_dilution: Option<f64>,
    pub position_dilution: Option<f64>,
}

impl Waypoint {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            time: None,
            name: None,
            description: None,
            symbol: None,
            point_type: None,
            comment: None,
            horizontal_dilution: None,
            vertical_dilution: None,
            position_dilution: None,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn set_elevation(&mut self, elevation: Option<f64>) {
        self.location.set_elevation(elevation);
    }
}

impl AsRef<Location> for Waypoint {
    fn as_ref(&self) -> &Location {
        &self.location
    }
}

/// A recorded track point (`<trkpt>`).
///
/// Only the elevation may change after parsing, through
/// [`TrackPoint::set_elevation`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    #[serde(flatten)]
    location: Location,
    pub(crate) time: Option<DateTime<Utc>>,
    pub(crate) name: Option<String>,
    pub(crate) symbol: Option<String>,
    pub(crate) comment: Option<String>,
    pub(crate) fix: Option<String>,
    pub(crate) horizontal_dilution: Option<f64>,
    pub(crate) vertical_dilution: Option<f64>,
    pub(crate) position_dilution: Option<f64>,
    pub(crate) satellites: Option<u32>,
    pub(crate) speed: Option<f64>,
}

impl TrackPoint {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            time: None,
            name: None,
            symbol: None,
            comment: None,
            fix: None,
            horizontal_dilution: None,
            vertical_dilution: None,
            position_dilution: None,
            satellites: None,
            speed: None,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn elevation(&self) -> Option<f64> {
        self.location.elevation()
    }

    pub fn set_elevation(&mut self, elevation: Option<f64>) {
        self.location.set_elevation(elevation);
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// Text of `<cmt>`, or of the older `<com>`.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn fix(&self) -> Option<&str> {
        self.fix.as_deref()
    }

    pub fn horizontal_dilution(&self) -> Option<f64> {
        self.horizontal_dilution
    }

    pub fn vertical_dilution(&self) -> Option<f64> {
        self.vertical_dilution
    }

    pub fn position_dilution(&self) -> Option<f64> {
        self.position_dilution
    }

    pub fn satellites(&self) -> Option<u32> {
        self.satellites
    }

    pub fn speed(&self) -> Option<f64> {
        self.speed
    }

    pub fn distance_2d(&self, other: &TrackPoint) -> f64 {
        self.location.distance_2d(&other.location)
    }

    pub fn distance_3d(&self, other: &TrackPoint) -> f64 {
        self.location.distance_3d(&other.location)
    }
}

impl AsRef<Location> for TrackPoint {
    fn as_ref(&self) -> &Location {
        &self.location
    }
}

/// A GPX route (`<rte>`).
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub name: Option<String>,
    pub description: Option<String>,
    pub number: Option<u32>,
    pub points: Vec<Waypoint>,
}

/// A GPX track segment (`<trkseg>`).
///
/// Points are fixed once parsed; [`Segment::fill_elevations`] is the only
/// way to change them.
#[derive(Debug, Default, Serialize)]
pub struct Segment {
    pub(crate) points: Vec<TrackPoint>,
}

impl Segment {
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn length_2d(&self) -> f64 {
        geo::total_length(&self.points, LengthMode::TwoD)
    }

    pub fn length_3d(&self) -> f64 {
        geo::total_length(&self.points, LengthMode::ThreeD)
    }

    /// Elevations of the points that have one, in order.
    pub fn elevations(&self) -> Vec<f64> {
        self.points.iter().filter_map(TrackPoint::elevation).collect()
    }

    /// Up-hill and down-hill over the points with a known elevation.
    pub fn elevation_gain_loss(&self, smooth: bool) -> UpDownHill {
        geo::elevation_gain_loss(&self.elevations(), smooth)
    }

    /// Lowest and highest known elevation.
    pub fn elevation_extremes(&self) -> Option<(f64, f64)> {
        self.points
            .iter()
            .filter_map(TrackPoint::elevation)
            .fold(None, |acc, ele| match acc {
                None => Some((ele, ele)),
                Some((min, max)) => Some((min.min(ele), max.max(ele))),
            })
    }

    /// Time between the first and the last timestamped point.
    pub fn duration(&self) -> Option<Duration> {
        let mut times = self.points.iter().filter_map(|p| p.time);
        let first = times.next()?;
        let last = times.last()?;
        Some(last - first)
    }

    /// Replaces the elevation of every point with the value reported by
    /// `provider`, in point order.
    pub fn fill_elevations(&mut self, provider: &dyn ElevationProvider) -> Result<()> {
        let mut locations: Vec<Location> = self.points.iter().map(|p| p.location).collect();
        provider.elevation_data(&mut locations)?;

        for (point, location) in self.points.iter_mut().zip(&locations) {
            point.set_elevation(location.elevation());
        }
        debug!("filled elevation of {} points", locations.len());
        Ok(())
    }
}

/// A GPX track (`<trk>`).
#[derive(Debug, Default, Serialize)]
pub struct Track {
    pub name: Option<String>,
    pub description: Option<String>,
    pub number: Option<u32>,
    pub segments: Vec<Segment>,
}

impl Track {
    pub fn length_2d(&self) -> f64 {
        self.segments.iter().map(Segment::length_2d).sum()
    }

    pub fn length_3d(&self) -> f64 {
        self.segments.iter().map(Segment::length_3d).sum()
    }

    pub fn elevation_gain_loss(&self, smooth: bool) -> UpDownHill {
        self.segments
            .iter()
            .map(|s| s.elevation_gain_loss(smooth))
            .fold(UpDownHill::default(), |acc, s| acc + s)
    }

    pub fn elevation_extremes(&self) -> Option<(f64, f64)> {
        self.segments
            .iter()
            .filter_map(Segment::elevation_extremes)
            .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)))
    }

    /// Sum of segment durations; gaps between segments are not counted.
    pub fn duration(&self) -> Option<Duration> {
        self.segments
            .iter()
            .filter_map(Segment::duration)
            .reduce(|a, b| a + b)
    }

    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|s| s.points.len()).sum()
    }

    pub fn fill_elevations(&mut self, provider: &dyn ElevationProvider) -> Result<()> {
        for segment in &mut self.segments {
            segment.fill_elevations(provider)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GpxError, ProviderError};
    use chrono::TimeZone;

    fn point(lat: f64, lon: f64, ele: Option<f64>) -> TrackPoint {
        TrackPoint::new(Location::new(lat, lon, ele).unwrap())
    }

    fn segment(elevations: &[Option<f64>]) -> Segment {
        Segment {
            points: elevations
                .iter()
                .enumerate()
                .map(|(i, ele)| point(45.0 + i as f64 * 0.001, 7.0, *ele))
                .collect(),
        }
    }

    struct FixedElevation(f64);

    impl ElevationProvider for FixedElevation {
        fn elevation_data(
            &self,
            locations: &mut [Location],
        ) -> std::result::Result<(), ProviderError> {
            for l in locations.iter_mut() {
                l.set_elevation(Some(self.0));
            }
            Ok(())
        }
    }

    struct Failing;

    impl ElevationProvider for Failing {
        fn elevation_data(&self, _: &mut [Location]) -> std::result::Result<(), ProviderError> {
            Err(ProviderError::MissingCredential("key"))
        }
    }

    #[test]
    fn test_empty_segment_metrics() {
        let s = Segment::default();
        assert_eq!(s.length_2d(), 0.0);
        assert_eq!(s.length_3d(), 0.0);
        assert_eq!(s.elevation_gain_loss(true), UpDownHill::default());
        assert!(s.elevation_extremes().is_none());
        assert!(s.duration().is_none());
    }

    #[test]
    fn test_segment_length_matches_pairwise() {
        let s = segment(&[Some(100.0), Some(110.0), Some(105.0)]);
        let expected_2d = s.points[1].distance_2d(&s.points[0]) + s.points[2].distance_2d(&s.points[1]);
        let expected_3d = s.points[1].distance_3d(&s.points[0]) + s.points[2].distance_3d(&s.points[1]);
        assert!((s.length_2d() - expected_2d).abs() < 1e-9);
        assert!((s.length_3d() - expected_3d).abs() < 1e-9);
        assert!(s.length_3d() > 0.0);
    }

    #[test]
    fn test_segment_gain_loss_skips_missing_elevation() {
        let s = segment(&[Some(200.0), None, Some(100.0), Some(10.0), Some(80.0), Some(50.0)]);
        let r = s.elevation_gain_loss(false);
        assert_eq!(r.uphill, 70.0);
        assert_eq!(r.downhill, 220.0);
    }

    #[test]
    fn test_segment_extremes() {
        let s = segment(&[Some(200.0), None, Some(-5.0), Some(80.0)]);
        assert_eq!(s.elevation_extremes(), Some((-5.0, 200.0)));
    }

    #[test]
    fn test_track_without_segments() {
        let t = Track::default();
        assert_eq!(t.elevation_gain_loss(true), UpDownHill::default());
        assert_eq!(t.length_2d(), 0.0);
        assert!(t.duration().is_none());
        assert!(t.elevation_extremes().is_none());
    }

    #[test]
    fn test_track_sums_segments() {
        let t = Track {
            segments: vec![
                segment(&[Some(100.0), Some(200.0)]),
                segment(&[Some(50.0), Some(20.0)]),
            ],
            ..Default::default()
        };
        let r = t.elevation_gain_loss(false);
        assert_eq!(r.uphill, 100.0);
        assert_eq!(r.downhill, 30.0);
        let len: f64 = t.segments.iter().map(Segment::length_2d).sum();
        assert_eq!(t.length_2d(), len);
        assert_eq!(t.elevation_extremes(), Some((20.0, 200.0)));
        assert_eq!(t.point_count(), 4);
    }

    #[test]
    fn test_durations() {
        let mut s = segment(&[None, None, None]);
        s.points[0].time = Some(Utc.with_ymd_and_hms(2015, 2, 23, 19, 0, 0).unwrap());
        s.points[2].time = Some(Utc.with_ymd_and_hms(2015, 2, 23, 19, 10, 0).unwrap());
        assert_eq!(s.duration(), Some(Duration::minutes(10)));

        let mut lone = segment(&[None]);
        lone.points[0].time = Some(Utc.with_ymd_and_hms(2015, 2, 23, 19, 0, 0).unwrap());
        assert!(lone.duration().is_none());

        let t = Track {
            segments: vec![s, lone],
            ..Default::default()
        };
        assert_eq!(t.duration(), Some(Duration::minutes(10)));
    }

    #[test]
    fn test_fill_elevations() {
        let mut t = Track {
            segments: vec![segment(&[None, Some(3.0)]), segment(&[None])],
            ..Default::default()
        };
        t.fill_elevations(&FixedElevation(321.0)).unwrap();
        for s in &t.segments {
            assert!(s.points.iter().all(|p| p.elevation() == Some(321.0)));
        }
    }

    #[test]
    fn test_fill_elevations_propagates_provider_error() {
        let mut s = segment(&[Some(1.0)]);
        let err = s.fill_elevations(&Failing).unwrap_err();
        assert!(matches!(
            err,
            GpxError::Provider(ProviderError::MissingCredential("key"))
        ));
        assert_eq!(s.points[0].elevation(), Some(1.0));
    }
}

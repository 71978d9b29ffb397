//! Distance and elevation math over ordered point sequences.

use std::fmt;
use std::ops::{Add, AddAssign};

use serde::Serialize;

use crate::error::{GpxError, Result};

/// One degree of arc in meters, used by the equirectangular approximation.
pub const ONE_DEGREE: f64 = 1000.0 * 10000.8 / 90.0;

/// Earth radius in meters, used by the Haversine formula.
pub const EARTH_RADIUS: f64 = 6371.8 * 1000.0;

/// Which pairwise distance [`total_length`] sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthMode {
    /// Haversine distance, elevation ignored.
    TwoD,
    /// Equirectangular distance combined with the elevation difference.
    ThreeD,
}

/// Great-circle distance in meters between two lat/lon pairs.
///
/// Formula from <http://www.movable-type.co.uk/scripts/latlong.html>.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat1 - lat2).to_radians();
    let d_lon = (lon1 - lon2).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a = (d_lat / 2.0).sin() * (d_lat / 2.0).sin()
        + (d_lon / 2.0).sin() * (d_lon / 2.0).sin() * lat1.cos() * lat2.cos();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS * c
}

/// Flat-earth distance in meters. The longitude difference is scaled by the
/// cosine of the first latitude only.
///
/// When either elevation is missing, or both are equal, the result is the
/// 2D distance.
pub fn planar_distance(
    lat1: f64,
    lon1: f64,
    ele1: Option<f64>,
    lat2: f64,
    lon2: f64,
    ele2: Option<f64>,
) -> f64 {
    let coef = lat1.to_radians().cos();
    let x = lat1 - lat2;
    let y = (lon1 - lon2) * coef;

    let distance_2d = (x * x + y * y).sqrt() * ONE_DEGREE;

    match (ele1, ele2) {
        (Some(e1), Some(e2)) if e1 != e2 => {
            (distance_2d * distance_2d + (e1 - e2) * (e1 - e2)).sqrt()
        }
        _ => distance_2d,
    }
}

/// Sum of consecutive pairwise distances along `points`.
pub fn total_length<P: AsRef<Location>>(points: &[P], mode: LengthMode) -> f64 {
    points
        .windows(2)
        .map(|pair| {
            let (prev, cur) = (pair[0].as_ref(), pair[1].as_ref());
            match mode {
                LengthMode::TwoD => cur.distance_2d(prev),
                LengthMode::ThreeD => cur.distance_3d(prev),
            }
        })
        .sum()
}

/// Weighted 3-point moving average. Output has the same length as input.
pub fn smooth_elevations(elevations: &[f64]) -> Vec<f64> {
    let len = elevations.len();
    if len < 2 {
        return elevations.to_vec();
    }

    (0..len)
        .map(|n| {
            let cur = elevations[n];
            if n == 0 {
                cur * 0.7 + elevations[n + 1] * 0.3
            } else if n == len - 1 {
                elevations[n - 1] * 0.3 + cur * 0.7
            } else {
                elevations[n - 1] * 0.3 + cur * 0.4 + elevations[n + 1] * 0.3
            }
        })
        .collect()
}

/// Accumulated climb and descent, both non-negative, in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpDownHill {
    pub uphill: f64,
    pub downhill: f64,
}

impl Add for UpDownHill {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            uphill: self.uphill + rhs.uphill,
            downhill: self.downhill + rhs.downhill,
        }
    }
}

impl AddAssign for UpDownHill {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Up-hill and down-hill totals over an elevation series, optionally
/// smoothed first with [`smooth_elevations`].
pub fn elevation_gain_loss(elevations: &[f64], smooth: bool) -> UpDownHill {
    let smoothed;
    let series = if smooth {
        smoothed = smooth_elevations(elevations);
        &smoothed[..]
    } else {
        elevations
    };

    series
        .windows(2)
        .fold(UpDownHill::default(), |mut acc, pair| {
            let delta = pair[1] - pair[0];
            if delta > 0.0 {
                acc.uphill += delta;
            } else {
                acc.downhill += delta.abs();
            }
            acc
        })
}

/// A position on the WGS84 ellipsoid.
///
/// Coordinates are fixed at construction. Elevation may be filled in later
/// through [`Location::set_elevation`], which is the only mutation the type
/// allows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    #[serde(rename = "lat")]
    latitude: f64,
    #[serde(rename = "lon")]
    longitude: f64,
    #[serde(rename = "ele", skip_serializing_if = "Option::is_none")]
    elevation: Option<f64>,
}

impl Location {
    /// Builds a location, rejecting coordinates outside
    /// [-90, 90] x [-180, 180].
    pub fn new(latitude: f64, longitude: f64, elevation: Option<f64>) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GpxError::Validation(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GpxError::Validation(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
            elevation,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn elevation(&self) -> Option<f64> {
        self.elevation
    }

    /// Back-fills the elevation, e.g. from an elevation provider.
    pub fn set_elevation(&mut self, elevation: Option<f64>) {
        self.elevation = elevation;
    }

    /// Haversine distance to `other`, in meters.
    pub fn distance_2d(&self, other: &Location) -> f64 {
        haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    /// Planar distance to `other` including the elevation difference when
    /// both elevations are known.
    pub fn distance_3d(&self, other: &Location) -> f64 {
        planar_distance(
            self.latitude,
            self.longitude,
            self.elevation,
            other.latitude,
            other.longitude,
            other.elevation,
        )
    }
}

impl AsRef<Location> for Location {
    fn as_ref(&self) -> &Location {
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.elevation {
            Some(ele) => write!(f, "[loc:{},{}@{}]", self.latitude, self.longitude, ele),
            None => write!(f, "[loc:{},{}]", self.latitude, self.longitude),
        }
    }
}

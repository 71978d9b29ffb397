use std::fmt;

use serde::Serialize;

use crate::geo::UpDownHill;
use crate::gpx_types::*;
use crate::options::SummaryOptions;

/// Metrics of a whole document, as printed by `gpxcli list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub creator: Option<String>,
    pub name: Option<String>,
    pub waypoint_count: usize,
    pub route_count: usize,
    pub tracks: Vec<TrackSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub name: Option<String>,
    /// Meters
    pub length_2d: f64,
    /// Meters
    pub length_3d: f64,
    pub elevation: UpDownHill,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoothed_elevation: Option<UpDownHill>,
    pub duration_seconds: Option<i64>,
    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
    pub segment_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<SegmentSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSummary {
    pub points: usize,
    pub length_2d: f64,
}

/// Compute the summary of a parsed document.
pub fn summarize(doc: &Document, opts: &SummaryOptions) -> DocumentSummary {
    DocumentSummary {
        creator: doc.creator.clone(),
        name: doc.name.clone(),
        waypoint_count: doc.waypoints.len(),
        route_count: doc.routes.len(),
        tracks: doc.tracks.iter().map(|t| summarize_track(t, opts)).collect(),
    }
}

fn summarize_track(trk: &Track, opts: &SummaryOptions) -> TrackSummary {
    let extremes = trk.elevation_extremes();

    let segments = if opts.include_segments {
        trk.segments
            .iter()
            .map(|seg| SegmentSummary {
                points: seg.points.len(),
                length_2d: seg.length_2d(),
            })
            .collect()
    } else {
        Vec::new()
    };

    TrackSummary {
        name: trk.name.clone(),
        length_2d: trk.length_2d(),
        length_3d: trk.length_3d(),
        elevation: trk.elevation_gain_loss(false),
        smoothed_elevation: opts.smooth_elevation.then(|| trk.elevation_gain_loss(true)),
        duration_seconds: trk.duration().map(|d| d.num_seconds()),
        min_elevation: extremes.map(|(min, _)| min),
        max_elevation: extremes.map(|(_, max)| max),
        segment_count: trk.segments.len(),
        segments,
    }
}

fn format_duration(seconds: i64) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

impl fmt::Display for DocumentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(creator) = &self.creator {
            writeln!(f, "Creator: {creator}")?;
        }
        if let Some(name) = &self.name {
            writeln!(f, "Name: {name}")?;
        }
        writeln!(f, "Tracks: {}", self.tracks.len())?;
        for track in &self.tracks {
            write!(f, "{track}")?;
        }
        Ok(())
    }
}

impl fmt::Display for TrackSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            writeln!(f, "  Track: {name}")?;
        }
        writeln!(f, "  Length 2d: {:.3} kilometers", self.length_2d / 1000.0)?;
        writeln!(f, "  Length 3d: {:.3} kilometers", self.length_3d / 1000.0)?;
        match &self.smoothed_elevation {
            Some(smooth) => {
                writeln!(
                    f,
                    "  Up: {:.1} smooth: {:.1}",
                    self.elevation.uphill, smooth.uphill
                )?;
                writeln!(
                    f,
                    "  Down: {:.1} smooth: {:.1}",
                    self.elevation.downhill, smooth.downhill
                )?;
            }
            None => {
                writeln!(f, "  Up: {:.1}", self.elevation.uphill)?;
                writeln!(f, "  Down: {:.1}", self.elevation.downhill)?;
            }
        }
        if let (Some(min), Some(max)) = (self.min_elevation, self.max_elevation) {
            writeln!(f, "  Elevation: {min:.1} - {max:.1}")?;
        }
        if let Some(seconds) = self.duration_seconds {
            writeln!(f, "  Duration: {}", format_duration(seconds))?;
        }
        writeln!(f, "  Segments: {}", self.segment_count)?;
        for seg in &self.segments {
            writeln!(f, "    Points: {}", seg.points)?;
        }
        Ok(())
    }
}

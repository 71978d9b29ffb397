use chrono::{TimeZone, Utc};
use gpx_metrics::config::Config;
use gpx_metrics::elevation::ElevationProvider;
use gpx_metrics::{
    Document, GpxError, Location, ProviderError, ProviderRegistry, SummaryOptions, parse_gpx,
    parse_gpx_file, summarize,
};

fn fixture_path(path: &str) -> String {
    format!("tests/fixtures/{path}")
}

fn load(path: &str) -> Document {
    parse_gpx_file(fixture_path(path)).unwrap()
}

fn load_err(path: &str) -> GpxError {
    parse_gpx_file(fixture_path(path)).unwrap_err()
}

/// Assigns each location the elevation 1000 + index.
struct Staircase;

impl ElevationProvider for Staircase {
    fn elevation_data(&self, locations: &mut [Location]) -> Result<(), ProviderError> {
        for (i, l) in locations.iter_mut().enumerate() {
            l.set_elevation(Some(1000.0 + i as f64));
        }
        Ok(())
    }
}

// ---- basic/ ----

#[test]
fn test_metadata_round_trip() {
    let doc = load("basic/metadata.gpx");
    assert_eq!(doc.name.as_deref(), Some("TestName"));
    assert_eq!(doc.description.as_deref(), Some("TestDescription"));
    assert_eq!(doc.author.as_deref(), Some("TestAuthor"));
    assert_eq!(doc.email.as_deref(), Some("TestEmail"));
    assert_eq!(doc.url.as_deref(), Some("http://www.testurl.org/test"));
    assert_eq!(doc.urlname.as_deref(), Some("TestUrlName"));
    assert_eq!(doc.keywords.as_deref(), Some("Test1, Test2, Test3"));
    assert_eq!(
        doc.time,
        Some(Utc.with_ymd_and_hms(2015, 2, 23, 19, 22, 18).unwrap())
    );
    assert!(doc.tracks.is_empty());
}

#[test]
fn test_track_segment() {
    let doc = load("basic/track_segment.gpx");
    assert_eq!(doc.tracks.len(), 1);
    assert_eq!(doc.tracks[0].segments.len(), 1);

    let points = &doc.tracks[0].segments[0].points();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].location().latitude(), 1.0);
    assert_eq!(points[0].location().longitude(), 2.0);
    assert_eq!(points[0].elevation(), Some(2376.0));
    assert!(points[1].elevation().is_none());
    assert_eq!(
        points[1].time(),
        Some(Utc.with_ymd_and_hms(2007, 10, 15, 23, 0, 0).unwrap())
    );
}

#[test]
fn test_track_point_accessors() {
    let doc = parse_gpx(
        r#"<gpx><trk><trkseg>
  <trkpt lat="49.2" lon="16.5">
    <ele>230.5</ele><time>2015-02-23T19:22:18Z</time><name>P1</name><sym>Flag</sym>
    <com>Legacy</com><fix>3d</fix><hdop>1.4</hdop><vdop>2</vdop><pdop>2.4</pdop>
    <sat>9</sat><speed>5.5</speed>
  </trkpt>
</trkseg></trk></gpx>"#,
    )
    .unwrap();

    let p = &doc.tracks[0].segments[0].points()[0];
    assert_eq!(p.elevation(), Some(230.5));
    assert_eq!(
        p.time(),
        Some(Utc.with_ymd_and_hms(2015, 2, 23, 19, 22, 18).unwrap())
    );
    assert_eq!(p.name(), Some("P1"));
    assert_eq!(p.symbol(), Some("Flag"));
    assert_eq!(p.comment(), Some("Legacy"));
    assert_eq!(p.fix(), Some("3d"));
    assert_eq!(p.horizontal_dilution(), Some(1.4));
    assert_eq!(p.vertical_dilution(), Some(2.0));
    assert_eq!(p.position_dilution(), Some(2.4));
    assert_eq!(p.satellites(), Some(9));
    assert_eq!(p.speed(), Some(5.5));
}

// ---- tracks/ ----

#[test]
fn test_multi_segment_metrics() {
    let doc = load("tracks/multi_segment.gpx");
    assert_eq!(doc.creator.as_deref(), Some("Hand written"));
    assert_eq!(doc.tracks.len(), 2);

    let track = &doc.tracks[0];
    assert_eq!(track.name.as_deref(), Some("Holedna - Trista"));
    assert_eq!(track.description.as_deref(), Some("Two recording sessions"));
    assert_eq!(track.number, Some(1));
    assert_eq!(track.segments.len(), 2);

    let raw = track.elevation_gain_loss(false);
    assert_eq!(raw.uphill, 170.0);
    assert_eq!(raw.downhill, 220.0);

    let smooth = track.elevation_gain_loss(true);
    let by_segment = track.segments[0].elevation_gain_loss(true)
        + track.segments[1].elevation_gain_loss(true);
    assert_eq!(smooth, by_segment);
    assert!(smooth.uphill < raw.uphill);

    let segment_sum: f64 = track.segments.iter().map(|s| s.length_2d()).sum();
    assert!((track.length_2d() - segment_sum).abs() < 1e-9);
    assert!(track.length_2d() > 1000.0);
    assert!(track.length_3d() > 0.0);

    assert_eq!(track.duration().map(|d| d.num_minutes()), Some(30));
    assert_eq!(track.elevation_extremes(), Some((10.0, 200.0)));
}

#[test]
fn test_track_without_elevation() {
    let doc = load("tracks/multi_segment.gpx");
    let track = &doc.tracks[1];
    let r = track.elevation_gain_loss(true);
    assert_eq!(r.uphill, 0.0);
    assert_eq!(r.downhill, 0.0);
    assert!(track.elevation_extremes().is_none());

    // With no elevations the 3D length is the planar 2D approximation.
    let planar = track.length_3d();
    assert!((planar - 111.12).abs() < 0.01);
    assert!((track.length_2d() - planar).abs() < 1.0);
}

#[test]
fn test_fill_elevations_from_provider() {
    let mut doc = load("tracks/multi_segment.gpx");
    let before = doc.tracks[1].length_3d();

    for track in &mut doc.tracks {
        track.fill_elevations(&Staircase).unwrap();
    }

    let seg = &doc.tracks[0].segments[0];
    let elevations: Vec<f64> = seg.points().iter().filter_map(|p| p.elevation()).collect();
    assert_eq!(elevations, vec![1000.0, 1001.0, 1002.0, 1003.0, 1004.0]);

    let r = doc.tracks[1].elevation_gain_loss(false);
    assert_eq!(r.uphill, 1.0);
    assert!(doc.tracks[1].length_3d() > before);
}

#[test]
fn test_summary_of_fixture() {
    let doc = load("tracks/multi_segment.gpx");
    let summary = summarize(&doc, &SummaryOptions::default());
    assert_eq!(summary.name.as_deref(), Some("Brno loop"));
    assert_eq!(summary.tracks.len(), 2);
    assert_eq!(summary.tracks[0].duration_seconds, Some(1800));
    assert_eq!(summary.tracks[0].segments[1].points, 2);
    assert!(summary.tracks[1].duration_seconds.is_none());

    let text = summary.to_string();
    assert!(text.contains("Tracks: 2\n"));
    assert!(text.contains("  Track: No elevation\n"));
}

// ---- edge_cases/ ----

#[test]
fn test_empty() {
    let doc = load("edge_cases/empty.gpx");
    assert!(doc.waypoints.is_empty());
    assert!(doc.routes.is_empty());
    assert!(doc.tracks.is_empty());
    assert!(doc.creator.is_none());
}

#[test]
fn test_two_roots() {
    assert!(matches!(
        load_err("edge_cases/two_roots.gpx"),
        GpxError::MalformedDocument(_)
    ));
}

#[test]
fn test_no_latitude() {
    match load_err("edge_cases/no_latitude.gpx") {
        GpxError::MalformedDocument(msg) => assert!(msg.contains("waypoint")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_bad_time() {
    match load_err("edge_cases/bad_time.gpx") {
        GpxError::InvalidTimestamp(s) => assert_eq!(s, "2015-02-23 19:22:18"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_file_not_found() {
    let err = load_err("does/not/exist.gpx");
    assert!(matches!(err, GpxError::FileNotFound(_)));
    assert!(err.to_string().contains("does/not/exist.gpx"));
}

#[test]
fn test_directory_is_not_a_file() {
    assert!(matches!(
        load_err("basic"),
        GpxError::FileNotFound(_)
    ));
}

#[test]
fn test_file_written_at_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.gpx");
    std::fs::write(
        &path,
        r#"<gpx creator="tmp"><trk><trkseg><trkpt lat="0" lon="0"/><trkpt lat="1" lon="0"/></trkseg></trk></gpx>"#,
    )
    .unwrap();

    let doc = parse_gpx_file(&path).unwrap();
    assert_eq!(doc.creator.as_deref(), Some("tmp"));
    let expected = gpx_metrics::geo::haversine_distance(0.0, 0.0, 1.0, 0.0);
    assert!((doc.tracks[0].length_2d() - expected).abs() < 1e-6);
}

// ---- vendor/ ----

#[test]
fn test_garmin_extensions() {
    let doc = load("vendor/garmin_extensions.gpx");
    assert_eq!(doc.creator.as_deref(), Some("Garmin Connect"));
    // <metadata> is a GPX 1.1 wrapper that is not interpreted
    assert!(doc.time.is_none());

    let track = &doc.tracks[0];
    assert_eq!(track.name.as_deref(), Some("Garmin Activity"));
    let points = &track.segments[0].points();
    assert_eq!(points.len(), 3);
    assert_eq!(points[1].elevation(), Some(12.4));
    assert_eq!(track.duration().map(|d| d.num_seconds()), Some(120));
}

#[test]
fn test_string_and_file_agree() {
    let text = std::fs::read_to_string(fixture_path("vendor/garmin_extensions.gpx")).unwrap();
    let from_str = parse_gpx(&text).unwrap();
    let from_file = load("vendor/garmin_extensions.gpx");
    assert_eq!(
        serde_json::to_value(&from_str).unwrap(),
        serde_json::to_value(&from_file).unwrap()
    );
}

// ---- configuration ----

#[test]
fn test_registry_from_config() {
    let config = Config::from_toml("[elevation]\nprovider = \"mapquest\"\n").unwrap();
    let registry = ProviderRegistry::with_defaults();
    let name = config.elevation.provider.as_deref().unwrap();
    let provider = registry.create(name, &config.elevation).unwrap();

    // No key configured: fails before any network access.
    let mut doc = load("basic/track_segment.gpx");
    let err = doc.tracks[0].fill_elevations(provider.as_ref()).unwrap_err();
    assert!(matches!(
        err,
        GpxError::Provider(ProviderError::MissingCredential("key"))
    ));
    assert_eq!(doc.tracks[0].segments[0].points()[0].elevation(), Some(2376.0));
}

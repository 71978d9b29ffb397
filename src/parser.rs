use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, trace};
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;

use crate::error::{GpxError, Result};
use crate::geo::Location;
use crate::gpx_types::*;

static RE_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(?:\.(\d+))?Z$")
        .expect("valid timestamp regex")
});

/// Parse a GPX file from disk.
///
/// Fails with [`GpxError::FileNotFound`] before reading anything when `path`
/// is not an existing file.
pub fn parse_gpx_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(GpxError::FileNotFound(path.to_path_buf()));
    }
    debug!("reading {}", path.display());
    let xml = std::fs::read_to_string(path)?;
    parse_gpx(&xml)
}

/// Parse a GPX XML string into a Document.
///
/// The document must have exactly one root element, named `gpx`.
pub fn parse_gpx(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);
    let mut document: Option<Document> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let mut doc = start_root(&e, document.is_some())?;
                parse_root(&mut reader, &mut doc)?;
                document = Some(doc);
            }
            Ok(Event::Empty(e)) => {
                document = Some(start_root(&e, document.is_some())?);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    document.ok_or_else(|| {
        GpxError::MalformedDocument("document has no `gpx` root element".to_string())
    })
}

/// Parse a GPX timestamp, `YYYY-MM-DDTHH:MM:SS(.fraction)?Z`, always UTC.
///
/// Fractional seconds are kept to millisecond precision.
pub fn parse_time(val: &str) -> Result<DateTime<Utc>> {
    let invalid = || GpxError::InvalidTimestamp(val.to_string());
    let caps = RE_TIMESTAMP.captures(val).ok_or_else(invalid)?;
    let field = |i: usize| caps[i].parse::<u32>().map_err(|_| invalid());

    let year = caps[1].parse::<i32>().map_err(|_| invalid())?;
    let (month, day) = (field(2)?, field(3)?);
    let (hour, minute, second) = (field(4)?, field(5)?, field(6)?);
    // milliseconds; digits beyond the third are dropped
    let millis = match caps.get(7) {
        Some(fraction) => {
            let digits: String = fraction.as_str().chars().chain("00".chars()).take(3).collect();
            digits.parse::<u32>().map_err(|_| invalid())?
        }
        None => 0,
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_milli_opt(hour, minute, second, millis))
        .map(|dt| dt.and_utc())
        .ok_or_else(invalid)
}

fn start_root(e: &BytesStart<'_>, seen_root: bool) -> Result<Document> {
    if e.local_name().as_ref() != b"gpx" {
        return Err(GpxError::MalformedDocument(format!(
            "unexpected root element <{}>",
            String::from_utf8_lossy(e.name().as_ref())
        )));
    }
    if seen_root {
        return Err(GpxError::MalformedDocument(
            "document must have exactly one `gpx` root element".to_string(),
        ));
    }

    Ok(Document {
        creator: attribute(e, b"creator")?,
        ..Default::default()
    })
}

/// Walk the direct children of `<gpx>`.
fn parse_root<'a>(reader: &mut Reader<&'a [u8]>, doc: &mut Document) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"time" => doc.time = read_time(reader, &e)?,
                b"name" => doc.name = read_text_owned(reader, &e)?,
                b"desc" => doc.description = read_text_owned(reader, &e)?,
                b"author" => doc.author = read_text_owned(reader, &e)?,
                b"email" => doc.email = read_text_owned(reader, &e)?,
                b"url" => doc.url = read_text_owned(reader, &e)?,
                b"urlname" => doc.urlname = read_text_owned(reader, &e)?,
                b"keywords" => doc.keywords = read_text_owned(reader, &e)?,
                b"bounds" => {
                    parse_bounds(&e, doc)?;
                    skip(reader, &e)?;
                }
                b"wpt" => doc.waypoints.push(parse_point(&e, reader, "waypoint")?.into_waypoint()),
                b"rte" => doc.routes.push(parse_route(reader)?),
                b"trk" => doc.tracks.push(parse_track(reader)?),
                _ => skip(reader, &e)?,
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"bounds" => parse_bounds(&e, doc)?,
                b"wpt" => doc
                    .waypoints
                    .push(PointFields::new(parse_lat_lon(&e, "waypoint")?).into_waypoint()),
                b"rte" => doc.routes.push(Route::default()),
                b"trk" => doc.tracks.push(Track::default()),
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"gpx" => break,
            Ok(Event::Eof) => return Err(unexpected_eof(b"gpx")),
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(())
}

fn parse_bounds(e: &BytesStart<'_>, doc: &mut Document) -> Result<()> {
    doc.min_latitude = number_attribute(e, b"minlat", "minlat")?;
    doc.max_latitude = number_attribute(e, b"maxlat", "maxlat")?;
    doc.min_longitude = number_attribute(e, b"minlon", "minlon")?;
    doc.max_longitude = number_attribute(e, b"maxlon", "maxlon")?;
    Ok(())
}

/// Unescaped value of attribute `key`, if present.
fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr_result in e.attributes() {
        let attr = attr_result?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn number_attribute(
    e: &BytesStart<'_>,
    key: &[u8],
    attribute_name: &'static str,
) -> Result<Option<f64>> {
    match attribute(e, key)? {
        Some(val) => val
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| GpxError::InvalidAttribute {
                element: "bounds",
                attribute: attribute_name,
                value: val,
            }),
        None => Ok(None),
    }
}

/// Parse the required lat/lon attributes of a point element's start tag.
fn parse_lat_lon(e: &BytesStart<'_>, element: &'static str) -> Result<Location> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result?;
        let (slot, attribute) = match attr.key.local_name().as_ref() {
            b"lat" => (&mut lat, "lat"),
            b"lon" => (&mut lon, "lon"),
            _ => continue,
        };
        let value = attr.unescape_value()?;
        let parsed = value.trim().parse::<f64>().map_err(|_| GpxError::InvalidAttribute {
            element,
            attribute,
            value: value.trim().to_string(),
        })?;
        *slot = Some(parsed);
    }

    let lat = lat.ok_or_else(|| {
        GpxError::MalformedDocument(format!("{element} without latitude"))
    })?;
    let lon = lon.ok_or_else(|| {
        GpxError::MalformedDocument(format!("{element} without longitude"))
    })?;

    Location::new(lat, lon, None)
}

/// Every child value a point element may carry. Waypoints, route points and
/// track points each keep the subset they use.
struct PointFields {
    location: Location,
    time: Option<DateTime<Utc>>,
    name: Option<String>,
    desc: Option<String>,
    sym: Option<String>,
    point_type: Option<String>,
    cmt: Option<String>,
    fix: Option<String>,
    hdop: Option<f64>,
    vdop: Option<f64>,
    pdop: Option<f64>,
    sat: Option<u32>,
    speed: Option<f64>,
}

impl PointFields {
    fn new(location: Location) -> Self {
        Self {
            location,
            time: None,
            name: None,
            desc: None,
            sym: None,
            point_type: None,
            cmt: None,
            fix: None,
            hdop: None,
            vdop: None,
            pdop: None,
            sat: None,
            speed: None,
        }
    }

    fn into_waypoint(self) -> Waypoint {
        let mut wpt = Waypoint::new(self.location);
        wpt.time = self.time;
        wpt.name = self.name;
        wpt.description = self.desc;
        wpt.symbol = self.sym;
        wpt.point_type = self.point_type;
        wpt.comment = self.cmt;
        wpt.horizontal_dilution = self.hdop;
        wpt.vertical_dilution = self.vdop;
        wpt.position_dilution = self.pdop;
        wpt
    }

    fn into_track_point(self) -> TrackPoint {
        let mut pt = TrackPoint::new(self.location);
        pt.time = self.time;
        pt.name = self.name;
        pt.symbol = self.sym;
        pt.comment = self.cmt;
        pt.fix = self.fix;
        pt.horizontal_dilution = self.hdop;
        pt.vertical_dilution = self.vdop;
        pt.position_dilution = self.pdop;
        pt.satellites = self.sat;
        pt.speed = self.speed;
        pt
    }
}

/// Parse a point element (wpt, rtept, trkpt) and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    element: &'static str,
) -> Result<PointFields> {
    let mut point = PointFields::new(parse_lat_lon(start, element)?);
    let end_name = start.name().0.to_vec(); // own the end tag name for comparison

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ele" => {
                    let ele = read_number(reader, &e, "ele")?;
                    point.location.set_elevation(ele);
                }
                b"time" => point.time = read_time(reader, &e)?,
                b"name" => point.name = read_text_owned(reader, &e)?,
                b"desc" => point.desc = read_text_owned(reader, &e)?,
                b"sym" => point.sym = read_text_owned(reader, &e)?,
                b"type" => point.point_type = read_text_owned(reader, &e)?,
                b"cmt" | b"com" => point.cmt = read_text_owned(reader, &e)?,
                b"fix" => point.fix = read_text_owned(reader, &e)?,
                b"hdop" => point.hdop = read_number(reader, &e, "hdop")?,
                b"vdop" => point.vdop = read_number(reader, &e, "vdop")?,
                b"pdop" => point.pdop = read_number(reader, &e, "pdop")?,
                b"sat" => point.sat = read_number(reader, &e, "sat")?,
                b"speed" => point.speed = read_number(reader, &e, "speed")?,
                _ => skip(reader, &e)?,
            },
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => return Err(unexpected_eof(&end_name)),
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(point)
}

/// Parse a <rte> element.
fn parse_route<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Route> {
    let mut route = Route::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => route.name = read_text_owned(reader, &e)?,
                b"desc" => route.description = read_text_owned(reader, &e)?,
                b"number" => route.number = read_number(reader, &e, "number")?,
                b"rtept" => route
                    .points
                    .push(parse_point(&e, reader, "route point")?.into_waypoint()),
                _ => skip(reader, &e)?,
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"rtept" {
                    let location = parse_lat_lon(&e, "route point")?;
                    route.points.push(Waypoint::new(location));
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"rte" => break,
            Ok(Event::Eof) => return Err(unexpected_eof(b"rte")),
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(route)
}

/// Parse a <trk> element.
fn parse_track<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Track> {
    let mut track = Track::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => track.name = read_text_owned(reader, &e)?,
                b"desc" => track.description = read_text_owned(reader, &e)?,
                b"number" => track.number = read_number(reader, &e, "number")?,
                b"trkseg" => track.segments.push(parse_segment(reader)?),
                _ => skip(reader, &e)?,
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"trkseg" {
                    track.segments.push(Segment::default());
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trk" => break,
            Ok(Event::Eof) => return Err(unexpected_eof(b"trk")),
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(track)
}

/// Parse a <trkseg> element.
fn parse_segment<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Segment> {
    let mut segment = Segment::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkpt" => segment
                    .points
                    .push(parse_point(&e, reader, "track point")?.into_track_point()),
                _ => skip(reader, &e)?,
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"trkpt" {
                    let location = parse_lat_lon(&e, "track point")?;
                    segment.points.push(TrackPoint::new(location));
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trkseg" => break,
            Ok(Event::Eof) => return Err(unexpected_eof(b"trkseg")),
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(segment)
}

/// Skip an element we don't interpret, including all of its children.
fn skip<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'a>) -> Result<()> {
    trace!(
        "skipping <{}>",
        String::from_utf8_lossy(start.name().as_ref())
    );
    reader.read_to_end(start.name())?;
    Ok(())
}

/// Text of a timestamp element, parsed with [`parse_time`].
fn read_time<'a>(
    reader: &mut Reader<&'a [u8]>,
    start: &BytesStart<'_>,
) -> Result<Option<DateTime<Utc>>> {
    read_text_owned(reader, start)?
        .map(|text| parse_time(text.trim()))
        .transpose()
}

/// Text of a numeric element. Empty elements are absent, garbage is an error.
fn read_number<'a, T: FromStr>(
    reader: &mut Reader<&'a [u8]>,
    start: &BytesStart<'_>,
    element: &'static str,
) -> Result<Option<T>> {
    match read_text_owned(reader, start)? {
        Some(text) => text
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| GpxError::InvalidValue {
                element,
                value: text,
            }),
        None => Ok(None),
    }
}

/// Text content of an element, with CDATA sections and entity references
/// resolved; `None` when the element has no text.
fn read_text_owned<'a>(
    reader: &mut Reader<&'a [u8]>,
    start: &BytesStart<'_>,
) -> Result<Option<String>> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => text.push_str(&e.decode().map_err(quick_xml::Error::from)?),
            Ok(Event::CData(e)) => text.push_str(&e.decode().map_err(quick_xml::Error::from)?),
            Ok(Event::GeneralRef(e)) => {
                if let Some(ch) = e.resolve_char_ref()? {
                    text.push(ch);
                } else {
                    let name = e.decode().map_err(quick_xml::Error::from)?;
                    match resolve_predefined_entity(&name) {
                        Some(value) => text.push_str(value),
                        None => trace!("dropping unknown entity &{name};"),
                    }
                }
            }
            Ok(Event::Start(e)) => skip(reader, &e)?,
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => return Err(unexpected_eof(&end_name)),
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(if text.is_empty() { None } else { Some(text) })
}

fn unexpected_eof(element: &[u8]) -> GpxError {
    GpxError::MalformedDocument(format!(
        "unexpected end of document inside <{}>",
        String::from_utf8_lossy(element)
    ))
}

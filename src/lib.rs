//! GPX track reading with distance and elevation metrics.

pub mod config;
pub mod elevation;
pub mod error;
pub mod geo;
pub mod gpx_types;
pub mod options;
pub mod parser;
pub mod report;

use wasm_bindgen::prelude::*;

pub use crate::elevation::{ElevationProvider, MapQuestProvider, ProviderRegistry};
pub use crate::error::{GpxError, ProviderError, Result};
pub use crate::geo::{LengthMode, Location, UpDownHill};
pub use crate::gpx_types::{Document, Route, Segment, Track, TrackPoint, Waypoint};
pub use crate::options::SummaryOptions;
pub use crate::parser::{parse_gpx, parse_gpx_file, parse_time};
pub use crate::report::{DocumentSummary, summarize};

/// Parse a GPX string and summarize its tracks, returned as a JS object.
#[wasm_bindgen(js_name = gpxSummary)]
pub fn gpx_summary(gpx_string: &str, options: JsValue) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let doc = parser::parse_gpx(gpx_string)?;
    let summary = report::summarize(&doc, &opts);
    serde_wasm_bindgen::to_value(&summary).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Parse a GPX string and summarize its tracks, returned as a JSON string.
#[wasm_bindgen(js_name = gpxSummaryString)]
pub fn gpx_summary_string(
    gpx_string: &str,
    options: JsValue,
) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let doc = parser::parse_gpx(gpx_string)?;
    let summary = report::summarize(&doc, &opts);
    serde_json::to_string(&summary).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_options(options: JsValue) -> std::result::Result<SummaryOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(SummaryOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

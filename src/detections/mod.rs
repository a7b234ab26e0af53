//! # Cardinal views and detections
//!
//! A photosphere capture is an equirectangular panorama, [`PHOTOSPHERE_WIDTH_PX`] pixels
//! wide, whose left edge looks along the capture heading. Eight square crops of
//! [`CARDINAL_CROP_PX`] pixels are cut side by side from the horizontal band starting at
//! row [`CARDINAL_BAND_TOP_PX`]; each covers [`CARDINAL_VIEW_SPAN`] degrees.
//!
//! ```text
//! crop n : x ∈ [1000·n, 1000·(n+1)),  y ∈ [1550, 2550)
//! direction(n) = heading + 22.5 + 45·n            (centre of the crop)
//! bearing(px)  = direction(n) − 22.5 + px · 0.045  (px = detection centre column)
//! ```
//!
//! An object detector run on a crop yields [`Detection`]s (class, confidence, pixel box).
//! [`observations_from_capture`] turns the detections of one capture into
//! [`Observation`]s located at the capture point and pointing at the detected object.

use std::fmt;

use camino::Utf8Path;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::bearing::{add_degrees, normalize_degrees, CardinalSector};
use crate::constants::{
    Degree, Feet, ObservationId, CARDINAL_BAND_TOP_PX, CARDINAL_CROP_PX, CARDINAL_VIEW_COUNT,
    CARDINAL_VIEW_SPAN, DEGREES_PER_PIXEL, MAX_DETECTIONS_PER_VIEW, PHOTOSPHERE_WIDTH_PX,
    VIEWER_BASE_URL,
};
use crate::geoloc_errors::GeolocError;
use crate::observations::Observation;
use crate::ref_system::GeoPoint;

/// Object classes the survey looks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectClass {
    StopSign,
    FireHydrant,
    Other(String),
}

impl ObjectClass {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "stop sign" => ObjectClass::StopSign,
            "fire hydrant" => ObjectClass::FireHydrant,
            other => ObjectClass::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ObjectClass::StopSign => "stop sign",
            ObjectClass::FireHydrant => "fire hydrant",
            ObjectClass::Other(label) => label,
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Axis-aligned pixel box: top-left corner, width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl PixelRect {
    pub fn center_x(&self) -> f64 {
        self.x + self.w / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.h / 2.0
    }
}

/// One detector hit inside a cardinal crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    pub rect: PixelRect,
}

impl Detection {
    pub fn class(&self) -> ObjectClass {
        ObjectClass::from_label(&self.label)
    }
}

/// A photosphere capture point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotosphereCapture {
    pub image_name: String,
    pub easting: Feet,
    pub northing: Feet,
    /// Direction of the panorama's left edge, degrees clockwise from north
    pub heading: Degree,
    /// Geographic position of the capture, when known
    pub position: Option<GeoPoint>,
}

/// Pixel window of a crop inside the photosphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropWindow {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// One of the eight crops of a photosphere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardinalView {
    /// 1-based position of the crop, left to right
    pub number: usize,
    /// Bearing of the crop centre
    pub direction: Degree,
    pub sector: CardinalSector,
    pub crop: CropWindow,
    pub image_name: String,
}

impl CardinalView {
    /// Bearing from the capture point toward a pixel column of this crop.
    pub fn bearing_at(&self, column: f64) -> Degree {
        normalize_degrees(self.direction - CARDINAL_VIEW_SPAN / 2.0 + column * DEGREES_PER_PIXEL)
    }

    /// Panorama viewer link looking along this crop, if the capture position is known.
    pub fn viewer_url(&self, capture: &PhotosphereCapture) -> Option<String> {
        capture.position.map(|p| {
            format!(
                "{VIEWER_BASE_URL}&viewpoint={},{}&heading={}",
                p.latitude, p.longitude, self.direction
            )
        })
    }
}

/// The eight cardinal crops of a capture.
///
/// Errors
/// ----------
/// * [`GeolocError::UndefinedBearing`] if the capture heading is not finite.
pub fn cardinal_views(capture: &PhotosphereCapture) -> Result<Vec<CardinalView>, GeolocError> {
    if !capture.heading.is_finite() {
        return Err(GeolocError::UndefinedBearing(format!(
            "capture {} has heading {}",
            capture.image_name, capture.heading
        )));
    }

    let stem = Utf8Path::new(&capture.image_name)
        .file_stem()
        .unwrap_or(capture.image_name.as_str());
    let first = add_degrees(capture.heading, CARDINAL_VIEW_SPAN / 2.0);
    let step = PHOTOSPHERE_WIDTH_PX / CARDINAL_VIEW_COUNT as u32;

    (0..CARDINAL_VIEW_COUNT)
        .map(|n| {
            let direction = add_degrees(first, CARDINAL_VIEW_SPAN * n as f64);
            let sector = CardinalSector::from_bearing(direction)?;
            Ok(CardinalView {
                number: n + 1,
                direction,
                sector,
                crop: CropWindow {
                    left: step * n as u32,
                    top: CARDINAL_BAND_TOP_PX,
                    width: CARDINAL_CROP_PX,
                    height: CARDINAL_CROP_PX,
                },
                image_name: format!("{stem}_{}_{sector}.jpg", n + 1),
            })
        })
        .collect()
}

/// Detections of one cardinal view, capped at [`MAX_DETECTIONS_PER_VIEW`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDetections {
    view: CardinalView,
    detections: Vec<Detection>,
}

impl ViewDetections {
    /// Attach detections to a view, keeping the first [`MAX_DETECTIONS_PER_VIEW`].
    pub fn new(view: CardinalView, mut detections: Vec<Detection>) -> Self {
        if detections.len() > MAX_DETECTIONS_PER_VIEW {
            warn!(
                "{}: dropping {} detections over the limit of {MAX_DETECTIONS_PER_VIEW}",
                view.image_name,
                detections.len() - MAX_DETECTIONS_PER_VIEW
            );
            detections.truncate(MAX_DETECTIONS_PER_VIEW);
        }
        ViewDetections { view, detections }
    }

    pub fn view(&self) -> &CardinalView {
        &self.view
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }
}

/// Bearing from the capture point toward a detection.
pub fn object_bearing(view: &CardinalView, detection: &Detection) -> Degree {
    view.bearing_at(detection.rect.center_x())
}

/// Convert the detections of one capture into observations.
///
/// Arguments
/// -----------------
/// * `capture`: the capture point the views were cut from.
/// * `views`: detections grouped by cardinal view.
/// * `classes`: classes to keep; an empty slice keeps every class.
/// * `min_confidence`: detections strictly below this confidence are dropped.
/// * `next_id`: next free observation id, advanced for each observation created.
///
/// Return
/// ----------
/// * One [`Observation`] per kept detection, in view then detection order.
pub fn observations_from_capture(
    capture: &PhotosphereCapture,
    views: &[ViewDetections],
    classes: &[ObjectClass],
    min_confidence: f64,
    next_id: &mut ObservationId,
) -> Result<Vec<Observation>, GeolocError> {
    let mut observations = Vec::new();

    for view in views {
        for detection in view.detections() {
            if detection.confidence < min_confidence {
                continue;
            }
            let class = detection.class();
            if !classes.is_empty() && !classes.contains(&class) {
                continue;
            }

            let obs = Observation::new(
                *next_id,
                capture.easting,
                capture.northing,
                object_bearing(view.view(), detection),
                class.label(),
            )?
            .with_confidence(detection.confidence);

            *next_id += 1;
            observations.push(obs);
        }
    }

    Ok(observations)
}

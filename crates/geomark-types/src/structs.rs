//! Core entity structs: markers, query rectangles, and the simulation
//! geofence.
//!
//! Wire shapes follow the query service's JSON contract:
//!
//! - [`Marker`]: `{"id": "...", "coordinates": [x, y], "name": "..."}`
//! - [`Rect`]: `[x0, y0, x1, y1]`
//! - [`Coordinates`]: `[x, y]`

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::MarkerId;

// =============================================================================
// Coordinates
// =============================================================================

/// A point in the continuous 2-D plane.
///
/// The store imposes no unit. The simulator treats the two axes as
/// longitude/latitude-like degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinates(pub [f64; 2]);

impl Coordinates {
    /// Build from the two axis values.
    pub const fn new(x: f64, y: f64) -> Self {
        Self([x, y])
    }

    /// The first axis.
    pub const fn x(&self) -> f64 {
        let [x, _] = self.0;
        x
    }

    /// The second axis.
    pub const fn y(&self) -> f64 {
        let [_, y] = self.0;
        y
    }

    /// Whether both components are finite reals.
    pub const fn is_finite(&self) -> bool {
        self.x().is_finite() && self.y().is_finite()
    }
}

// =============================================================================
// Marker
// =============================================================================

/// A positioned, named entity held by the marker store.
///
/// Markers are only ever replaced as a whole: every put carries the id,
/// the coordinates, and the name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Marker {
    /// Store-unique id. Empty on create; the store assigns one.
    #[serde(default)]
    pub id: MarkerId,
    /// Position of the marker.
    pub coordinates: Coordinates,
    /// Display name, preserved verbatim.
    pub name: String,
}

impl Marker {
    /// Create a marker that has not been assigned an id yet.
    pub fn unassigned(coordinates: Coordinates, name: impl Into<String>) -> Self {
        Self {
            id: MarkerId::default(),
            coordinates,
            name: name.into(),
        }
    }

    /// Return a copy of this marker moved to `coordinates`.
    #[must_use]
    pub fn moved_to(&self, coordinates: Coordinates) -> Self {
        Self {
            id: self.id.clone(),
            coordinates,
            name: self.name.clone(),
        }
    }
}

// =============================================================================
// Rect
// =============================================================================

/// Reasons a rectangle cannot be built from raw numbers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RectError {
    /// The rectangle did not have exactly four components.
    #[error("rectangle needs exactly 4 numbers, got {0}")]
    Arity(usize),

    /// A component was NaN or infinite.
    #[error("rectangle component {0} is not a finite number")]
    NotFinite(usize),
}

/// An axis-aligned query rectangle.
///
/// Built from `[x0, y0, x1, y1]`. Corners are normalised so that
/// `min <= max` on both axes regardless of the order they were given in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 4]")]
pub struct Rect {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Rect {
    /// Build a rectangle from two opposite corners.
    ///
    /// # Errors
    ///
    /// Returns [`RectError::NotFinite`] if any value is NaN or infinite.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self, RectError> {
        for (i, v) in [x0, y0, x1, y1].into_iter().enumerate() {
            if !v.is_finite() {
                return Err(RectError::NotFinite(i));
            }
        }
        Ok(Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        })
    }

    /// Build a rectangle from a `[x0, y0, x1, y1]` slice.
    ///
    /// # Errors
    ///
    /// Returns [`RectError::Arity`] unless the slice has exactly four
    /// elements, or [`RectError::NotFinite`] for NaN/infinite values.
    pub fn from_slice(values: &[f64]) -> Result<Self, RectError> {
        match *values {
            [x0, y0, x1, y1] => Self::new(x0, y0, x1, y1),
            _ => Err(RectError::Arity(values.len())),
        }
    }

    /// Lower-left corner.
    pub const fn min(&self) -> Coordinates {
        Coordinates::new(self.min_x, self.min_y)
    }

    /// Upper-right corner.
    pub const fn max(&self) -> Coordinates {
        Coordinates::new(self.max_x, self.max_y)
    }

    /// Lowest x value.
    pub const fn min_x(&self) -> f64 {
        self.min_x
    }

    /// Highest x value.
    pub const fn max_x(&self) -> f64 {
        self.max_x
    }

    /// Lowest y value.
    pub const fn min_y(&self) -> f64 {
        self.min_y
    }

    /// Highest y value.
    pub const fn max_y(&self) -> f64 {
        self.max_y
    }

    /// Closed containment test: edges count as inside.
    pub fn contains(&self, point: &Coordinates) -> bool {
        let (x, y) = (point.x(), point.y());
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Pull `point` onto the nearest position inside the rectangle, one
    /// axis at a time.
    pub fn clamp(&self, point: &Coordinates) -> Coordinates {
        Coordinates::new(
            point.x().max(self.min_x).min(self.max_x),
            point.y().max(self.min_y).min(self.max_y),
        )
    }
}

impl TryFrom<Vec<f64>> for Rect {
    type Error = RectError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_slice(&values)
    }
}

impl From<Rect> for [f64; 4] {
    fn from(rect: Rect) -> Self {
        [rect.min_x, rect.min_y, rect.max_x, rect.max_y]
    }
}

// =============================================================================
// Geofence
// =============================================================================

/// Reasons a geofence is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeofenceError {
    /// The bounding rectangle is invalid.
    #[error("invalid geofence bounds: {0}")]
    Bounds(#[from] RectError),

    /// The center lies outside the bounds or is not finite.
    #[error("geofence center must be a finite point inside the bounds")]
    CenterOutside,
}

/// Raw geofence as it appears in configuration files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeofenceSpec {
    /// `[min_x, min_y, max_x, max_y]`.
    pub bounds: Vec<f64>,
    /// `[cx, cy]`.
    pub center: Coordinates,
}

/// The rectangle and attracting center that bound the simulator's random
/// walk. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeofenceSpec", into = "GeofenceSpec")]
pub struct Geofence {
    bounds: Rect,
    center: Coordinates,
}

impl Geofence {
    /// Build a geofence, checking that the center lies inside the bounds.
    ///
    /// # Errors
    ///
    /// Returns [`GeofenceError::CenterOutside`] if the center is outside
    /// the rectangle or not finite.
    pub fn new(bounds: Rect, center: Coordinates) -> Result<Self, GeofenceError> {
        if !center.is_finite() || !bounds.contains(&center) {
            return Err(GeofenceError::CenterOutside);
        }
        Ok(Self { bounds, center })
    }

    /// The bounding rectangle.
    pub const fn bounds(&self) -> &Rect {
        &self.bounds
    }

    /// The point markers drift towards.
    pub const fn center(&self) -> Coordinates {
        self.center
    }
}

impl Default for Geofence {
    /// The Saint Petersburg box the load generator walks markers in.
    fn default() -> Self {
        Self {
            bounds: Rect {
                min_x: 298.02,
                min_y: 148.52,
                max_x: 299.64,
                max_y: 149.20,
            },
            center: Coordinates::new(299.12, 148.80),
        }
    }
}

impl TryFrom<GeofenceSpec> for Geofence {
    type Error = GeofenceError;

    fn try_from(raw: GeofenceSpec) -> Result<Self, Self::Error> {
        let bounds = Rect::from_slice(&raw.bounds)?;
        Self::new(bounds, raw.center)
    }
}

impl From<Geofence> for GeofenceSpec {
    fn from(fence: Geofence) -> Self {
        Self {
            bounds: <[f64; 4]>::from(fence.bounds).to_vec(),
            center: fence.center,
        }
    }
}

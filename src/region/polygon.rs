//! Polygons and their points.

use serde_json::{json, Map, Value};

use super::capability::{Resizable, Serializable};
use crate::error::RegionError;
use crate::geom::{CoordsType, MediaSize, RegionId};

/// Squared radius (display pixels) around the first point inside which a
/// click closes the polygon.
pub const CLOSE_DISTANCE_SQ: f64 = 50.0;

/// Points required before a polygon may close.
pub const MIN_POINTS_TO_CLOSE: usize = 2;

/// One vertex of a polygon.
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonPoint {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub relative_x: f64,
    pub relative_y: f64,
    /// Owning region, looked up through the arena.
    pub region: RegionId,
}

impl PolygonPoint {
    fn sync_relative(&mut self, media: &MediaSize) {
        if media.is_measured() {
            self.relative_x = media.x_to_percent(self.x);
            self.relative_y = media.y_to_percent(self.y);
        }
    }
}

/// Foot of the perpendicular from `c` onto the line through `p1` and `p2`.
///
/// Degenerate edges (`p1 == p2`) return `p1`.
pub fn anchor_point(p1: (f64, f64), p2: (f64, f64), c: (f64, f64)) -> (f64, f64) {
    let (dx, dy) = (p2.0 - p1.0, p2.1 - p1.1);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p1;
    }
    let t = ((c.0 - p1.0) * dx + (c.1 - p1.1) * dy) / len_sq;
    (p1.0 + t * dx, p1.1 + t * dy)
}

/// An ordered sequence of points, open while drawing and closed once sealed.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub region: RegionId,
    pub points: Vec<PolygonPoint>,
    pub closed: bool,
}

impl Polygon {
    pub fn new(region: RegionId) -> Self {
        Self {
            region,
            points: Vec::new(),
            closed: false,
        }
    }

    /// Builds a polygon from percentage pairs.
    pub fn from_percent(region: RegionId, points: &[(f64, f64)], closed: bool) -> Self {
        let points = points
            .iter()
            .enumerate()
            .map(|(index, &(x, y))| PolygonPoint {
                index,
                x,
                y,
                relative_x: x,
                relative_y: y,
                region,
            })
            .collect();
        Self {
            region,
            points,
            closed,
        }
    }

    /// Appends a point in display pixels.
    pub fn add_point(&mut self, x: f64, y: f64, media: &MediaSize) {
        let index = self.points.len();
        self.insert_point(index, x, y, media);
    }

    /// Inserts a point at `index`, shifting later points.
    pub fn insert_point(&mut self, index: usize, x: f64, y: f64, media: &MediaSize) {
        let mut point = PolygonPoint {
            index,
            x,
            y,
            relative_x: 0.0,
            relative_y: 0.0,
            region: self.region,
        };
        point.sync_relative(media);
        let index = index.min(self.points.len());
        self.points.insert(index, point);
        self.reindex();
    }

    /// Inserts a point on the edge starting at `edge`, projected from the
    /// cursor onto that edge. Returns the new point's index.
    pub fn insert_on_edge(&mut self, edge: usize, cursor: (f64, f64), media: &MediaSize) -> Result<usize, RegionError> {
        let n = self.points.len();
        if n < 2 || edge >= n || (!self.closed && edge + 1 >= n) {
            return Err(RegionError::geometry(format!("polygon has no edge {edge}")));
        }
        let p1 = &self.points[edge];
        let p2 = &self.points[(edge + 1) % n];
        let (x, y) = anchor_point((p1.x, p1.y), (p2.x, p2.y), cursor);
        self.insert_point(edge + 1, x, y, media);
        Ok(edge + 1)
    }

    pub fn move_point(&mut self, index: usize, x: f64, y: f64, media: &MediaSize) -> Result<(), RegionError> {
        let point = self
            .points
            .get_mut(index)
            .ok_or_else(|| RegionError::geometry(format!("polygon has no point {index}")))?;
        point.x = x;
        point.y = y;
        point.sync_relative(media);
        Ok(())
    }

    /// Removes a point. A closed polygon keeps at least three points.
    pub fn remove_point(&mut self, index: usize) -> Result<PolygonPoint, RegionError> {
        if index >= self.points.len() {
            return Err(RegionError::geometry(format!("polygon has no point {index}")));
        }
        if self.closed && self.points.len() <= 3 {
            return Err(RegionError::geometry("a closed polygon needs at least three points"));
        }
        let removed = self.points.remove(index);
        self.reindex();
        Ok(removed)
    }

    /// True when a click at (x, y) would seal the polygon.
    pub fn can_close(&self, x: f64, y: f64) -> bool {
        if self.closed || self.points.len() < MIN_POINTS_TO_CLOSE {
            return false;
        }
        let first = &self.points[0];
        let (dx, dy) = (first.x - x, first.y - y);
        dx * dx + dy * dy < CLOSE_DISTANCE_SQ
    }

    /// Seals the polygon. Fails with fewer than [`MIN_POINTS_TO_CLOSE`] points.
    pub fn close(&mut self) -> Result<(), RegionError> {
        if self.points.len() < MIN_POINTS_TO_CLOSE {
            return Err(RegionError::geometry(format!(
                "polygon needs at least {MIN_POINTS_TO_CLOSE} points to close"
            )));
        }
        self.closed = true;
        Ok(())
    }

    pub fn translate(&mut self, dx: f64, dy: f64, media: &MediaSize) {
        for point in &mut self.points {
            point.x += dx;
            point.y += dy;
            point.sync_relative(media);
        }
    }

    /// Even-odd ray casting; open polygons never contain anything.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if !self.closed || self.points.len() < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = self.points.len() - 1;
        for i in 0..self.points.len() {
            let (pi, pj) = (&self.points[i], &self.points[j]);
            if (pi.y > y) != (pj.y > y) && x < (pj.x - pi.x) * (y - pi.y) / (pj.y - pi.y) + pi.x {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    pub fn destroy(&mut self) {
        self.points.clear();
        self.closed = false;
    }

    fn reindex(&mut self) {
        for (index, point) in self.points.iter_mut().enumerate() {
            point.index = index;
        }
    }
}

impl Serializable for Polygon {
    fn serialize(&self, coordstype: CoordsType, media: &MediaSize) -> Result<Map<String, Value>, RegionError> {
        if coordstype == CoordsType::Px && !media.is_measured() {
            return Err(RegionError::geometry(
                "polygon is in pixels but the display size is unknown",
            ));
        }
        let points: Vec<Value> = self
            .points
            .iter()
            .map(|p| match coordstype {
                CoordsType::Perc => json!([p.x, p.y]),
                CoordsType::Px => json!([media.x_to_percent(p.x), media.y_to_percent(p.y)]),
            })
            .collect();
        let mut value = Map::new();
        value.insert("points".into(), Value::Array(points));
        value.insert("closed".into(), json!(self.closed));
        Ok(value)
    }
}

impl Resizable for Polygon {
    fn update_image_size(&mut self, coordstype: CoordsType, media: &MediaSize) {
        for point in &mut self.points {
            if coordstype == CoordsType::Perc {
                point.relative_x = point.x;
                point.relative_y = point.y;
            }
            point.x = media.x_to_pixels(point.relative_x);
            point.y = media.y_to_pixels(point.relative_y);
        }
    }
}

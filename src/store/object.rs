//! Labeled objects: the data fields regions are drawn on.

use image::RgbaImage;

use crate::config::{ObjectKind, ObjectTag};
use crate::geom::{MediaSize, RegionId};

/// One data field being annotated.
///
/// The object only lists its regions by id; the regions themselves live in
/// the annotation's arena. The last id in `regions` is the one a tool may
/// still be drawing.
#[derive(Clone, Debug)]
pub struct LabeledObject {
    pub name: String,
    pub kind: ObjectKind,
    /// Data reference, e.g. `$image`.
    pub value: String,
    /// Resolved data value (URL for media, text for text objects).
    pub source: Option<String>,
    pub media: MediaSize,
    pub regions: Vec<RegionId>,
    /// Decoded pixels, supplied by the host for flood fill.
    pub pixels: Option<RgbaImage>,
}

impl LabeledObject {
    pub fn new(tag: &ObjectTag, source: Option<String>) -> Self {
        Self {
            name: tag.name.clone(),
            kind: tag.kind,
            value: tag.value.clone(),
            source,
            media: MediaSize::default(),
            regions: Vec::new(),
            pixels: None,
        }
    }

    /// Text content for text-like objects.
    pub fn content(&self) -> Option<&str> {
        match self.kind {
            ObjectKind::Text | ObjectKind::HyperText => self.source.as_deref(),
            _ => None,
        }
    }

    /// The most recently added region.
    pub fn last_region(&self) -> Option<RegionId> {
        self.regions.last().copied()
    }

    pub fn contains(&self, id: RegionId) -> bool {
        self.regions.contains(&id)
    }

    pub(crate) fn push_region(&mut self, id: RegionId) {
        self.regions.push(id);
    }

    pub(crate) fn remove_region(&mut self, id: RegionId) -> bool {
        let before = self.regions.len();
        self.regions.retain(|r| *r != id);
        before != self.regions.len()
    }
}

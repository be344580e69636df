//! Capability interfaces composed by regions and shapes.
//!
//! Each capability is a separate small trait. [`Region`](super::Region)
//! implements the selection and classification ones; every concrete shape
//! implements [`Serializable`] and [`Resizable`] on its own.

use serde_json::{Map, Value};

use super::LabelState;
use crate::error::RegionError;
use crate::geom::{CoordsType, MediaSize};

/// Something the user can select.
pub trait Selectable {
    fn is_selected(&self) -> bool;
    fn set_selected(&mut self, selected: bool);
}

/// Something that can be visually highlighted (hover, relation candidate).
///
/// Highlighting never affects persisted state.
pub trait Highlightable {
    fn is_highlighted(&self) -> bool;
    fn set_highlight(&mut self, highlighted: bool);
}

/// Something that carries classification states.
pub trait Classifiable {
    /// Attached states in attachment order.
    fn states(&self) -> &[LabelState];

    /// Attaches a state, replacing any state from the same control.
    fn attach_state(&mut self, state: LabelState);

    /// Detaches the state of `control`, returning it.
    fn detach_state(&mut self, control: &str) -> Option<LabelState>;

    /// Returns the state attached by `control`, if any.
    fn state(&self, control: &str) -> Option<&LabelState> {
        self.states().iter().find(|state| state.control == control)
    }

    /// All selected values across states.
    fn label_values(&self) -> Vec<&str> {
        self.states()
            .iter()
            .flat_map(|state| state.values.iter().map(String::as_str))
            .collect()
    }
}

/// Geometry that can be written as the shape-specific part of a wire value.
pub trait Serializable {
    /// Returns the geometric fields of the wire `value` object, with all
    /// positions expressed as percentages of the media.
    fn serialize(&self, coordstype: CoordsType, media: &MediaSize) -> Result<Map<String, Value>, RegionError>;
}

/// Geometry whose pixel coordinates depend on the display size.
pub trait Resizable {
    /// Recomputes pixel coordinates for the current display size.
    ///
    /// With `CoordsType::Perc` the stored values are percentages and are
    /// converted in place; with `CoordsType::Px` pixels are recomputed from
    /// the percentage shadow kept alongside them.
    fn update_image_size(&mut self, coordstype: CoordsType, media: &MediaSize);
}

//! Geometry primitives shared by every region type.
//!
//! This module holds the stateless parts of the engine:
//!
//! 1. **Transforms**: pure conversions between natural pixels, display
//!    pixels and percentages, plus the [`MediaSize`] they are computed from.
//! 2. **Identifiers**: the arena key [`RegionId`] and pairing id generation.
//! 3. **Raster helpers**: flood fill and border tracing.

pub mod floodfill;
mod ids;
pub mod transform;

// Re-export core types for convenient access
pub use ids::{IdGenerator, RegionId, PID_LEN};
pub use transform::{to_percent, to_pixels, CoordsType, MediaSize};

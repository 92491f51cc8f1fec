//! The pure, side-effect-free core: geometry, track sizing, the grid
//! engine and the split-ratio manager. Nothing in this module touches the
//! filesystem or the server connection.
pub mod geometry;
pub mod grid;
pub mod ratio;
pub mod track;

pub use geometry::{Direction, Rect};
pub use track::TrackSize;

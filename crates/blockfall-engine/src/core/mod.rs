pub use self::{geometry::*, palette::*, piece::*, raster::*, rotation::*};

pub(crate) mod geometry;
pub(crate) mod palette;
pub(crate) mod piece;
pub(crate) mod raster;
pub(crate) mod rotation;

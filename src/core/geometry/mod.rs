pub mod base;
pub mod pvarray;
pub mod pvground;
pub mod pvrow;
pub mod surface;

pub use pvarray::{OrderedPVArray, SurfaceLocation};
pub use pvground::PVGround;
pub use pvrow::{PVRow, PVRowSide, Side};
pub use surface::{PVSegment, PVSurface};

pub mod edit_shape;
pub mod envelope_1d;
pub mod envelope_2d;
pub mod line;
pub mod multi_path;

pub use edit_shape::{EditShape, GeometryId, PathId, VertexId};
pub use envelope_1d::Envelope1D;
pub use envelope_2d::{Envelope2D, ExtendedClip, LineClip, LineExtension};
pub use line::Line;
pub use multi_path::{FillRule, MultiPath, PathKind};

use crate::math::Point2;

/// The geometry kinds accepted by kernel operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point2),
    Line(Line),
    Envelope(Envelope2D),
    MultiPath(MultiPath),
}

impl Geometry {
    /// Short type name for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "point",
            Self::Line(_) => "line",
            Self::Envelope(_) => "envelope",
            Self::MultiPath(mp) if mp.is_polygon() => "polygon",
            Self::MultiPath(_) => "polyline",
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Point(p) => p.x.is_nan() || p.y.is_nan(),
            Self::Line(_) => false,
            Self::Envelope(e) => e.is_empty(),
            Self::MultiPath(mp) => mp.is_empty(),
        }
    }

    #[must_use]
    pub fn envelope(&self) -> Envelope2D {
        match self {
            Self::Point(p) => Envelope2D::from_point(p),
            Self::Line(l) => l.envelope(),
            Self::Envelope(e) => *e,
            Self::MultiPath(mp) => mp.envelope(),
        }
    }
}

impl From<MultiPath> for Geometry {
    fn from(mp: MultiPath) -> Self {
        Self::MultiPath(mp)
    }
}

impl From<Envelope2D> for Geometry {
    fn from(env: Envelope2D) -> Self {
        Self::Envelope(env)
    }
}

impl From<Line> for Geometry {
    fn from(line: Line) -> Self {
        Self::Line(line)
    }
}

mod transform;
mod view;

pub use transform::Affine2;
pub use view::{EntityView, EntityViewKind, LineKind, RenderSink};

//! vision_core: shared frame/detector/frame-source interfaces and box overlay helpers.

pub mod interfaces;
pub mod overlay;

pub mod prelude {
    pub use crate::interfaces::*;
    pub use crate::overlay::*;
}

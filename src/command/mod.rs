//! Command interpretation: vocabulary tables, keyword extraction and the
//! motion commands understood by the car controller

mod extractor;
mod motion;
mod vocabulary;

pub use extractor::extract;
pub use motion::{MotionCommand, PrimitiveCommand};
pub use vocabulary::{Language, Vocabulary};

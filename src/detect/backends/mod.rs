pub mod null;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use null::NullObjectDetector;

#[cfg(feature = "backend-tract")]
pub use tract::TractObjectDetector;

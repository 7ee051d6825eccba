pub mod null;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use null::NullActionRecognizer;

#[cfg(feature = "backend-tract")]
pub use tract::TractActionRecognizer;

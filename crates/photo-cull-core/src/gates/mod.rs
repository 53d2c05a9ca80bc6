//! Per-image gates applied to the Selected pool.

mod content;
mod quality;

pub use content::ContentGate;
pub use quality::QualityGate;

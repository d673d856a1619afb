//! External collaborator traits.

mod catalog;
mod waveform_source;

pub use catalog::UnitCatalog;
pub use waveform_source::WaveformSource;

//! Submission lifecycle for image analysis: image selection with a scoped
//! preview file, one in-flight transport call at a time, and normalization of
//! whatever the transport returns.

mod config;
mod controller;
mod selection;
pub mod transport;

pub use config::{EngineConfig, GeminiConfig, DEFAULT_API_URL, DEFAULT_GEMINI_MODEL};
pub use controller::{RequestState, SubmissionController};
pub use selection::{media_type_for_path, ImageCandidate, ImageUpload, PreviewHandle, SelectedImage};
pub use transport::{default_transport_registry, Transport, TransportRegistry};

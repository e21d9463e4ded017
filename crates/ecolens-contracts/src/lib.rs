pub mod content;
pub mod events;
pub mod normalize;
pub mod session;
pub mod wire;

pub use content::{ContentBlock, ErrorKind, NormalizedResult, TransportError};
pub use normalize::normalize;
pub use wire::AnalysisPayload;

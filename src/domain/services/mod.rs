pub mod actions;
mod answer_pipeline;
mod ingestion;
mod session_state;

pub use answer_pipeline::*;
pub use ingestion::*;
pub use session_state::*;

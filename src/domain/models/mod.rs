mod action;
mod answer;
mod backend;
mod document;
mod error;
mod event;
mod message;
mod readiness;
mod role;

pub use action::*;
pub use answer::*;
pub use backend::*;
pub use document::*;
pub use error::*;
pub use event::*;
pub use message::*;
pub use readiness::*;
pub use role::*;

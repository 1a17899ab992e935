pub mod logging;
mod session;

pub use session::*;

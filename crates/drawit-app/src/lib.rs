//! DrawIt headless host.
//!
//! Owns the authoritative diagram model, feeds it back into the controller
//! on every interaction and replays JSON session scripts.

pub mod args;
pub mod error;
pub mod render;
pub mod script;
pub mod session;

pub use args::Args;
pub use error::{AppError, AppResult};
pub use render::TextRenderer;
pub use script::{Action, LayerKind, RendererTypes, Script, load_config};
pub use session::{ModelSlot, Session};

//! Playback — the session control surface, visual sync and render callbacks.

pub mod render;
pub mod session;
pub mod visual;

pub use render::{Judgement, RenderEvent, RenderLog, RenderTarget};
pub use session::{BackingTrack, FrameStatus, Session};
pub use visual::{VisualStep, VisualSync};

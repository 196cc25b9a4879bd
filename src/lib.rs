//! Animated "reveal" background: rotating images and videos shown through
//! short-lived squares that appear under the pointer and at random.
//!
//! [`AnimationManager`] is the whole animation. It draws into any
//! [`Surface`]; the `reveal-canvas` binary hosts it in a minifb window.

pub mod config;
pub mod error;
pub mod loader;
pub mod manager;
pub mod media;
pub mod schedule;
pub mod surface;
pub mod types;
pub mod window;

pub use config::{AnimationConfig, AppConfig, Color, WindowConfig};
pub use error::Error;
pub use manager::{AnimationManager, RevealSquare};
pub use media::{BackgroundMedia, BackgroundSource, MediaKind};
pub use surface::Surface;
pub use types::{FrameBuffer, Rect};

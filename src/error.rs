// Crate error type. Every variant states *where* things went wrong.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Creating the window failed
    #[error("Window init error: {0}")]
    WindowInit(String),

    /// Pushing the frame buffer to the window failed
    #[error("Window update error: {0}")]
    WindowUpdate(String),

    /// Config file could not be parsed or holds a bad value
    #[error("Config error: {0}")]
    Config(String),

    /// Reading a background file failed
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Decoding an image or video failed
    #[error("Decode error for {location}: {reason}")]
    Decode { location: String, reason: String },

    /// The manager needs at least one background
    #[error("no background sources given")]
    NoBackgrounds,
}

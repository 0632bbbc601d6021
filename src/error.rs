// Error types for hero-viewport

use std::path::PathBuf;

/// Errors raised while fetching or decoding the hero model.
#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("failed to read asset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid glTF data: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("asset contains no triangle geometry")]
    Empty,

    #[error("asset load was abandoned before it resolved")]
    Abandoned,
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors from the persisted key-value store.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is corrupt: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize storage: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// GPU setup failures. These are fatal to the viewport.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible graphics adapter found")]
    NoAdapter,

    #[error("failed to acquire device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

/// Top-level error for the host binary.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
}

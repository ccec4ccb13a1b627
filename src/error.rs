use thiserror::Error;

/// Top-level error for every fallible sfxr operation.
#[derive(Debug, Error)]
pub enum SfxrError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Load error: {0}")]
    Load(#[from] LoadError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Batch worker pool shut down before the job completed")]
    WorkerGone,
}

/// Invalid configuration, reported by the call that detects it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unsupported bit depth {0} (expected 8, 16, 24 or 32)")]
    UnsupportedBitDepth(u32),
    #[error("Invalid sample rate {0}")]
    InvalidSampleRate(u32),
    #[error("Unknown parameter name '{0}'")]
    UnknownParameter(String),
    #[error("Parameter index {0} out of range")]
    ParameterIndexOutOfRange(usize),
    #[error("Unknown sound kind '{0}'")]
    UnknownSoundKind(String),
    #[error("Seed string must be at least 4 bytes, got {0}")]
    SeedTooShort(usize),
}

/// Malformed parameter input. Prior state is left untouched.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unsupported parameter block version {0}")]
    UnsupportedVersion(f32),
    #[error("Unsupported word-mode parameter block version {0}")]
    UnsupportedWordVersion(i16),
    #[error("Truncated parameter block: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("I/O error while reading parameters: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid parameter JSON: {0}")]
    Json(#[from] serde_json::Error),
}

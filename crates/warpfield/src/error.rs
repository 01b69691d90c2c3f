use std::fmt;

/// Shader stage a compile error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Render error type for context setup, program linking and buffer creation.
///
/// Only initialization paths return these. Per-frame GPU errors are drained
/// through [`crate::GpuBackend::take_error`] and logged instead.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// No usable GPU context could be created for the target surface.
    ContextUnavailable(String),
    /// A shader stage failed to compile. `log` is the driver info log.
    Compile {
        stage: ShaderStage,
        label: String,
        log: String,
    },
    /// Program link failed. `log` is the driver info log.
    Link { label: String, log: String },
    /// Buffer allocation failed.
    Buffer(String),
    /// Invalid engine configuration.
    Config(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::ContextUnavailable(msg) => write!(f, "GPU context unavailable: {}", msg),
            RenderError::Compile { stage, label, log } => {
                write!(f, "{} shader compile failed for '{}': {}", stage, label, log)
            }
            RenderError::Link { label, log } => {
                write!(f, "program link failed for '{}': {}", label, log)
            }
            RenderError::Buffer(msg) => write!(f, "buffer allocation failed: {}", msg),
            RenderError::Config(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

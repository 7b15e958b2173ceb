use std::{error::Error, fmt, path::PathBuf};

/// Errors raised while looking for the most popular color of an image.
#[derive(Debug)]
pub enum HistogramError {
    /// The image is missing, corrupt, empty or in an unsupported format.
    Decode { path: PathBuf, details: String },
    /// The image has no pixels.
    EmptyImage { path: PathBuf },
}

impl fmt::Display for HistogramError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HistogramError::Decode { path, details } => {
                write!(f, "Cannot decode {}: {}", path.display(), details)
            }
            HistogramError::EmptyImage { path } => {
                write!(f, "{} has no pixels", path.display())
            }
        }
    }
}

impl Error for HistogramError {}

use thiserror::Error;

use crate::texture::types::PixelFormat;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("The package is not valid json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("The file is violating the expected format, because: {reason}")]
    FormatError { reason: String },

    #[error("Pixel format {format:?} can't be decoded")]
    UnsupportedPixelFormat { format: PixelFormat },

    #[error("Mip of {width}x{height} needs {expected} bytes, but only {actual} are present")]
    TruncatedMip {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Block decoding failed: {reason}")]
    DecodeError { reason: &'static str },

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    ImageError(#[from] image::ImageError),
}

impl PackageError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        PackageError::FormatError {
            reason: reason.into(),
        }
    }
}

pub mod common;
pub mod mesh;
pub mod package;
pub mod texture;

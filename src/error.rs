//! Error Types

use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("Audio error: {message}")]
    Audio { message: String },
    #[error("Manifest error: {message}")]
    Manifest { message: String },
    #[error("Record error: {message}")]
    Record { message: String },
    #[error("Model error: {message}")]
    Model { message: String },
    #[error("Config error: {message}")]
    Config { message: String },
    #[error("Render error: {message}")]
    Render { message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrepError {
    pub fn audio<S: Into<String>>(msg: S) -> Self { Self::Audio { message: msg.into() } }
    pub fn manifest<S: Into<String>>(msg: S) -> Self { Self::Manifest { message: msg.into() } }
    pub fn record<S: Into<String>>(msg: S) -> Self { Self::Record { message: msg.into() } }
    pub fn model<S: Into<String>>(msg: S) -> Self { Self::Model { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { Self::Config { message: msg.into() } }
    pub fn render<S: Into<String>>(msg: S) -> Self { Self::Render { message: msg.into() } }
}

pub type Result<T> = std::result::Result<T, PrepError>;

impl From<hound::Error> for PrepError {
    fn from(err: hound::Error) -> Self { Self::audio(format!("WAV: {}", err)) }
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self { Self::manifest(format!("JSON: {}", err)) }
}

impl From<prost::DecodeError> for PrepError {
    fn from(err: prost::DecodeError) -> Self { Self::record(format!("protobuf: {}", err)) }
}

impl From<png::EncodingError> for PrepError {
    fn from(err: png::EncodingError) -> Self { Self::render(format!("PNG: {}", err)) }
}

#[cfg(feature = "onnx")]
impl From<onnxruntime::OrtError> for PrepError {
    fn from(err: onnxruntime::OrtError) -> Self { Self::model(format!("ORT: {}", err)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = PrepError::audio("test");
        assert!(e.to_string().contains("Audio"));

        let e = PrepError::record("bad crc");
        assert_eq!(e.to_string(), "Record error: bad crc");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: PrepError = io.into();
        assert!(matches!(e, PrepError::Io(_)));
        assert!(e.to_string().contains("missing"));
    }
}

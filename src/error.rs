use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepixError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Insufficient signal: {0}")]
    InsufficientSignal(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, RepixError>;

// Serialize so embedding applications can ship failures across a JSON boundary
impl serde::Serialize for RepixError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

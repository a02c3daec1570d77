#[derive(Debug, thiserror::Error)]
pub enum StylistError {
    #[error("Style service request failed: {0}")]
    Transport(#[from] anyhow::Error),
    #[error("Style service returned malformed JSON: {0}")]
    MalformedResponse(String),
    #[error("No image generated by the model.")]
    NoImageProduced,
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("No style profile yet. Send a photo first.")]
    MissingProfile,
    #[error("That recommendation is no longer available.")]
    UnknownSelection,
}

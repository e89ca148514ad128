use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Could not find image '{0}' in Artifactory")]
    ImageNotFound(String),
    #[error("Manifest digest mismatch: expected {expected}, found {found}")]
    VerificationMismatch { expected: String, found: String },
    #[error("Could not find layer '{0}' in Artifactory")]
    MissingLayer(String),
    #[error("Failed to download marker layer '{layer}' into the remote cache, status {status}: {body}")]
    MarkerMaterialization { layer: String, status: u16, body: String },
    #[error("Artifactory response status {status}: {body}")]
    Transport { status: u16, body: String },
}

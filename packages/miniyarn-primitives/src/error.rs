#[derive(thiserror::Error, Clone, Debug)]
pub enum Error {
    #[error("Invalid ident ({0})")]
    InvalidIdent(String),

    #[error("Invalid package identifier ({0})")]
    InvalidIdentifier(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
}

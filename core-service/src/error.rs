use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] core_catalog::AppError),
}

impl CoreError {
    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Catalog(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("backend '{id}' has an invalid endpoint '{endpoint}'")]
    InvalidEndpoint { id: String, endpoint: String },
}

pub type Result<T> = std::result::Result<T, Error>;

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("not signed in, log in at {login_url} and update the session cookie")]
    Unauthorized { login_url: String },

    #[error("api error: {0}")]
    Api(String),

    #[error("please select a file first ({} is not a file)", .0.display())]
    NoFileSelected(PathBuf),

    #[error("config error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server error: {0}")]
    Serve(#[from] hyper::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

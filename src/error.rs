use std::{io, path::PathBuf};

use diesel::r2d2::PoolError;
use rocket::{
    Request,
    http::Status,
    response::{self, Responder, Response},
    tokio::task::JoinError,
};
use thiserror::Error;

/// Failures of the lanelet database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not connect to {url}: {source}")]
    Connection {
        /// Connection URL with the password redacted
        url: String,
        #[source]
        source: PoolError,
    },

    #[error("no database connection available: {0}")]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Query(#[from] diesel::result::Error),

    #[error("{0} support was not compiled in, rebuild with `--features {0}`")]
    Unsupported(&'static str),
}

/// Everything that can stop a lanelet lookup from producing a file.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Lanelet {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Query(#[from] StoreError),

    #[error("stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a regular file", path.display())]
    NotAFile { path: PathBuf },

    #[error("open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("lookup task failed: {0}")]
    Task(#[from] JoinError),
}

impl LookupError {
    pub fn status(&self) -> Status {
        match self {
            Self::NotFound(_) => Status::NotFound,
            _ => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for LookupError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let body = match &self {
            Self::NotFound(_) => self.to_string(),
            _ => format!("Error: {self}"),
        };

        Response::build_from(body.respond_to(req)?)
            .status(status)
            .ok()
    }
}

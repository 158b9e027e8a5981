use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

/// A [`BackendError`] along with what the request was doing when it
/// happened. Only the error's message reaches the client.
#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            error: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    pub(crate) error: String,
}

impl FlattenedRejection {
    pub fn new(error: &str) -> Self {
        FlattenedRejection {
            error: error.to_owned(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Context {
    Delete { id: String },
    List,
    Retrieve { id: String },
    Upload { name: Option<String> },
}

impl Context {
    pub fn delete(id: String) -> Context {
        Context::Delete { id }
    }

    pub fn list() -> Context {
        Context::List
    }

    pub fn retrieve(id: String) -> Context {
        Context::Retrieve { id }
    }

    pub fn upload(name: Option<String>) -> Context {
        Context::Upload { name }
    }
}

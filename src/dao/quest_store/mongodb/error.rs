use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("query on collection `{collection}` failed")]
    Query {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("write on collection `{collection}` failed")]
    Write {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("duplicate key `{key}` in collection `{collection}`")]
    Duplicate { collection: &'static str, key: String },
    #[error("malformed identifier `{value}` in collection `{collection}`")]
    InvalidId {
        collection: &'static str,
        value: String,
        #[source]
        source: uuid::Error,
    },
}

impl MongoDaoError {
    /// Classify a failed write, separating unique index violations from other failures.
    pub fn from_write(collection: &'static str, key: String, source: MongoError) -> Self {
        if is_duplicate_key(&source) {
            MongoDaoError::Duplicate { collection, key }
        } else {
            MongoDaoError::Write { collection, source }
        }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        _ => false,
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetLoadError {
    #[error("unknown dataset {0:?}")]
    UnknownDataset(String),
    #[error("dataset {id:?} unreachable: {source}")]
    Unreachable {
        id: String,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset {id:?} malformed: {reason}")]
    Malformed { id: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("origin {0:?} does not match any place in the active dataset")]
    Origin(String),
    #[error("destination {0:?} does not match any place in the active dataset")]
    Destination(String),
}

#[derive(Debug, Error)]
pub enum QueryServiceError {
    // Failure reported by the service itself, e.g. "no route between the points".
    #[error("query rejected: {0}")]
    Service(String),
    #[error("query transport failed: {0}")]
    Transport(String),
    #[error("query service connection closed")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    DatasetLoad(#[from] DatasetLoadError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    QueryService(#[from] QueryServiceError),
    #[error("no dataset is loaded")]
    NoDataset,
}

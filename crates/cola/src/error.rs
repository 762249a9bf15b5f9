#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("graph contains an edge with a missing endpoint: {edge_id}")]
    MissingEndpoint { edge_id: String },
    #[error("graph contains more than one node with id {node_id}")]
    DuplicateNode { node_id: String },
    #[error("invalid geometry on {id}: {reason}")]
    InvalidGeometry { id: String, reason: &'static str },
    #[error("invalid layout option {name}: {reason}")]
    InvalidOption {
        name: &'static str,
        reason: &'static str,
    },
    #[error(transparent)]
    Vpsc(#[from] vpsc::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

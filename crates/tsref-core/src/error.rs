use std::path::PathBuf;
use thiserror::Error;

/// Core error type for tsref operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to parse config at {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Package boundary not found from {}; pass --root", .start.display())]
    BoundaryNotFound { start: PathBuf },
}

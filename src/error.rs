use std::path::PathBuf;

/// The one failure kind that crosses the crate boundary
///
/// Every handle handed out by the loader resolves to either an image or one of
/// these. The enum is `Clone` because a single failure gets fanned out to every
/// request coalesced onto the same in-flight task, which is also why transport
/// causes are carried as rendered strings instead of source errors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ImageFetchError {
    /// The catalog or an image URL couldn't be reached (includes timeouts)
    #[error("transport failure talking to the remote catalog: {0}")]
    Transport(String),
    /// The remote answered with a non-2xx status
    #[error("remote catalog returned status {0}")]
    RemoteStatus(u16),
    /// The bytes we got back don't decode as an image
    #[error("failed decoding image data")]
    Decode,
    /// Nothing cached on disk at the derived path
    #[error("no cached image at {}", .0.display())]
    MissingLocalFile(PathBuf),
    /// The request named a local image that doesn't exist
    #[error("no local image named {0:?}")]
    NoLocalImage(String),
    /// The request implies a face the subject doesn't have
    #[error("missing default image")]
    MissingDefault,
    /// Writing the produced image to the disk cache failed
    #[error("failed storing image: {0}")]
    Storage(String),
    /// The task producing this image went away without publishing an outcome
    #[error("image task was abandoned before it resolved")]
    Abandoned,
    /// Work was submitted after `Loader::stop`
    #[error("loader is stopped")]
    Stopped,
}

impl From<ureq::Error> for ImageFetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => Self::RemoteStatus(code),
            transport => Self::Transport(transport.to_string()),
        }
    }
}

impl From<std::io::Error> for ImageFetchError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

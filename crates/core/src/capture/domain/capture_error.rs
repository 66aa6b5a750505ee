use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no camera device available: {0}")]
    DeviceUnavailable(String),
    #[error("failed to open capture device {device}: {source}")]
    DeviceOpenFailure {
        device: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("capture source has no video stream")]
    NoVideoStream,
    #[error("frame source is already running")]
    AlreadyRunning,
    #[error("capture stream failed: {0}")]
    Stream(String),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("collector rejected the event with HTTP {status}")]
    Http { status: u16 },
    #[error("failed to reach the collector: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to encode the event image: {0}")]
    Encode(String),
    #[error("dispatch queue is full")]
    QueueFull,
    #[error("dispatcher has been shut down")]
    ShutDown,
}

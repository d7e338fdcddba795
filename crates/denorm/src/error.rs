use thiserror::Error;

/// Errors that can terminate the denorm process.
///
/// Per-request failures never show up here — the worker converts every one
/// of them into a failure [`Product`](crate::frame::Product). These variants
/// cover transport, configuration, and startup problems, which are the only
/// errors allowed to stop the service.
#[derive(Debug, Error)]
pub enum DenormError {
    #[error("zeromq error: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),
}

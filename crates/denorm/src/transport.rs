use std::path::Path;
use std::str::FromStr;

use crate::error::DenormError;

/// Transport for the front door socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Unix domain socket, for same-host clients.
    Ipc(String),

    /// TCP, for networked clients.
    Tcp { host: String, port: u16 },
}

impl Transport {
    /// Create an IPC transport. The name becomes a path component under
    /// `/tmp/denorm/`.
    pub fn ipc(name: &str) -> Self {
        Self::Ipc(name.to_string())
    }

    /// Create a TCP transport.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// The ZeroMQ endpoint address string.
    pub fn endpoint(&self) -> String {
        match self {
            Self::Ipc(name) => format!("ipc:///tmp/denorm/{name}.sock"),
            Self::Tcp { host, port } => format!("tcp://{host}:{port}"),
        }
    }

    /// For IPC transports, create the socket's parent directory.
    ///
    /// ZeroMQ requires the directory to exist before binding an IPC socket.
    /// No-op for TCP.
    pub fn ensure_ipc_dir(&self) -> std::io::Result<()> {
        if let Self::Ipc(_) = self {
            let endpoint = self.endpoint();
            let path = endpoint.strip_prefix("ipc://").unwrap_or(&endpoint);
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Remove a stale IPC socket file left by a previous run.
    ///
    /// The `.sock` file survives an unclean exit and causes `EADDRINUSE`
    /// on the next bind. No-op for TCP or when the file is absent.
    pub fn remove_stale_socket(&self) -> std::io::Result<()> {
        if let Self::Ipc(_) = self {
            let endpoint = self.endpoint();
            let path = endpoint.strip_prefix("ipc://").unwrap_or(&endpoint);
            match std::fs::remove_file(path) {
                Ok(()) => {
                    tracing::debug!(path, "removed stale IPC socket");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl FromStr for Transport {
    type Err = DenormError;

    /// Parse `"tcp://host:port"` or `"ipc://name"` into a transport.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix("ipc://") {
            let name = Path::new(name)
                .file_stem()
                .and_then(|n| n.to_str())
                .unwrap_or(name);
            if name.is_empty() {
                return Err(DenormError::Config(format!("empty IPC socket name in '{s}'")));
            }
            return Ok(Self::ipc(name));
        }
        if let Some(addr) = s.strip_prefix("tcp://") {
            let Some((host, port)) = addr.rsplit_once(':') else {
                return Err(DenormError::Config(format!("missing port in '{s}'")));
            };
            let port = port
                .parse()
                .map_err(|_| DenormError::Config(format!("invalid port in '{s}'")))?;
            return Ok(Self::tcp(host, port));
        }
        Err(DenormError::Config(format!(
            "invalid endpoint '{s}', expected tcp://host:port or ipc://name"
        )))
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

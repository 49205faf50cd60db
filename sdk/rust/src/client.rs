use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

#[derive(Debug, Serialize)]
struct CallFrame<'a> {
    id: String,
    service: &'a str,
    version: &'a str,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct ReplyFrame {
    id: String,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<Fault>,
}

#[derive(Debug, Deserialize)]
struct Fault {
    code: String,
    message: String,
}

/// Failure of a single call.
#[derive(Debug)]
pub enum CallError {
    Io(std::io::Error),
    Codec(serde_json::Error),
    /// The node closed the connection before replying.
    Closed,
    /// The reply did not match the request id.
    Mismatched { expected: String, got: String },
    /// The node answered with an error frame.
    Remote { code: String, message: String },
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallError::Io(e) => write!(f, "IO error: {}", e),
            CallError::Codec(e) => write!(f, "Codec error: {}", e),
            CallError::Closed => write!(f, "Connection closed"),
            CallError::Mismatched { expected, got } => {
                write!(f, "Reply id {} does not match request {}", got, expected)
            }
            CallError::Remote { code, message } => write!(f, "Remote error [{}]: {}", code, message),
        }
    }
}

impl std::error::Error for CallError {}

impl CallError {
    /// Error code reported by the node, if any.
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            CallError::Remote { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// A connection to one node. Calls on a client are sequential.
pub struct RpcClient {
    reader: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl RpcClient {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, CallError> {
        let stream = TcpStream::connect(addr).await.map_err(CallError::Io)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader).lines(),
            writer,
        })
    }

    /// Invoke `method` on `service`.
    pub async fn call(
        &mut self,
        service: &str,
        version: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, CallError> {
        let id = uuid::Uuid::new_v4().to_string();
        let frame = CallFrame {
            id: id.clone(),
            service,
            version,
            method,
            params,
        };

        let mut line = serde_json::to_string(&frame).map_err(CallError::Codec)?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(CallError::Io)?;

        let reply = self
            .reader
            .next_line()
            .await
            .map_err(CallError::Io)?
            .ok_or(CallError::Closed)?;
        let reply: ReplyFrame = serde_json::from_str(&reply).map_err(CallError::Codec)?;

        if let Some(fault) = reply.error {
            return Err(CallError::Remote {
                code: fault.code,
                message: fault.message,
            });
        }
        if reply.id != id {
            return Err(CallError::Mismatched {
                expected: id,
                got: reply.id,
            });
        }
        Ok(reply.result)
    }
}

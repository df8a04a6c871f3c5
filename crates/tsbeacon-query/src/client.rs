//! ServerQuery TCP connection
//!
//! Strictly request/response: one command is written, then lines are read
//! until its status line arrives. Notifications are not registered for, so
//! any `notify*` line that slips through is skipped.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::codec::{self, Record, Status};
use crate::error::{QueryError, QueryResult};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest line accepted from the server. Client lists on busy servers are
/// long, but never this long.
const MAX_LINE_LENGTH: usize = 1 << 20;

const BANNER: &str = "TS3";

pub struct QueryClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    command_timeout: Duration,
}

impl QueryClient {
    /// Open a connection and consume the greeting, all within `timeout`.
    /// Commands on the new client use `COMMAND_TIMEOUT`.
    pub async fn connect(addr: &str, timeout: Duration) -> QueryResult<Self> {
        tokio::time::timeout(timeout, Self::handshake(addr))
            .await
            .map_err(|_| QueryError::Timeout(format!("connect to {}", addr)))?
    }

    async fn handshake(addr: &str) -> QueryResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        let (reader, writer) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(reader),
            writer,
            command_timeout: COMMAND_TIMEOUT,
        };

        let banner = client.read_line().await?;
        if banner != BANNER {
            return Err(QueryError::Protocol(format!(
                "unexpected banner {:?}, not a ServerQuery endpoint",
                banner
            )));
        }
        // Welcome text follows the banner.
        client.read_line().await?;

        debug!(addr, "ServerQuery greeting received");
        Ok(client)
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    pub async fn login(&mut self, username: &str, password: &str) -> QueryResult<()> {
        let line = codec::command(
            "login",
            &[("client_login_name", username), ("client_login_password", password)],
            &[],
        );
        self.execute(&line).await.map(|_| ())
    }

    pub async fn use_server(&mut self, server_id: u32) -> QueryResult<()> {
        let sid = server_id.to_string();
        self.execute(&codec::command("use", &[("sid", &sid)], &[]))
            .await
            .map(|_| ())
    }

    pub async fn server_info(&mut self) -> QueryResult<Record> {
        self.execute("serverinfo")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::Protocol("empty serverinfo response".into()))
    }

    pub async fn channel_list(&mut self) -> QueryResult<Vec<Record>> {
        self.execute("channellist").await
    }

    pub async fn client_list(&mut self) -> QueryResult<Vec<Record>> {
        self.execute(&codec::command("clientlist", &[], &["-voice", "-times", "-away"]))
            .await
    }

    /// Say goodbye. The server closes the socket after replying.
    pub async fn quit(mut self) -> QueryResult<()> {
        self.write_line("quit").await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    /// Send one command and collect every record until its status line.
    pub async fn execute(&mut self, line: &str) -> QueryResult<Vec<Record>> {
        let name = line.split(' ').next().unwrap_or(line).to_string();
        tokio::time::timeout(self.command_timeout, self.roundtrip(line))
            .await
            .map_err(|_| QueryError::Timeout(name))?
    }

    async fn roundtrip(&mut self, line: &str) -> QueryResult<Vec<Record>> {
        self.write_line(line).await?;

        let mut records = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line.is_empty() || line.starts_with("notify") {
                continue;
            }
            if let Some(status) = Status::parse(&line) {
                status.into_result()?;
                return Ok(records);
            }
            records.extend(codec::parse_records(&line));
        }
    }

    async fn write_line(&mut self, line: &str) -> QueryResult<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next line with `\r`/`\n` stripped from both ends; the server
    /// terminates lines with `\n\r`.
    async fn read_line(&mut self) -> QueryResult<String> {
        let mut buf = String::new();
        let n = (&mut self.reader)
            .take(MAX_LINE_LENGTH as u64)
            .read_line(&mut buf)
            .await?;
        if n == 0 {
            return Err(QueryError::Closed);
        }
        if n >= MAX_LINE_LENGTH && !buf.ends_with('\n') {
            return Err(QueryError::Protocol("line exceeds maximum length".into()));
        }
        Ok(buf.trim_matches(['\r', '\n']).to_string())
    }
}

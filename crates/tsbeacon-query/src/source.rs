//! `StateSource` backed by a ServerQuery connection

use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tsbeacon_core::{Channel, Error, Result, ServerSnapshot, StateSource, User};

use crate::client::{QueryClient, CONNECT_TIMEOUT};
use crate::codec::Record;
use crate::error::{QueryError, QueryResult};

/// `client_type` of ServerQuery logins, including this one.
const QUERY_CLIENT_TYPE: u64 = 1;

#[derive(Clone, Debug)]
pub struct TeamSpeakConfig {
    pub host: String,
    pub query_port: u16,
    pub username: String,
    pub password: String,
    pub server_id: u32,
    pub connect_timeout: Duration,
}

impl TeamSpeakConfig {
    pub fn new(host: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            query_port: 10011,
            username: "serveradmin".into(),
            password: password.into(),
            server_id: 1,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.query_port)
    }
}

enum Link {
    Stopped,
    Connected(QueryClient),
    /// Started, but the last transport failed. Next fetch reconnects.
    Lost,
}

pub struct TeamSpeakSource {
    config: TeamSpeakConfig,
    link: Mutex<Link>,
}

impl TeamSpeakSource {
    pub fn new(config: TeamSpeakConfig) -> Self {
        Self {
            config,
            link: Mutex::new(Link::Stopped),
        }
    }

    pub fn config(&self) -> &TeamSpeakConfig { &self.config }

    async fn open(&self) -> QueryResult<QueryClient> {
        let mut client =
            QueryClient::connect(&self.config.address(), self.config.connect_timeout).await?;
        client
            .login(&self.config.username, &self.config.password)
            .await?;
        client.use_server(self.config.server_id).await?;
        Ok(client)
    }
}

#[async_trait::async_trait]
impl StateSource for TeamSpeakSource {
    fn name(&self) -> &str { "teamspeak" }

    async fn start(&self) -> Result<()> {
        let mut link = self.link.lock().await;
        if matches!(*link, Link::Connected(_)) {
            return Ok(());
        }

        info!(
            component = "teamspeak",
            address = %self.config.address(),
            "Connecting to TeamSpeak server"
        );
        let client = self
            .open()
            .await
            .map_err(|e| Error::connection("teamspeak", e.to_string()))?;
        *link = Link::Connected(client);

        info!(
            component = "teamspeak",
            server_id = self.config.server_id,
            "Connected to TeamSpeak server"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut link = self.link.lock().await;
        if let Link::Connected(client) = std::mem::replace(&mut *link, Link::Stopped) {
            if let Err(e) = client.quit().await {
                debug!(component = "teamspeak", error = %e, "quit failed");
            }
            info!(component = "teamspeak", "Disconnected from TeamSpeak server");
        }
        Ok(())
    }

    async fn fetch_snapshot(&self) -> Result<ServerSnapshot> {
        let mut link = self.link.lock().await;

        if matches!(*link, Link::Stopped) {
            return Err(QueryError::NotConnected.into());
        }
        if matches!(*link, Link::Lost) {
            info!(component = "teamspeak", "Reconnecting to TeamSpeak server");
            *link = Link::Connected(self.open().await?);
        }

        let Link::Connected(client) = &mut *link else {
            return Err(QueryError::NotConnected.into());
        };

        match read_snapshot(client).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                if e.is_transport() {
                    warn!(component = "teamspeak", error = %e, "ServerQuery connection lost");
                    *link = Link::Lost;
                }
                Err(e.into())
            }
        }
    }
}

async fn read_snapshot(client: &mut QueryClient) -> QueryResult<ServerSnapshot> {
    let server = client.server_info().await?;
    let channels = client.channel_list().await?;
    let clients = client.client_list().await?;
    build_snapshot(&server, &channels, &clients)
}

/// Assemble a snapshot from raw `serverinfo`, `channellist` and
/// `clientlist -voice -times -away` records.
pub fn build_snapshot(
    server: &Record,
    channels: &[Record],
    clients: &[Record],
) -> QueryResult<ServerSnapshot> {
    let channels = channels
        .iter()
        .map(|r| -> QueryResult<Channel> {
            Ok(Channel {
                id: r.u64("cid")?,
                name: r.str("channel_name")?.to_string(),
                parent_id: r.u64_or_zero("pid"),
                order: r.u64_or_zero("channel_order"),
                users: Vec::new(),
            })
        })
        .collect::<QueryResult<Vec<_>>>()?;

    let mut users = Vec::with_capacity(clients.len());
    for r in clients {
        if r.u64_or_zero("client_type") == QUERY_CLIENT_TYPE {
            continue;
        }
        users.push(User {
            id: r.u64("clid")?,
            nickname: r.str("client_nickname")?.to_string(),
            channel_id: r.u64("cid")?,
            input_muted: r.flag("client_input_muted"),
            output_muted: r.flag("client_output_muted"),
            away: r.flag("client_away"),
            away_message: r
                .get("client_away_message")
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            idle: Duration::from_millis(r.u64_or_zero("client_idle_time")),
            recording: r.flag("client_is_recording"),
        });
    }

    Ok(ServerSnapshot::assemble(
        server.str("virtualserver_name")?,
        Duration::from_secs(server.u64_or_zero("virtualserver_uptime")),
        server.u64_or_zero("virtualserver_maxclients") as usize,
        channels,
        users,
    ))
}

//! Tests for tsbeacon-query: line codec, snapshot assembly, and the
//! ServerQuery client/source against an in-process fake server

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tsbeacon_core::{Error, StateSource};
use tsbeacon_query::codec::{self, parse_records};
use tsbeacon_query::*;

// ===========================================================================
// Fake ServerQuery endpoint
// ===========================================================================

type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

struct FakeServer {
    port: u16,
    commands: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
}

impl FakeServer {
    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn config(&self, password: &str) -> TeamSpeakConfig {
        TeamSpeakConfig {
            query_port: self.port,
            connect_timeout: Duration::from_secs(2),
            ..TeamSpeakConfig::new("127.0.0.1", password)
        }
    }
}

const OK: &str = "error id=0 msg=ok";

/// Every line the server writes ends in `\n\r`, like the real thing.
async fn spawn_server(banner: &'static str, responder: Responder) -> FakeServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let commands = Arc::new(Mutex::new(Vec::new()));
    let connections = Arc::new(AtomicUsize::new(0));

    let (cmds, conns) = (commands.clone(), connections.clone());
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else { break };
            conns.fetch_add(1, Ordering::SeqCst);
            let (cmds, responder) = (cmds.clone(), responder.clone());

            tokio::spawn(async move {
                let (reader, mut writer) = stream.into_split();
                let mut reader = BufReader::new(reader);
                let greeting = format!(
                    "{}\n\rWelcome to the TeamSpeak 3 ServerQuery interface.\n\r",
                    banner
                );
                if writer.write_all(greeting.as_bytes()).await.is_err() {
                    return;
                }

                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => return,
                        Ok(_) => {}
                    }
                    let cmd = line.trim().to_string();
                    cmds.lock().unwrap().push(cmd.clone());

                    if cmd == "quit" {
                        let _ = writer.write_all(format!("{}\n\r", OK).as_bytes()).await;
                        return;
                    }
                    match responder(&cmd) {
                        Some(reply) => {
                            let mut out = String::new();
                            for l in reply.lines() {
                                out.push_str(l);
                                out.push_str("\n\r");
                            }
                            if writer.write_all(out.as_bytes()).await.is_err() {
                                return;
                            }
                        }
                        None => return,
                    }
                }
            });
        }
    });

    FakeServer { port, commands, connections }
}

const SERVERINFO: &str =
    "virtualserver_name=Test\\sServer virtualserver_uptime=3600 virtualserver_maxclients=32";
const CHANNELLIST: &str = "cid=1 pid=0 channel_order=0 channel_name=Lobby total_clients=2\
    |cid=2 pid=0 channel_order=1 channel_name=[cspacer]---\
    |cid=3 pid=0 channel_order=2 channel_name=Gaming\\sRoom";
const CLIENTLIST: &str = "clid=1 cid=1 client_nickname=alice client_type=0 client_input_muted=1 \
    client_output_muted=0 client_away=0 client_away_message client_idle_time=400000 \
    client_is_recording=0\
    |clid=2 cid=3 client_nickname=bob\\sthe\\sbuilder client_type=0 client_away=1 \
    client_away_message=brb\\s5\
    |clid=5 cid=1 client_nickname=serveradmin client_type=1";

fn healthy(drop_clientlist: Arc<AtomicBool>) -> Responder {
    Arc::new(move |cmd: &str| {
        let reply = match cmd.split(' ').next().unwrap_or_default() {
            "login" if cmd.ends_with("client_login_password=secret") => OK.to_string(),
            "login" => "error id=520 msg=invalid\\sloginname\\sor\\spassword".to_string(),
            "use" => OK.to_string(),
            "serverinfo" => format!("{}\n{}", SERVERINFO, OK),
            "channellist" => format!("{}\n{}", CHANNELLIST, OK),
            "clientlist" => {
                if drop_clientlist.swap(false, Ordering::SeqCst) {
                    return None;
                }
                format!("{}\n{}", CLIENTLIST, OK)
            }
            _ => "error id=256 msg=command\\snot\\sfound".to_string(),
        };
        Some(reply)
    })
}

// ===========================================================================
// Codec
// ===========================================================================

#[test]
fn records_split_on_pipe_and_unescape_values() {
    let records = parse_records("cid=1 channel_name=Gaming\\sRoom|cid=2 channel_name=A\\pB");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("channel_name"), Some("Gaming Room"));
    assert_eq!(records[1].get("channel_name"), Some("A|B"));
    assert_eq!(records[1].u64("cid").unwrap(), 2);
}

#[test]
fn record_flags_and_defaults() {
    let record = Record::parse("client_away=1 client_input_muted=0 client_away_message");
    assert!(record.flag("client_away"));
    assert!(!record.flag("client_input_muted"));
    assert!(!record.flag("client_is_recording"));
    assert_eq!(record.get("client_away_message"), Some(""));
    assert_eq!(record.u64_or_zero("client_idle_time"), 0);
    assert!(matches!(record.u64("clid"), Err(QueryError::Protocol(_))));
}

#[test]
fn status_line_parsing() {
    let ok = Status::parse("error id=0 msg=ok").unwrap();
    assert!(ok.is_ok());

    let denied =
        Status::parse("error id=2568 msg=insufficient\\sclient\\spermissions failed_permid=4")
            .unwrap();
    assert_eq!(denied.id, 2568);
    assert_eq!(denied.msg, "insufficient client permissions");
    assert!(matches!(denied.into_result(), Err(QueryError::Server { id: 2568, .. })));

    assert!(Status::parse("virtualserver_name=error").is_none());
}

#[test]
fn escape_round_trips_awkward_passwords() {
    let password = "p@ss word|with/slashes\\";
    assert_eq!(codec::unescape(&codec::escape(password)), password);
    assert!(!codec::escape(password).contains(' '));
}

// ===========================================================================
// Snapshot assembly
// ===========================================================================

#[test]
fn build_snapshot_from_records() {
    let server = Record::parse(SERVERINFO);
    let channels = parse_records(CHANNELLIST);
    let clients = parse_records(CLIENTLIST);

    let snap = build_snapshot(&server, &channels, &clients).unwrap();
    assert_eq!(snap.name, "Test Server");
    assert_eq!(snap.uptime, Duration::from_secs(3600));
    assert_eq!(snap.capacity, 32);
    assert_eq!(snap.total_users, 2);

    let names: Vec<_> = snap.channels.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Lobby", "[cspacer]---", "Gaming Room"]);

    let alice = &snap.channel(1).unwrap().users[0];
    assert!(alice.input_muted);
    assert!(!alice.away);
    assert_eq!(alice.away_message, None);
    assert_eq!(alice.idle, Duration::from_millis(400_000));

    let bob = &snap.channel(3).unwrap().users[0];
    assert_eq!(bob.nickname, "bob the builder");
    assert!(bob.away);
    assert_eq!(bob.away_message.as_deref(), Some("brb 5"));
    assert_eq!(bob.idle, Duration::ZERO);
    assert!(!bob.recording);
}

#[test]
fn build_snapshot_excludes_query_clients() {
    let server = Record::parse(SERVERINFO);
    let clients = parse_records("clid=9 cid=1 client_nickname=bot client_type=1");
    let snap = build_snapshot(&server, &parse_records(CHANNELLIST), &clients).unwrap();
    assert_eq!(snap.total_users, 0);
    assert!(snap.channels.iter().all(|c| c.users.is_empty()));
}

#[test]
fn build_snapshot_counts_users_in_unknown_channels() {
    let server = Record::parse(SERVERINFO);
    let clients = parse_records("clid=1 cid=99 client_nickname=ghost client_type=0");
    let snap = build_snapshot(&server, &parse_records(CHANNELLIST), &clients).unwrap();
    assert_eq!(snap.total_users, 1);
    assert_eq!(snap.assigned_users(), 0);
}

#[test]
fn build_snapshot_rejects_missing_identity() {
    let server = Record::parse("virtualserver_uptime=1");
    let err = build_snapshot(&server, &[], &[]).unwrap_err();
    assert!(matches!(err, QueryError::Protocol(_)));
}

// ===========================================================================
// QueryClient
// ===========================================================================

#[tokio::test]
async fn client_rejects_non_query_banner() {
    let server = spawn_server("SSH-2.0-OpenSSH", healthy(Arc::default())).await;
    let addr = format!("127.0.0.1:{}", server.port);
    let err = QueryClient::connect(&addr, Duration::from_secs(2)).await.err().unwrap();
    assert!(matches!(err, QueryError::Protocol(_)));
}

#[tokio::test]
async fn client_times_out_on_silent_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let err = QueryClient::connect(&addr, Duration::from_millis(200)).await.err().unwrap();
    assert!(matches!(err, QueryError::Timeout(_)));
}

#[tokio::test]
async fn client_command_timeout_is_separate_from_connect_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"TS3\n\rWelcome\n\r").await.unwrap();
        // Greets, then never answers a command.
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let client = QueryClient::connect(&addr, Duration::from_secs(2)).await.unwrap();
    assert_eq!(client.command_timeout(), COMMAND_TIMEOUT);

    let mut client = client.with_command_timeout(Duration::from_millis(200));
    let err = client.login("serveradmin", "secret").await.unwrap_err();
    assert!(matches!(err, QueryError::Timeout(ref cmd) if cmd == "login"), "{err}");
    assert!(err.is_transport());
}

#[tokio::test]
async fn client_reports_server_errors() {
    let server = spawn_server("TS3", healthy(Arc::default())).await;
    let addr = format!("127.0.0.1:{}", server.port);
    let mut client = QueryClient::connect(&addr, Duration::from_secs(2)).await.unwrap();

    let err = client.login("serveradmin", "wrong").await.unwrap_err();
    assert!(matches!(err, QueryError::Server { id: 520, .. }));
    assert!(!err.is_transport());

    client.login("serveradmin", "secret").await.unwrap();
    let info = client.server_info().await.unwrap();
    assert_eq!(info.get("virtualserver_name"), Some("Test Server"));
}

// ===========================================================================
// TeamSpeakSource
// ===========================================================================

#[tokio::test]
async fn fetch_before_start_is_not_connected() {
    let server = spawn_server("TS3", healthy(Arc::default())).await;
    let source = TeamSpeakSource::new(server.config("secret"));
    let err = source.fetch_snapshot().await.unwrap_err();
    assert!(matches!(err, Error::NotConnected(_)));
    assert_eq!(server.connections.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn start_fetch_stop_session() {
    let server = spawn_server("TS3", healthy(Arc::default())).await;
    let source = TeamSpeakSource::new(server.config("secret"));

    source.start().await.unwrap();
    let snap = source.fetch_snapshot().await.unwrap();
    assert_eq!(snap.name, "Test Server");
    assert_eq!(snap.total_users, 2);
    source.stop().await.unwrap();

    // Let the fake record the trailing quit.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        server.commands(),
        vec![
            "login client_login_name=serveradmin client_login_password=secret",
            "use sid=1",
            "serverinfo",
            "channellist",
            "clientlist -voice -times -away",
            "quit",
        ]
    );

    let err = source.fetch_snapshot().await.unwrap_err();
    assert!(matches!(err, Error::NotConnected(_)));
}

#[tokio::test]
async fn start_with_bad_credentials_is_connection_error() {
    let server = spawn_server("TS3", healthy(Arc::default())).await;
    let source = TeamSpeakSource::new(server.config("wrong"));
    let err = source.start().await.unwrap_err();
    assert!(matches!(err, Error::Connection { .. }));
    assert!(err.to_string().contains("teamspeak"));
}

#[tokio::test]
async fn start_against_closed_port_is_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = TeamSpeakConfig {
        query_port: port,
        ..TeamSpeakConfig::new("127.0.0.1", "secret")
    };
    let err = TeamSpeakSource::new(config).start().await.unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn stop_without_start_is_harmless() {
    let server = spawn_server("TS3", healthy(Arc::default())).await;
    let source = TeamSpeakSource::new(server.config("secret"));
    source.stop().await.unwrap();
    source.stop().await.unwrap();
    assert_eq!(server.connections.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dropped_connection_reconnects_on_next_fetch() {
    let drop_next = Arc::new(AtomicBool::new(false));
    let server = spawn_server("TS3", healthy(drop_next.clone())).await;
    let source = TeamSpeakSource::new(server.config("secret"));
    source.start().await.unwrap();

    drop_next.store(true, Ordering::SeqCst);
    let err = source.fetch_snapshot().await.unwrap_err();
    assert!(matches!(err, Error::Fetch(_)));
    assert_eq!(server.connections.load(Ordering::SeqCst), 1);

    let snap = source.fetch_snapshot().await.unwrap();
    assert_eq!(snap.total_users, 2);
    assert_eq!(server.connections.load(Ordering::SeqCst), 2);

    source.stop().await.unwrap();
}

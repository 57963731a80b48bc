//! parley-ctl — command-line interface for the Parley daemon.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_PORT: u16 = 8888;

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    port: u16,
    user: UserInfo,
    peers_count: usize,
    is_running: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInfo {
    id: String,
    nickname: String,
    avatar: String,
    #[serde(default)]
    ip: String,
    #[serde(default)]
    port: u16,
    #[serde(default)]
    version: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeerInfo {
    id: String,
    nickname: String,
    ip: String,
    port: u16,
    status: String,
    last_seen: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageInfo {
    sender_nickname: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    file_info: Option<FileInfo>,
    timestamp: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileInfo {
    original_name: String,
    size: u64,
    download_url: String,
}

#[derive(Deserialize)]
struct ScanHitInfo {
    ip: String,
    kind: String,
}

#[derive(Deserialize)]
struct RemovedResponse {
    removed: Vec<String>,
}

#[derive(Deserialize)]
struct CleanupResponse {
    removed: usize,
}

#[derive(Deserialize)]
struct SyncProfileResponse {
    delivered: usize,
}

// ── HTTP helpers ──────────────────────────────────────────────────────────────

fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}

async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to parleyd at {} — is it running?", url))?
        .json::<T>()
        .await
        .context("failed to parse response")
}

async fn post_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    reqwest::Client::new()
        .post(url)
        .send()
        .await
        .with_context(|| format!("failed to connect to parleyd at {} — is it running?", url))?
        .json::<T>()
        .await
        .context("failed to parse response")
}

async fn post_json_body<T, R>(url: &str, body: &T) -> Result<R>
where
    T: Serialize,
    R: for<'de> Deserialize<'de>,
{
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("failed to connect to parleyd at {} — is it running?", url))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let detail = resp
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| status.to_string());
        anyhow::bail!("daemon refused: {}", detail);
    }
    resp.json::<R>().await.context("failed to parse response")
}

async fn delete_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    reqwest::Client::new()
        .delete(url)
        .send()
        .await
        .with_context(|| format!("failed to connect to parleyd at {} — is it running?", url))?
        .json::<T>()
        .await
        .context("failed to parse response")
}

// ── Subcommand handlers ───────────────────────────────────────────────────────

async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Parley Daemon Status");
    println!("═══════════════════════════════════════");
    println!("  Running     : {}", resp.is_running);
    println!("  Port        : {}", resp.port);
    println!("  Known peers : {}", resp.peers_count);
    println!();
    println!("  Identity:");
    println!("  ┌─ {}", resp.user.id);
    println!("  │  nickname : {}", resp.user.nickname);
    println!("  │  avatar   : {}", resp.user.avatar);
    println!("  │  address  : {}:{}", resp.user.ip, resp.user.port);
    println!("  └─ version  : {}", resp.user.version);

    Ok(())
}

async fn cmd_peers(port: u16, recent: bool) -> Result<()> {
    let url = if recent {
        format!("{}/recent-peers", base_url(port))
    } else {
        format!("{}/peers", base_url(port))
    };
    let peers: Vec<PeerInfo> = get_json(&url).await?;

    if peers.is_empty() {
        println!("No peers known yet.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Peers ({})", peers.len());
    println!("═══════════════════════════════════════");

    for p in &peers {
        println!("  ┌─ {}", p.id);
        println!("  │  nickname : {}", p.nickname);
        println!("  │  address  : {}:{}", p.ip, p.port);
        println!("  │  status   : {}", p.status);
        println!("  └─ lastSeen : {}", p.last_seen);
    }

    Ok(())
}

async fn cmd_connect(port: u16, ip: &str, peer_port: u16) -> Result<()> {
    let body = serde_json::json!({ "ip": ip, "port": peer_port });
    let peer: PeerInfo =
        post_json_body(&format!("{}/peers/connect", base_url(port)), &body).await?;
    println!("Connected to {} ({}:{}).", peer.nickname, peer.ip, peer.port);
    println!("Peer id: {}", peer.id);
    Ok(())
}

async fn cmd_scan(port: u16, base: Option<&str>) -> Result<()> {
    let body = match base {
        Some(base) => serde_json::json!({ "base": base }),
        None => serde_json::json!({}),
    };
    println!("Scanning... this can take a minute.");
    let hits: Vec<ScanHitInfo> = post_json_body(&format!("{}/scan", base_url(port)), &body).await?;

    if hits.is_empty() {
        println!("Nothing answered.");
        return Ok(());
    }
    for hit in &hits {
        println!("  {} : {}", hit.ip, hit.kind);
    }
    Ok(())
}

async fn cmd_send(port: u16, peer_id: &str, content: &str) -> Result<()> {
    let body = serde_json::json!({ "peerId": peer_id, "content": content });
    let _: serde_json::Value =
        post_json_body(&format!("{}/messages/send", base_url(port)), &body).await?;
    println!("Sent.");
    Ok(())
}

async fn cmd_send_file(port: u16, peer_id: &str, path: &str) -> Result<()> {
    let path = std::fs::canonicalize(path).context("file not found")?;
    let body = serde_json::json!({ "peerId": peer_id, "path": path });
    let _: serde_json::Value =
        post_json_body(&format!("{}/files/send", base_url(port)), &body).await?;
    println!("File announced to peer.");
    Ok(())
}

async fn cmd_history(port: u16, peer_id: &str) -> Result<()> {
    let messages: Vec<MessageInfo> =
        get_json(&format!("{}/history/{}", base_url(port), peer_id)).await?;

    if messages.is_empty() {
        println!("No messages with {} yet.", peer_id);
        return Ok(());
    }

    for m in &messages {
        match (&m.content, &m.file_info) {
            (Some(text), _) => {
                println!("[{}] {}: {}", m.timestamp, m.sender_nickname, text);
            }
            (None, Some(file)) => {
                println!(
                    "[{}] {}: <file {} ({} bytes)> {}",
                    m.timestamp, m.sender_nickname, file.original_name, file.size, file.download_url
                );
            }
            (None, None) => {
                println!("[{}] {}: <{}>", m.timestamp, m.sender_nickname, m.kind);
            }
        }
    }
    Ok(())
}

async fn cmd_user(port: u16) -> Result<()> {
    let user: UserInfo = get_json(&format!("{}/user", base_url(port))).await?;
    println!("{} ({})", user.nickname, user.id);
    println!("avatar  : {}", user.avatar);
    println!("address : {}:{}", user.ip, user.port);
    Ok(())
}

async fn cmd_set_profile(port: u16, nickname: Option<&str>, avatar: Option<&str>) -> Result<()> {
    let body = serde_json::json!({ "nickname": nickname, "avatar": avatar });
    let user: UserInfo = post_json_body(&format!("{}/user", base_url(port)), &body).await?;
    println!("Profile updated: {} / {}", user.nickname, user.avatar);
    Ok(())
}

async fn cmd_sweep(port: u16) -> Result<()> {
    let resp: RemovedResponse = post_json(&format!("{}/peers/sweep", base_url(port))).await?;
    println!("Swept {} stale peer(s).", resp.removed.len());
    Ok(())
}

async fn cmd_reset(port: u16) -> Result<()> {
    let resp: RemovedResponse = post_json(&format!("{}/peers/reset", base_url(port))).await?;
    println!("Dropped {} disconnected peer(s).", resp.removed.len());
    Ok(())
}

async fn cmd_cleanup(port: u16, days: Option<&str>) -> Result<()> {
    let url = match days {
        Some(days) => format!("{}/peers/cleanup?days={}", base_url(port), days),
        None => format!("{}/peers/cleanup", base_url(port)),
    };
    let resp: CleanupResponse = delete_json(&url).await?;
    println!("Retired {} old peer record(s).", resp.removed);
    Ok(())
}

async fn cmd_sync_profile(port: u16) -> Result<()> {
    let resp: SyncProfileResponse =
        post_json(&format!("{}/sync-profile", base_url(port))).await?;
    println!("Profile pushed to {} peer(s).", resp.delivered);
    Ok(())
}

fn print_usage() {
    println!("Usage: parley-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status                     Show daemon status and identity");
    println!("  peers                      List all known peers");
    println!("  recent                     List recently seen peers");
    println!("  connect <ip> <port>        Handshake with a peer");
    println!("  scan [base-ip]             Probe the /24 for other instances");
    println!("  send <peer-id> <text>      Send a text message");
    println!("  send-file <peer-id> <path> Stage and announce a file");
    println!("  history <peer-id>          Show the conversation with a peer");
    println!("  user                       Show own profile");
    println!("  nick <name>                Change nickname");
    println!("  avatar <tag>               Change avatar tag");
    println!("  sweep                      Drop stale peer records");
    println!("  reset                      Drop all disconnected peer records");
    println!("  cleanup [days]             Retire records unseen for N days (default 30)");
    println!("  sync-profile               Push own profile to connected peers");
    println!();
    println!("Options:");
    println!("  --port <port>   Daemon port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd_status(port).await,
        ["peers"] => cmd_peers(port, false).await,
        ["recent"] => cmd_peers(port, true).await,
        ["connect", ip, peer_port] => {
            let peer_port = peer_port.parse().context("port must be a number")?;
            cmd_connect(port, ip, peer_port).await
        }
        ["scan"] => cmd_scan(port, None).await,
        ["scan", base] => cmd_scan(port, Some(base)).await,
        ["send", peer_id, rest @ ..] if !rest.is_empty() => {
            cmd_send(port, peer_id, &rest.join(" ")).await
        }
        ["send-file", peer_id, path] => cmd_send_file(port, peer_id, path).await,
        ["history", peer_id] => cmd_history(port, peer_id).await,
        ["user"] => cmd_user(port).await,
        ["nick", name] => cmd_set_profile(port, Some(name), None).await,
        ["avatar", tag] => cmd_set_profile(port, None, Some(tag)).await,
        ["sweep"] => cmd_sweep(port).await,
        ["reset"] => cmd_reset(port).await,
        ["cleanup"] => cmd_cleanup(port, None).await,
        ["cleanup", days] => cmd_cleanup(port, Some(days)).await,
        ["sync-profile"] => cmd_sync_profile(port).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

//! btget - command-line BitTorrent client.
//!
//! Thin dispatch layer over the library: each subcommand maps onto one
//! library operation and prints its result in a fixed, line-oriented
//! format.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use btget::metainfo::Metainfo;
use btget::peer::{PeerId, PeerSession};
use btget::tracker::HttpTracker;

/// Port reported to the tracker. Nothing listens on it; this client only
/// makes outbound connections.
const LISTEN_PORT: u16 = 6881;

#[derive(Debug, Parser)]
#[command(name = "btget", about = "A single-peer BitTorrent client", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode a bencoded value and print it as JSON
    Decode {
        /// The bencoded value, e.g. "d3:foo3:bare"
        value: String,
    },
    /// Print metadata for a torrent file
    Info {
        /// Path to the .torrent file
        torrent: PathBuf,
    },
    /// Print the peers returned by the tracker
    Peers {
        /// Path to the .torrent file
        torrent: PathBuf,
    },
    /// Handshake with a peer and print its peer id
    Handshake {
        /// Path to the .torrent file
        torrent: PathBuf,
        /// Peer address as HOST:PORT
        peer: String,
    },
    /// Download a single verified piece
    #[command(name = "download_piece")]
    DownloadPiece {
        /// Output file for the piece bytes
        #[arg(short, long)]
        output: PathBuf,
        /// Path to the .torrent file
        torrent: PathBuf,
        /// Zero-based piece index
        index: usize,
    },
    /// Download the whole file
    Download {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Path to the .torrent file
        torrent: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Decode { value } => decode_command(&value),
        Command::Info { torrent } => info_command(&torrent),
        Command::Peers { torrent } => peers_command(&torrent).await,
        Command::Handshake { torrent, peer } => handshake_command(&torrent, &peer).await,
        Command::DownloadPiece {
            output,
            torrent,
            index,
        } => download_piece_command(&output, &torrent, index).await,
        Command::Download { output, torrent } => download_command(&output, &torrent).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn decode_command(value: &str) -> Result<()> {
    let decoded = btget::bencode::decode(value.as_bytes())?;
    println!("{}", decoded.to_json());
    Ok(())
}

fn info_command(torrent: &Path) -> Result<()> {
    let metainfo = load_torrent(torrent)?;

    println!("Tracker URL: {}", metainfo.announce);
    println!("Length: {}", metainfo.info.length);
    println!("Info Hash: {}", metainfo.info_hash);
    println!("Piece Length: {}", metainfo.info.piece_length);
    println!("Piece Hashes:");
    for hash in metainfo.info.piece_hashes() {
        println!("{}", hex(hash));
    }
    Ok(())
}

async fn peers_command(torrent: &Path) -> Result<()> {
    let metainfo = load_torrent(torrent)?;
    let peers = fetch_peers(&metainfo, &PeerId::generate()).await?;
    for peer in peers {
        println!("{}", peer);
    }
    Ok(())
}

async fn handshake_command(torrent: &Path, peer: &str) -> Result<()> {
    let metainfo = Arc::new(load_torrent(torrent)?);
    let addr: SocketAddr = peer
        .parse()
        .with_context(|| format!("invalid peer address '{}'", peer))?;

    let session = PeerSession::connect(addr, metainfo, PeerId::generate()).await?;
    println!("Peer ID: {}", session.remote_id());
    Ok(())
}

async fn download_piece_command(output: &Path, torrent: &Path, index: usize) -> Result<()> {
    let metainfo = Arc::new(load_torrent(torrent)?);
    let mut session = connect_to_swarm(metainfo.clone()).await?;

    let piece = session.download_piece(index).await?;
    tokio::fs::write(output, &piece)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Piece {} downloaded to {}.", index, output.display());
    Ok(())
}

async fn download_command(output: &Path, torrent: &Path) -> Result<()> {
    let metainfo = Arc::new(load_torrent(torrent)?);
    let mut session = connect_to_swarm(metainfo.clone()).await?;

    let mut file = tokio::fs::File::create(output)
        .await
        .with_context(|| format!("failed to create {}", output.display()))?;
    session.download_to(&mut file).await?;

    println!("Downloaded {} to {}.", torrent.display(), output.display());
    Ok(())
}

fn load_torrent(path: &Path) -> Result<Metainfo> {
    Metainfo::from_file(path).with_context(|| format!("failed to load {}", path.display()))
}

async fn fetch_peers(metainfo: &Metainfo, peer_id: &PeerId) -> Result<Vec<SocketAddr>> {
    let tracker = HttpTracker::new(&metainfo.announce)?;
    let response = tracker
        .announce(
            metainfo.info_hash.as_bytes(),
            peer_id.as_bytes(),
            LISTEN_PORT,
            0,
            0,
            metainfo.info.length,
        )
        .await?;
    Ok(response.peers)
}

/// Announces to the tracker, connects to the first reachable peer, and
/// completes the bitfield/interested/unchoke progression.
async fn connect_to_swarm(metainfo: Arc<Metainfo>) -> Result<PeerSession> {
    let peer_id = PeerId::generate();
    let peers = fetch_peers(&metainfo, &peer_id).await?;
    let mut session = PeerSession::connect_any(&peers, metainfo, peer_id).await?;
    session.prepare().await?;
    Ok(session)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

//! mDNS Listen Example
//!
//! Follows the records of one type (and optionally one name) on the local
//! link and prints every addition, change and expiry.
//!
//! # Usage
//!
//! Watch every service type announced on the link:
//! ```
//! cargo run --package mdns-client --example mdns_listen -- --type PTR --query
//! ```
//!
//! Watch one host:
//! ```
//! cargo run --package mdns-client --example mdns_listen -- --type A --name myhost.local
//! ```

#[path = "util/tokio_socket.rs"]
mod tokio_socket;

use std::time::{Duration, Instant};

use clap::Parser;
use mdns_client::{
    DnsType, ListenerUpdate, MdnsClient, MdnsConfig, MdnsEvent, TransactionFlags,
};
use sansio::Protocol;

use tokio_socket::{SocketRegistry, TokioSocketFactory, parse_type, readable};

#[derive(Parser, Debug)]
#[command(name = "mDNS Listen")]
#[command(version = "0.1.0")]
#[command(author = "Rain Liu <yliu@webrtc.rs>")]
#[command(about = "An example of following mDNS records with the sans-I/O mdns-client")]
struct Args {
    /// Record type to follow
    #[arg(long = "type", default_value = "PTR", value_parser = parse_type)]
    typ: DnsType,

    /// Record name to follow; empty follows every name
    #[arg(long, default_value = "")]
    name: String,

    /// Also send a query so that responders announce themselves
    #[arg(long)]
    query: bool,

    /// How long to listen, in seconds
    #[arg(long, default_value = "30")]
    duration: u64,

    /// Receive our own queries
    #[arg(long)]
    loopback: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = MdnsConfig::default().with_multicast_loopback(args.loopback);

    let registry = SocketRegistry::default();
    let mut client = MdnsClient::with_socket_factory(
        config,
        Box::new(TokioSocketFactory::new(registry.clone())),
    );

    let listener = client.create_listener(args.typ, &args.name);
    client.start_listener(listener)?;
    log::info!(
        "Listening for {} records named '{}' for {}s",
        args.typ,
        args.name,
        args.duration
    );

    if args.query && !args.name.is_empty() {
        let transaction =
            client.create_transaction(args.typ, &args.name, TransactionFlags::QUERY_NETWORK)?;
        client.start_transaction(transaction, Instant::now())?;
    } else if args.query {
        log::warn!("--query needs --name; listening passively");
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(args.duration);

    loop {
        let sockets = registry.sockets();
        let wake_at = client
            .poll_timeout()
            .map(tokio::time::Instant::from_std)
            .map_or(deadline, |at| at.min(deadline));

        tokio::select! {
            ready = readable(&sockets) => {
                ready?;
                if let Err(e) = client.handle_readable(Instant::now()) {
                    log::error!("Connection failed: {}", e);
                    break;
                }
            }
            _ = tokio::time::sleep_until(wake_at) => {
                if tokio::time::Instant::now() >= deadline {
                    log::info!("Done listening");
                    break;
                }
                client.handle_timeout(Instant::now())?;
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        }

        while let Some(event) = client.poll_event() {
            match event {
                MdnsEvent::RecordUpdate { update, record, .. } => {
                    let what = match update {
                        ListenerUpdate::Added => "added",
                        ListenerUpdate::Changed => "changed",
                        ListenerUpdate::Removed => "removed",
                    };
                    println!("{what:>8} {record}");
                }
                MdnsEvent::TransactionResult { result, .. } => {
                    log::debug!("Query finished: {:?}", result);
                }
            }
        }
    }

    client.destroy_listener(listener);
    client.close()?;
    Ok(())
}

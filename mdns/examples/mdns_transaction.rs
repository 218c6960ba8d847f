//! mDNS Transaction Example
//!
//! Looks a record up once, in the cache and on the network, and prints every
//! answer that arrives before the transaction times out.
//!
//! # Usage
//!
//! ```
//! cargo run --package mdns-client --example mdns_transaction -- --name myhost.local
//! ```
//!
//! Stop at the first answer:
//! ```
//! cargo run --package mdns-client --example mdns_transaction -- --name myhost.local --single
//! ```

#[path = "util/tokio_socket.rs"]
mod tokio_socket;

use std::time::{Duration, Instant};

use clap::Parser;
use mdns_client::{DnsType, MdnsClient, MdnsConfig, MdnsEvent, TransactionFlags, TransactionResult};
use sansio::Protocol;

use tokio_socket::{SocketRegistry, TokioSocketFactory, parse_type, readable};

#[derive(Parser, Debug)]
#[command(name = "mDNS Transaction")]
#[command(version = "0.1.0")]
#[command(author = "Rain Liu <yliu@webrtc.rs>")]
#[command(about = "An example of an mDNS lookup with the sans-I/O mdns-client")]
struct Args {
    /// Record type to look up
    #[arg(long = "type", default_value = "A", value_parser = parse_type)]
    typ: DnsType,

    /// Record name to look up
    #[arg(long, default_value = "webrtc-rs-test.local")]
    name: String,

    /// Stop after the first answer
    #[arg(long)]
    single: bool,

    /// How long to wait for answers, in seconds
    #[arg(long, default_value = "3")]
    timeout: u64,

    /// Receive our own query
    #[arg(long)]
    loopback: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = MdnsConfig::default()
        .with_transaction_timeout(Duration::from_secs(args.timeout))
        .with_multicast_loopback(args.loopback);

    let registry = SocketRegistry::default();
    let mut client = MdnsClient::with_socket_factory(
        config,
        Box::new(TokioSocketFactory::new(registry.clone())),
    );

    let mut flags = TransactionFlags::QUERY_CACHE | TransactionFlags::QUERY_NETWORK;
    if args.single {
        flags |= TransactionFlags::SINGLE_RESULT;
    }
    let transaction = client.create_transaction(args.typ, &args.name, flags)?;
    client.start_transaction(transaction, Instant::now())?;
    log::info!(
        "Querying {} records for '{}' (timeout={}s)",
        args.typ,
        args.name,
        args.timeout
    );

    let mut answers = 0usize;
    'event_loop: loop {
        while let Some(event) = client.poll_event() {
            if let MdnsEvent::TransactionResult { result, record, .. } = event {
                match (result, record) {
                    (TransactionResult::Record, Some(record)) => {
                        answers += 1;
                        println!("{record}");
                    }
                    (TransactionResult::Record, None) => {}
                    (TransactionResult::NoResults, _) => {
                        log::info!("No answer for '{}'", args.name);
                        break 'event_loop;
                    }
                    (TransactionResult::Done, _) => {
                        log::info!("{} answer(s) for '{}'", answers, args.name);
                        break 'event_loop;
                    }
                }
                if args.single && answers > 0 {
                    break 'event_loop;
                }
            }
        }

        let sockets = registry.sockets();
        let Some(wake_at) = client.poll_timeout() else {
            break;
        };

        tokio::select! {
            ready = readable(&sockets) => {
                ready?;
                client.handle_readable(Instant::now())?;
            }
            _ = tokio::time::sleep_until(tokio::time::Instant::from_std(wake_at)) => {
                client.handle_timeout(Instant::now())?;
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        }
    }

    client.destroy_transaction(transaction);
    client.close()?;
    Ok(())
}

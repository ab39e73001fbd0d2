//! Textrelay server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address
//! relayd
//!
//! # Public address, capped history, verbose logs
//! relayd --bind 0.0.0.0:9000 --history-limit 500 --log-level debug
//! ```

use clap::Parser;
use textrelay::{RelayConfig, RelayServerBuilder};
use textrelay_broker::BrokerConfig;
use textrelay_protocol::{DEFAULT_HEADER_WIDTH, FrameConfig};
use textrelay_session::SessionConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Multi-room text relay server
#[derive(Parser, Debug)]
#[command(name = "relayd")]
#[command(about = "Multi-room text relay server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = textrelay::DEFAULT_BIND_ADDR)]
    bind: String,

    /// Largest frame body accepted or sent, in bytes
    #[arg(long, default_value_t = textrelay_protocol::DEFAULT_MAX_BODY_LENGTH)]
    max_body_length: usize,

    /// Entries kept per room (unbounded if omitted)
    #[arg(long)]
    history_limit: Option<usize>,

    /// Room every new connection starts in
    #[arg(long, default_value = textrelay_broker::DEFAULT_ROOM)]
    default_room: String,

    /// Accept requests without checking their checksum
    #[arg(long)]
    no_checksum: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> RelayConfig {
        RelayConfig {
            bind_addr: self.bind,
            broker: BrokerConfig {
                default_room: self.default_room,
                history_limit: self.history_limit,
                ..BrokerConfig::default()
            },
            session: SessionConfig {
                frame: FrameConfig {
                    header_width: DEFAULT_HEADER_WIDTH,
                    max_body_length: self.max_body_length,
                },
                verify_checksums: !self.no_checksum,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = args.into_config();
    if !config.session.verify_checksums {
        tracing::warn!("checksum validation disabled");
    }

    let server = RelayServerBuilder::from_config(config)
        .build()
        .await
        .inspect_err(|e| tracing::error!(error = %e, "failed to start relay server"))?;
    tracing::info!("listening on {}", server.local_addr()?);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}

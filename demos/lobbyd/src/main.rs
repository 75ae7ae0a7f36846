//! lobbyd: a runnable Duskhall lobby server.
//!
//! Binds a TCP port, opens one lobby room, and seats every connecting
//! client in it under a sequential guest identity. Point an unmodified
//! client (or the scripted test client) at it and watch the room fill.

use clap::Parser;
use duskhall::duskhall_room::LobbyConfig;
use duskhall::{DuskhallError, DuskhallServer};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lobbyd", about = "Duskhall lobby room server")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:4000")]
    bind: String,

    /// Lobby room name (at most 20 bytes on the wire).
    #[arg(long, default_value = "TestRoom1")]
    room_name: String,
}

#[tokio::main]
async fn main() -> Result<(), DuskhallError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let server = DuskhallServer::builder()
        .bind(&args.bind)
        .lobby(LobbyConfig {
            room_name: args.room_name,
            ..LobbyConfig::default()
        })
        .build()
        .await?;

    tracing::info!(addr = %server.local_addr()?, "lobbyd listening");
    server.run().await
}

use resilient_socket_rs::handlers::{AirdropHandler, airdrop_options};
use resilient_socket_rs::{SocketClient, SocketEvent};
use tracing_subscriber::EnvFilter;

/// Prints the active airdrop list whenever it changes
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let endpoint =
        std::env::var("AIRDROPS_WS_URL").expect("AIRDROPS_WS_URL must be set in .env");

    let client = SocketClient::builder(airdrop_options(endpoint))?
        .handler(AirdropHandler::new())
        .on_event(|event| {
            if let SocketEvent::Update(update) = event {
                let count = update["airdrops"].as_array().map_or(0, Vec::len);
                println!("{count} active airdrop(s): {update}");
            }
        })
        .build();

    client.start(None)?;

    let mut snapshot = client.watch();
    loop {
        tokio::select! {
            changed = snapshot.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = snapshot.borrow_and_update().status;
                println!("Status: {status:?}");
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.shutdown().await;
    Ok(())
}

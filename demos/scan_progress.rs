use resilient_socket_rs::handlers::{ScanHandler, ScanProgress, scan_options};
use resilient_socket_rs::{ConnectionStatus, SocketClient, SocketEvent};
use tracing_subscriber::EnvFilter;

/// Runs one scan and prints its progress until it completes or fails
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let endpoint = std::env::var("SCAN_WS_URL").expect("SCAN_WS_URL must be set in .env");
    let token = std::env::var("SCAN_TOKEN").ok();

    let client = SocketClient::builder(scan_options(&endpoint))?
        .handler(ScanHandler::new())
        .on_event(|event| match event {
            SocketEvent::Update(update) => {
                if let Some(progress) = ScanProgress::from_update(update) {
                    println!(
                        "{:>5.1}% {}",
                        progress.percent,
                        progress.stage.as_deref().unwrap_or("")
                    );
                }
            }
            SocketEvent::Failed(message) => println!("Scan failed: {message}"),
            _ => {}
        })
        .build();

    println!("Starting scan via {}", client.endpoint());
    client.start(token)?;

    let mut snapshot = client.watch();
    tokio::select! {
        _ = snapshot.wait_for(|s| s.status == ConnectionStatus::Disabled) => {}
        _ = tokio::signal::ctrl_c() => println!("Interrupted"),
    }

    if let Some(error) = client.error() {
        println!("Error: {error}");
    }
    client.shutdown().await;
    Ok(())
}

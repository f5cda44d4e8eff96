use std::time::Duration;

use resilient_socket_rs::handlers::{NotificationHandler, notification_options};
use resilient_socket_rs::{ActivityKind, SocketClient, SocketEvent, Visibility};
use tracing_subscriber::EnvFilter;

/// Follows the notification feed, simulating a user who leaves and returns
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let endpoint = std::env::var("NOTIFICATIONS_WS_URL")
        .expect("NOTIFICATIONS_WS_URL must be set in .env");
    let token = std::env::var("SESSION_TOKEN").expect("SESSION_TOKEN must be set in .env");

    let client = SocketClient::builder(notification_options(&endpoint))?
        .handler(NotificationHandler::new())
        .on_event(|event| match event {
            SocketEvent::Status(status) => println!("Status: {status:?}"),
            SocketEvent::Update(update) => println!("Notifications: {update}"),
            SocketEvent::Warning(warning) => println!("Warning: {warning}"),
            SocketEvent::Failed(message) => println!("Failed: {message}"),
        })
        .build();

    client.start(Some(token))?;
    let environment = client.environment();

    tokio::time::sleep(Duration::from_secs(10)).await;
    println!("Tab hidden");
    environment.set_visibility(Visibility::Hidden);

    tokio::time::sleep(Duration::from_secs(5)).await;
    println!("Tab visible again");
    environment.set_visibility(Visibility::Visible);
    environment.activity(ActivityKind::Pointer);

    tokio::signal::ctrl_c().await?;
    client.shutdown().await;
    println!("Final snapshot: {:?}", client.snapshot());
    Ok(())
}

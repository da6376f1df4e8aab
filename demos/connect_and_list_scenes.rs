//! Connects to a host and prints its current scenes. `tracing-subscriber`
//! is wired up here, at the binary entry point — never inside the library.

use interactive_client::{ClientConfig, InteractiveClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let token = std::env::var("INTERACTIVE_TOKEN").expect("INTERACTIVE_TOKEN must be set");
    let version_id: u64 = std::env::var("INTERACTIVE_VERSION_ID")
        .expect("INTERACTIVE_VERSION_ID must be set")
        .parse()?;

    let config = ClientConfig::new(version_id, token);
    let client = InteractiveClient::new(config)?;

    client.connect().await?;
    tracing::info!("connected");

    client.ready(true).await?;

    let scenes = client.scenes().await?.get().await?;
    for scene in scenes {
        println!("{scene}");
    }

    client.disconnect().await;
    Ok(())
}

//! goform-session - one unattended admin run against a router
//!
//! Logs a status snapshot, logs in, applies the configured band lock,
//! waits out the reboot if the lock triggers one, and logs out.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use goform_session::commands::{device_status, lock_band, BandLock};
use goform_session::config::Config;
use goform_session::RouterClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "goform_session=info".into()),
        )
        .init();

    let config = Config::load()?;
    tracing::info!("Configuration loaded for {}", config.router.base_url);

    let client = RouterClient::new(&config.router)?;

    match device_status(&client).await {
        Ok(status) => {
            let snapshot = serde_json::to_string(&status)?;
            tracing::info!("Router status: {}", snapshot);
        }
        Err(e) => tracing::warn!("Status read failed: {}", e),
    }

    let Some(band_lock) = config.band_lock.as_ref() else {
        tracing::info!("No band lock configured, nothing to do");
        return Ok(());
    };
    let lock = BandLock::from(band_lock);

    client.login(&config.router.password).await?;

    if let Err(e) = lock_band(&client, &lock).await {
        tracing::error!("Band lock failed: {}", e);
        if let Err(logout_err) = client.logout().await {
            tracing::warn!("Logout after failure also failed: {}", logout_err);
        }
        return Err(e.into());
    }

    if lock.reboot_after {
        // The old session dies with the reboot; nothing to log out of.
        client.wait_for_quiescence().await;
        client.login(&config.router.password).await?;
        match device_status(&client).await {
            Ok(status) => {
                let snapshot = serde_json::to_string(&status)?;
                tracing::info!("Router back: {}", snapshot);
            }
            Err(e) => tracing::warn!("Status read after reboot failed: {}", e),
        }
    }

    client.logout().await?;
    tracing::info!("Done");
    Ok(())
}

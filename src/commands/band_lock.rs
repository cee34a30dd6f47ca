//! Radio band locking (`TZ_SET_LOCK_BAND`)
//!
//! The five fields are opaque bit patterns taken from configuration; the
//! client only carries them to the router.

use crate::client::RouterClient;
use crate::config::BandLockConfig;
use crate::error::Result;
use crate::protocol::command::CMD_SET_LOCK_BAND;
use crate::protocol::{Command, ParsedResponse, SuccessSignal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandLock {
    pub band_state: String,
    pub band_list: String,
    pub wcdma_list: String,
    pub tds_list: String,
    pub zeact: String,
    pub reboot_after: bool,
}

impl From<&BandLockConfig> for BandLock {
    fn from(config: &BandLockConfig) -> Self {
        Self {
            band_state: config.band_state.clone(),
            band_list: config.band_list.clone(),
            wcdma_list: config.wcdma_list.clone(),
            tds_list: config.tds_list.clone(),
            zeact: config.zeact.clone(),
            reboot_after: config.reboot_after,
        }
    }
}

impl BandLock {
    pub fn to_command(&self) -> Command {
        // Success is `result` == 0, first occurrence.
        let cmd = Command::post(CMD_SET_LOCK_BAND)
            .param("band_state", self.band_state.as_str())
            .param("band_list", self.band_list.as_str())
            .param("wcdma_list", self.wcdma_list.as_str())
            .param("tds_list", self.tds_list.as_str())
            .param("zeact", self.zeact.as_str())
            .expect(SuccessSignal::ResultEquals("0".to_string()));

        if self.reboot_after {
            cmd.reboots_device()
        } else {
            cmd
        }
    }
}

/// Apply a band lock. Requires a logged-in session.
pub async fn lock_band(client: &RouterClient, lock: &BandLock) -> Result<ParsedResponse> {
    tracing::info!("[Router] Locking bands: {}", lock.band_list);
    client.execute(&lock.to_command()).await
}

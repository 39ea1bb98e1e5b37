use std::{net::SocketAddr, time::Duration};

use clap::Parser;

use crate::provider::ProviderSettings;

#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "Recommend closed-loop walking routes of a target duration"
)]
pub struct ServiceConfig {
    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// Base URL of the OSRM routing service
    #[arg(long, env = "OSRM_BASE_URL", default_value = "http://localhost:5000")]
    pub osrm_base_url: String,

    /// OSRM routing profile used for walking paths
    #[arg(long, env = "OSRM_PROFILE", default_value = "foot")]
    pub osrm_profile: String,

    /// Per-request bound on a single route fetch, in milliseconds
    #[arg(long, env = "PROVIDER_TIMEOUT_MS", default_value_t = 7_000)]
    pub provider_timeout_ms: u64,
}

impl ServiceConfig {
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            base_url: self.osrm_base_url.clone(),
            profile: self.osrm_profile.clone(),
            timeout: Duration::from_millis(self.provider_timeout_ms),
        }
    }
}

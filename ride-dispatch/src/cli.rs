use std::{net::IpAddr, path::PathBuf, time::Duration};

use clap::Parser;

use crate::driver::MAX_JITTER_DEGREES;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Nearest-driver ride dispatch service", long_about = None)]
pub struct Cli {
    /// Address to bind the HTTP server to.
    #[arg(long, env = "DISPATCH_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to bind the HTTP server to. Use 0 for an ephemeral port.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// JSON file with the driver roster: an array of {id, name, lat, lon}.
    /// The built-in demo roster is used when omitted.
    #[arg(long, env = "DISPATCH_ROSTER")]
    pub roster: Option<PathBuf>,

    /// Seconds between simulated driver location updates.
    #[arg(
        long,
        env = "JITTER_INTERVAL_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub jitter_interval_secs: u64,

    /// Largest random offset, in degrees, applied to each coordinate per update.
    #[arg(long, env = "JITTER_MAX_OFFSET", default_value_t = 0.002, value_parser = parse_offset)]
    pub jitter_max_offset: f64,

    /// Base URL of the Nominatim-compatible geocoding service.
    #[arg(long, env = "GEOCODER_URL", default_value = "https://nominatim.openstreetmap.org")]
    pub geocoder_url: String,

    /// Base URL of the OSRM-compatible routing service.
    #[arg(long, env = "ROUTER_URL", default_value = "http://router.project-osrm.org")]
    pub router_url: String,

    /// User-Agent sent to the geocoding service.
    #[arg(long, env = "GEOCODER_USER_AGENT", default_value = "RideSharingApp/1.0")]
    pub user_agent: String,
}

impl Cli {
    pub fn jitter_interval(&self) -> Duration {
        Duration::from_secs(self.jitter_interval_secs)
    }
}

fn parse_offset(raw: &str) -> Result<f64, String> {
    let offset: f64 = raw.parse().map_err(|err| format!("{err}"))?;
    if !offset.is_finite() || !(0.0..=MAX_JITTER_DEGREES).contains(&offset) {
        return Err(format!(
            "offset must be a finite number of degrees between 0 and {MAX_JITTER_DEGREES}"
        ));
    }
    Ok(offset)
}

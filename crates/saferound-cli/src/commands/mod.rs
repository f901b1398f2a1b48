pub mod checkin;
pub mod config;
pub mod group;
pub mod scan;
pub mod sobriety;
pub mod tag;

use saferound_core::{ApiClient, Config, Event, UserProfile};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// One event per line on stdout.
pub fn print_event(event: &Event) -> CmdResult {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

pub fn api_client(config: &Config) -> Result<ApiClient, Box<dyn std::error::Error>> {
    Ok(ApiClient::from_config(&config.api)?)
}

pub fn profile(config: &Config) -> Result<UserProfile, Box<dyn std::error::Error>> {
    Ok(UserProfile::from_config(&config.profile)?)
}

/// `q` (any case) ends an interactive loop.
pub fn is_quit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}

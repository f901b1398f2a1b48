use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use saferound_core::tag::{scan_and_validate, ScanOutcome, NO_DRINK_DATA_MESSAGE};
use saferound_core::{Config, TagCodec, ValidationClient};

use super::{api_client, print_event, profile, CmdResult};
use crate::hardware::FileTag;

#[derive(Args)]
pub struct ScanArgs {
    /// Tag file
    tag: PathBuf,
}

pub async fn run(args: ScanArgs) -> CmdResult {
    let config = Config::load()?;
    let profile = profile(&config)?;
    let validator = ValidationClient::new(api_client(&config)?);
    let codec = TagCodec::from_config(&config.tag)?;

    let mut hardware = FileTag::new(args.tag);
    let outcome = scan_and_validate(&mut hardware, &codec, &validator, &profile.user_id, Utc::now()).await;
    print_event(&outcome.to_event(Utc::now()))?;

    match &outcome {
        ScanOutcome::Validated { outcome, .. } => {
            if let Some(notice) = outcome.rejection_notice() {
                eprintln!("{}: {}", notice.headline, notice.detail);
            }
        }
        ScanOutcome::NoDrinkData => eprintln!("{NO_DRINK_DATA_MESSAGE}"),
        ScanOutcome::HardwareFailure { .. } => {}
    }
    Ok(())
}

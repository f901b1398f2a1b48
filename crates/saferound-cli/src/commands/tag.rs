use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use saferound_core::{Config, DecodedTag, Event, TagCodec};
use serde_json::json;

use super::{print_event, CmdResult};
use crate::hardware::FileTag;

#[derive(Subcommand)]
pub enum TagAction {
    /// Issue a new drink and write it to a tag
    Write {
        /// Tag file
        tag: PathBuf,
        /// Alcohol content in grams (defaults to tag.default_dose_grams)
        #[arg(long)]
        grams: Option<f64>,
    },
    /// Decode a tag without validating it
    Read {
        /// Tag file
        tag: PathBuf,
    },
}

pub async fn run(action: TagAction) -> CmdResult {
    let config = Config::load()?;

    match action {
        TagAction::Write { tag, grams } => {
            let grams = grams.unwrap_or(config.tag.default_dose_grams);
            let mut hardware = FileTag::new(tag);
            let now = Utc::now();
            let event = saferound_core::tag::write_drink_tag(
                &mut hardware,
                grams,
                now,
                &mut rand::thread_rng(),
            )
            .await?;
            print_event(&Event::TagWritten {
                drink_id: event.drink_id,
                alcohol_grams: event.alcohol_grams,
                at: now,
            })?;
        }
        TagAction::Read { tag } => {
            let raw = std::fs::read(&tag)?;
            let codec = TagCodec::from_config(&config.tag)?;
            let out = match codec.decode_record(&raw, Utc::now()) {
                DecodedTag::Structured(event) => json!({"decoded": "structured", "drink": event}),
                DecodedTag::Degraded(event) => json!({"decoded": "degraded", "drink": event}),
                DecodedTag::NoData => json!({"decoded": "no_data"}),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

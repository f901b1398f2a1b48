use clap::Subcommand;
use saferound_core::checkin::DeepLinkNotifier;
use saferound_core::{Config, GroupClient, JoinCode};
use serde_json::json;

use super::{api_client, profile, CmdResult};

#[derive(Subcommand)]
pub enum GroupAction {
    /// Create a group and join it
    Create {
        /// Optional group name
        #[arg(long)]
        name: Option<String>,
    },
    /// Join a group with its 6-digit code
    Join {
        /// Join code; separators are ignored
        code: String,
    },
    /// List the members of a group
    Members {
        /// Group id
        group_id: String,
    },
    /// Open the location app to find group members
    Locate,
}

pub async fn run(action: GroupAction) -> CmdResult {
    let config = Config::load()?;

    match action {
        GroupAction::Create { name } => {
            let user = profile(&config)?.user_id;
            let client = GroupClient::new(api_client(&config)?);
            let group = client.create_and_join(&user, name.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&group)?);
        }
        GroupAction::Join { code } => {
            let code = JoinCode::parse(&code)?;
            let user = profile(&config)?.user_id;
            let client = GroupClient::new(api_client(&config)?);
            let group_id = client.join_group(&code, &user).await?;
            println!("{}", json!({ "group_id": group_id }));
        }
        GroupAction::Members { group_id } => {
            let client = GroupClient::new(api_client(&config)?);
            let members = client.members(&group_id).await?;
            if members.is_empty() {
                eprintln!("No members yet. Share the join code.");
            }
            for member in &members {
                println!(
                    "{}",
                    json!({ "user_id": member.user_id, "name": member.display_name() })
                );
            }
        }
        GroupAction::Locate => {
            let notifier = DeepLinkNotifier::from_config(&config.locate);
            let opened = notifier.open_locator()?;
            println!("{}", json!({ "opened": opened }));
        }
    }
    Ok(())
}

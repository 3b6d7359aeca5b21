// Read command - mark a notification read

use super::Notification;
use crate::client::Client;
use crate::output::OutputFormat;
use anyhow::Result;
use uuid::Uuid;

pub async fn run(client: &Client, output: OutputFormat, quiet: bool, id: Uuid) -> Result<()> {
    let notification: Notification = client
        .post(&format!("/v1/notifications/{}/read", id), &serde_json::json!({}))
        .await?;

    if output.is_text() {
        if !quiet {
            println!("Marked {} as read", notification.id);
        }
    } else {
        output.print_value(&notification);
    }

    Ok(())
}

// Notifications command - list recent notifications with unread count

use super::{format_time, Notification};
use crate::client::Client;
use crate::output::{print_table_header, print_table_row, OutputFormat};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
}

#[derive(Debug, Serialize)]
struct NotificationsQuery<'a> {
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    since: Option<DateTime<Utc>>,
}

pub async fn fetch(
    client: &Client,
    user_id: &str,
    since: Option<DateTime<Utc>>,
) -> Result<NotificationList> {
    let list = client
        .get("/v1/notifications", &NotificationsQuery { user_id, since })
        .await?;
    Ok(list)
}

pub fn print_notification(notification: &Notification) {
    let marker = if notification.is_read { " " } else { "*" };
    print_table_row(&[
        (marker, 1),
        (&notification.id.to_string(), 36),
        (&format_time(&notification.created_at), 19),
        (&notification.summary(), 50),
    ]);
}

pub async fn run(
    client: &Client,
    output: OutputFormat,
    user_id: &str,
    since: Option<DateTime<Utc>>,
) -> Result<()> {
    let list = fetch(client, user_id, since).await?;

    if output.is_text() {
        println!("{} unread\n", list.unread_count);
        if list.notifications.is_empty() {
            println!("No notifications");
            return Ok(());
        }
        print_table_header(&[(" ", 1), ("ID", 36), ("TIME", 19), ("ACTIVITY", 50)]);
        for notification in &list.notifications {
            print_notification(notification);
        }
    } else {
        output.print_value(&list);
    }

    Ok(())
}

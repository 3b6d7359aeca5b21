// Feed command - page through a user's activity

use super::{format_time, Event};
use crate::client::Client;
use crate::output::{print_table_header, print_table_row, OutputFormat};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub events: Vec<Event>,
    pub next_cursor: Option<DateTime<Utc>>,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
struct FeedQuery<'a> {
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

pub async fn run(
    client: &Client,
    output: OutputFormat,
    user_id: &str,
    limit: Option<u32>,
    cursor: Option<DateTime<Utc>>,
    all: bool,
) -> Result<()> {
    let mut events = Vec::new();
    let mut cursor = cursor;
    let mut next_cursor;

    loop {
        let page: FeedPage = client
            .get(
                "/v1/feed",
                &FeedQuery {
                    user_id,
                    cursor,
                    limit,
                },
            )
            .await?;

        events.extend(page.events);
        next_cursor = page.next_cursor;
        if !all || !page.has_more || next_cursor.is_none() {
            break;
        }
        cursor = next_cursor;
    }

    if output.is_text() {
        if events.is_empty() {
            println!("No events found");
            return Ok(());
        }

        print_table_header(&[("TIME", 19), ("ACTOR", 14), ("VERB", 12), ("OBJECT", 30)]);
        for event in &events {
            let object = format!("{}:{}", event.object_type, event.object_id);
            print_table_row(&[
                (&format_time(&event.created_at), 19),
                (&event.actor_id, 14),
                (&event.verb, 12),
                (&object, 30),
            ]);
        }
        if let Some(next) = next_cursor {
            println!("\nMore available: --cursor {}", next.to_rfc3339());
        }
    } else {
        output.print_value(&serde_json::json!({
            "events": events,
            "next_cursor": next_cursor,
        }));
    }

    Ok(())
}

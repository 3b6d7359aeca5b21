// Top command - most frequent verbs and objects in a window

use crate::client::Client;
use crate::output::{print_field, print_table_header, print_table_row, OutputFormat};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyCount {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub window: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub total_events: u64,
    pub top_verbs: Vec<KeyCount>,
    pub top_objects: Vec<KeyCount>,
}

#[derive(Debug, Serialize)]
struct TopQuery<'a> {
    window: &'a str,
    k: usize,
}

fn print_ranking(title: &str, entries: &[KeyCount]) {
    println!("\n{}", title);
    if entries.is_empty() {
        println!("  (none)");
        return;
    }
    print_table_header(&[("KEY", 40), ("COUNT", 8)]);
    for entry in entries {
        print_table_row(&[(&entry.key, 40), (&entry.count.to_string(), 8)]);
    }
}

pub async fn run(client: &Client, output: OutputFormat, window: &str, k: usize) -> Result<()> {
    let snapshot: Snapshot = client
        .get("/v1/analytics/top", &TopQuery { window, k })
        .await?;

    if output.is_text() {
        print_field("Window", &snapshot.window);
        print_field(
            "Range",
            &format!(
                "{} .. {}",
                snapshot.window_start.to_rfc3339(),
                snapshot.window_end.to_rfc3339()
            ),
        );
        print_field("Events", &snapshot.total_events.to_string());
        print_ranking("Top verbs", &snapshot.top_verbs);
        print_ranking("Top objects", &snapshot.top_objects);
    } else {
        output.print_value(&snapshot);
    }

    Ok(())
}

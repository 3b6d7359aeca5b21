// Ingest command - record an event

use crate::client::Client;
use crate::output::{print_field, OutputFormat};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct IngestRequest {
    actor_id: String,
    verb: String,
    object_type: String,
    object_id: String,
    target_user_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IngestResponse {
    event_id: Uuid,
}

pub struct IngestArgs {
    pub actor: String,
    pub verb: String,
    pub object_type: String,
    pub object_id: String,
    pub targets: Vec<String>,
    pub metadata: Option<String>,
    pub at: Option<DateTime<Utc>>,
}

pub async fn run(client: &Client, output: OutputFormat, quiet: bool, args: IngestArgs) -> Result<()> {
    let metadata = args
        .metadata
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--metadata must be valid JSON")?;

    let request = IngestRequest {
        actor_id: args.actor,
        verb: args.verb,
        object_type: args.object_type,
        object_id: args.object_id,
        target_user_ids: args.targets,
        metadata,
        created_at: args.at,
    };

    let response: IngestResponse = client.post("/v1/events", &request).await?;

    if output.is_text() {
        if quiet {
            println!("{}", response.event_id);
        } else {
            print_field("Event", &response.event_id.to_string());
            print_field("Targets", &request.target_user_ids.len().to_string());
        }
    } else {
        output.print_value(&response);
    }

    Ok(())
}

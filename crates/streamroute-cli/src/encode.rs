//! `streamroute encode` - build events the way a producer would send them

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use serde_json::Value;

use streamroute_core::protocol::{done_event, ServerSentEvent};
use streamroute_core::{ComponentId, Envelope, ErrorPayload, PropsPatch, PropsUpdate};

#[derive(Subcommand)]
pub enum EncodeCommand {
    /// `["[SINGLE]", id, props]`
    Single {
        /// Component id, plain or a JSON object
        id: String,
        /// Props patch as a JSON object
        props: String,
    },
    /// `["[BATCH]", [[id, props], ...]]`
    Batch {
        /// JSON list of `[id, props]` pairs
        updates: String,
    },
    /// `["[ERROR]", id, {error, handleError, resetProps}]`
    Error {
        id: String,
        message: String,
        /// Ask the client to show the message to the user
        #[arg(long)]
        alert: bool,
        /// JSON list of `[id, props]` pairs to reset
        #[arg(long)]
        reset: Option<String>,
    },
    /// The `[DONE]` sentinel
    Done,
}

fn parse_id(raw: &str) -> ComponentId {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(pattern)) => ComponentId::Pattern(pattern),
        _ => ComponentId::from(raw),
    }
}

fn parse_props(raw: &str) -> Result<PropsPatch> {
    match serde_json::from_str::<Value>(raw).context("props must be JSON")? {
        Value::Object(patch) => Ok(patch),
        other => Err(anyhow!("props must be a JSON object, got {}", other)),
    }
}

fn parse_pairs(raw: &str) -> Result<Vec<PropsUpdate>> {
    let value: Value = serde_json::from_str(raw).context("updates must be JSON")?;
    let pairs = value
        .as_array()
        .ok_or_else(|| anyhow!("updates must be a JSON list"))?;
    pairs
        .iter()
        .map(|pair| {
            PropsUpdate::from_pair(pair)
                .ok_or_else(|| anyhow!("expected an [id, props] pair, got {}", pair))
        })
        .collect()
}

pub fn run(command: EncodeCommand) -> Result<String> {
    let event = match command {
        EncodeCommand::Single { id, props } => {
            Envelope::single(parse_id(&id), parse_props(&props)?).to_event()
        }
        EncodeCommand::Batch { updates } => Envelope::batch(parse_pairs(&updates)?).to_event(),
        EncodeCommand::Error {
            id,
            message,
            alert,
            reset,
        } => {
            let reset_props = match reset {
                Some(raw) => parse_pairs(&raw)?,
                None => Vec::new(),
            };
            Envelope::error(
                Some(parse_id(&id)),
                ErrorPayload {
                    error: message,
                    handle_error: alert,
                    reset_props,
                },
            )
            .to_event()
        }
        EncodeCommand::Done => done_event(),
    };
    Ok(ServerSentEvent::encode(&event))
}

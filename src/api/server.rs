use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};
use crate::application::{derive, DerivedSnapshot};
use crate::config::EngineConfig;
use crate::domain::normalize::graph_from_document;
use crate::api::dto::DerivationDto;

#[derive(Debug, Deserialize)]
struct CommandReq {
    command: String,
    params: Option<serde_json::Value>,
}

/// Serve newline-delimited JSON commands on 127.0.0.1:`port`, one thread per
/// connection. Each request is independent; no state is shared between them.
pub fn start_server(port: u16, config: EngineConfig) -> Result<()> {
    let address = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&address)
        .with_context(|| format!("Failed to bind to {}", address))?;

    info!(%address, "derivation server listening");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                thread::spawn(move || {
                    if let Err(e) = handle_connection(stream, &config) {
                        warn!(error = %e, "connection error");
                    }
                });
            }
            Err(e) => error!(error = %e, "accept error"),
        }
    }

    Ok(())
}

fn handle_connection(mut stream: TcpStream, config: &EngineConfig) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match process_command(trimmed, config) {
            Ok(data) => json!({
                "status": "success",
                "data": data
            }),
            Err(e) => json!({
                "status": "error",
                "message": e.to_string()
            }),
        };

        let response_str = serde_json::to_string(&response)?;
        stream.write_all(response_str.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;

        if let Ok(req) = serde_json::from_str::<CommandReq>(trimmed) {
            if req.command == "SHUTDOWN" {
                info!("shutdown requested");
                std::process::exit(0);
            }
        }
    }
    Ok(())
}

/// Execute one command line and return the `data` payload.
pub fn process_command(json_str: &str, config: &EngineConfig) -> Result<serde_json::Value> {
    let req: CommandReq = serde_json::from_str(json_str)
        .context("Invalid JSON format")?;

    match req.command.as_str() {
        "PING" => Ok(json!("PONG")),
        "DERIVE" => handle_derive(req.params, config),
        "SHUTDOWN" => Ok(json!("Shutting down...")),
        _ => anyhow::bail!("Unknown command: {}", req.command),
    }
}

fn handle_derive(params: Option<serde_json::Value>, config: &EngineConfig) -> Result<serde_json::Value> {
    let params = params.ok_or_else(|| anyhow::anyhow!("Missing params for DERIVE"))?;

    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("snapshot")
        .to_string();

    // Either {"snapshot": {...}} or the snapshot document itself
    let document = params.get("snapshot").unwrap_or(&params);
    let graph = graph_from_document(document);
    debug!(%name, calls = graph.len(), "derive request");

    let derivation = derive(&graph, config);
    let dto = DerivationDto::from(&DerivedSnapshot { name, graph, derivation });
    Ok(serde_json::to_value(dto)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping() {
        let data = process_command(r#"{"command": "PING"}"#, &EngineConfig::default()).unwrap();
        assert_eq!(data, json!("PONG"));
    }

    #[test]
    fn test_derive_inline_document() {
        let cmd = r#"{"command": "DERIVE", "params": {
            "name": "chain",
            "calls": [
                {"id": "a", "latency": 10, "cost": 0.01},
                {"id": "b", "latency": 20, "cost": 0.01}
            ],
            "edges": [{"source": "a", "target": "b"}]
        }}"#;
        let data = process_command(cmd, &EngineConfig::default()).unwrap();
        assert_eq!(data["name"], "chain");
        assert_eq!(data["layout"]["nodes"][1]["level"], 1);
        assert_eq!(data["metrics"]["totalLatency"], 30.0);
    }

    #[test]
    fn test_derive_requires_params() {
        let err = process_command(r#"{"command": "DERIVE"}"#, &EngineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Missing params"));
    }

    #[test]
    fn test_unknown_command() {
        let err = process_command(r#"{"command": "ANALYZE"}"#, &EngineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Unknown command"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(process_command("not json", &EngineConfig::default()).is_err());
    }
}

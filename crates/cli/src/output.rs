//! Terminal rendering of discovery reports.
//!
//! Every report is either one JSON document on stdout or a status line,
//! optionally followed by a node list and `label: value` fields.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use remake_lib::graph::NodeId;
use remake_lib::util::hash::ContentHash;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Outcome a status line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  /// Nothing to do.
  Clean,
  /// Targets need rebuilding.
  Stale,
  /// Declared inputs are absent.
  Missing,
  /// The command failed.
  Failed,
}

impl Status {
  fn marker(self) -> &'static str {
    match self {
      Status::Clean => "✓",
      Status::Stale => "•",
      Status::Missing => "⚠",
      Status::Failed => "✗",
    }
  }

  /// Problems go to stderr so stdout stays a clean node list.
  fn on_stderr(self) -> bool {
    matches!(self, Status::Missing | Status::Failed)
  }
}

pub fn status(status: Status, message: &str) {
  let stream = if status.on_stderr() { Stream::Stderr } else { Stream::Stdout };
  let marker_text = status.marker();
  let marker = marker_text.if_supports_color(stream, |m| match status {
    Status::Clean => m.green().to_string(),
    Status::Stale => m.blue().to_string(),
    Status::Missing => m.yellow().to_string(),
    Status::Failed => m.red().to_string(),
  });
  if status.on_stderr() {
    eprintln!("{} {}", marker, message);
  } else {
    println!("{} {}", marker, message);
  }
}

/// A status line counting `nodes`, then one node per line on stdout.
pub fn node_list(status_kind: Status, noun: &str, nodes: &[NodeId]) {
  status(status_kind, &format!("{} {}(s):", nodes.len(), noun));
  for id in nodes {
    println!("  {} {}", "→".if_supports_color(Stream::Stdout, |a| a.dimmed()), id);
  }
}

pub fn field(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |l| l.dimmed()), value);
}

/// Leading 12 characters of a recorded hash.
pub fn short_hash(hash: &ContentHash) -> &str {
  let hash = hash.0.as_str();
  &hash[..hash.len().min(12)]
}

/// Wall time of a discovery call: milliseconds under a second, then seconds.
pub fn elapsed(duration: Duration) -> String {
  if duration < Duration::from_secs(1) {
    format!("{}ms", duration.as_millis())
  } else {
    format!("{:.2}s", duration.as_secs_f64())
  }
}

pub fn emit_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use medialistener::{
    expand_every_percentage, translate_seconds, Handler, HtmlDocument, ListenerConfig, ListenerContext, MediaHost,
    MilestoneEvent, TaskQueue, TriggerConfig,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Playback milestone tooling
#[derive(Parser)]
#[command(name = "medialistener", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Format whole seconds as HH:MM:SS
    Translate { seconds: u64 },

    /// Expand "every N%" repeaters into absolute percentages
    Expand {
        #[arg(required = true)]
        every: Vec<f64>,
    },

    /// Play every media element of a document to the end and print the
    /// milestones that fire, one JSON object per line
    Replay {
        /// Source duration in seconds (NaN for unknown, inf for a stream)
        #[arg(long)]
        duration: f64,

        /// Trigger configuration as JSON
        #[arg(long)]
        triggers: String,

        /// Listener configuration as JSON
        #[arg(long)]
        listener_config: Option<String>,

        /// Seconds of playback between timing updates
        #[arg(long)]
        step: Option<f64>,

        /// How far to play when the duration is not finite
        #[arg(long, default_value_t = 60.0)]
        until: f64,

        /// HTML document to load players from (default: a single <video>)
        #[arg(long)]
        html: Option<PathBuf>,

        /// Players to register on (default: all)
        #[arg(long)]
        selector: Option<String>,
    },
}

struct Replay {
    duration: f64,
    triggers: TriggerConfig,
    config: ListenerConfig,
    step: Option<f64>,
    until: f64,
    html: String,
    selector: Option<String>,
}

fn replay(opts: Replay, out: &mut impl Write) -> Result<()> {
    let mut doc = HtmlDocument::parse(&opts.html)?;
    if let Some(step) = opts.step {
        if !(step.is_finite() && step > 0.0) {
            bail!("--step must be a positive number of seconds");
        }
        doc = doc.with_tick(step);
    }
    let doc = Arc::new(doc);
    let queue = Arc::new(TaskQueue::new());
    let ctx = ListenerContext::new(doc.clone(), queue.clone(), opts.config);

    let fired: Arc<Mutex<Vec<MilestoneEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = fired.clone();
    let handler = Handler::new(move |e| {
        if let Ok(mut fired) = sink.lock() {
            fired.push(e.clone());
        }
    });

    let listener = ctx.listener();
    listener.on(opts.selector.as_deref(), &opts.triggers, &handler)?;

    let players = doc.players();
    if players.is_empty() {
        bail!("document has no <audio> or <video> elements");
    }
    let length = if opts.duration.is_finite() { opts.duration } else { opts.until };

    for player in players {
        info!("replaying {} ({:?}) for {}s", player, doc.tag(player), length);
        doc.load(player, opts.duration, ctx.as_ref())?;
        doc.play(player, ctx.as_ref())?;
        doc.advance(player, length, ctx.as_ref())?;
        queue.run_until_idle();

        let events = std::mem::take(&mut *fired.lock().map_err(|_| anyhow::anyhow!("handler panicked"))?);
        for event in events {
            writeln!(out, "{}", serde_json::to_string(&event)?)?;
        }
    }
    listener.destroy();
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Translate { seconds } => writeln!(out, "{}", translate_seconds(seconds))?,
        Command::Expand { every } => {
            let expanded: Vec<String> = expand_every_percentage(&every).iter().map(|p| p.to_string()).collect();
            writeln!(out, "{}", expanded.join(" "))?;
        }
        Command::Replay { duration, triggers, listener_config, step, until, html, selector } => {
            let triggers = TriggerConfig::from_json(&triggers).context("parsing --triggers")?;
            let config = match listener_config {
                Some(json) => ListenerConfig::from_json(&json).context("parsing --listener-config")?,
                None => ListenerConfig::default(),
            };
            let html = match html {
                Some(path) => {
                    std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?
                }
                None => "<video></video>".to_string(),
            };
            replay(Replay { duration, triggers, config, step, until, html, selector }, &mut out)?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(duration: f64, triggers: &str) -> Vec<serde_json::Value> {
        let opts = Replay {
            duration,
            triggers: TriggerConfig::from_json(triggers).unwrap(),
            config: ListenerConfig::default(),
            step: None,
            until: 60.0,
            html: "<video></video>".to_string(),
            selector: None,
        };
        let mut buf = Vec::new();
        replay(opts, &mut buf).unwrap();
        String::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn replay_prints_one_line_per_milestone() {
        let lines = run(10.0, r#"{"events": ["play", "ended"], "percentages": {"each": [50]}}"#);
        let labels: Vec<&str> = lines.iter().map(|v| v["label"].as_str().unwrap()).collect();
        assert_eq!(labels, vec!["play", "50%", "ended"]);
        assert_eq!(lines[2]["seconds"], 10);
    }

    #[test]
    fn cli_parses_replay_flags() {
        let cli = Cli::try_parse_from([
            "medialistener",
            "replay",
            "--duration",
            "30",
            "--triggers",
            "{}",
            "--step",
            "2",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Replay { step: Some(s), .. } if s == 2.0));
    }
}

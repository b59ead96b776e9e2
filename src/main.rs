//! Load the configured feed, apply a filter and print both synced views.
//!
//! Usage:
//!   helpkart [--query TEXT] [--since DATE] [--location TEXT] [--status LABEL]...
//!            [--type KEYWORD]... [--keyword WORD]... [--needs] [--surplus]
//!            [--view map|list] [--watch]
//!
//! With `--watch`, every stdin line becomes a new free-text query; bursts are
//! debounced and each settled query prints a one-line summary.

use anyhow::{anyhow, Result};
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use helpkart::app::{debounced_filters, App};
use helpkart::classify::parse_timestamp;
use helpkart::filter::{FilterSpec, FilterSpecBuilder};
use helpkart::logging::{log, obj, v_str, Domain, Level};
use helpkart::state::{now_ms, Config, ViewMode};

struct CliArgs {
    spec: FilterSpecBuilder,
    view: ViewMode,
    watch: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut spec = FilterSpec::builder();
    let mut view = ViewMode::Map;
    let mut watch = false;
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let mut value = || {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{} needs a value", flag))
        };
        spec = match flag.as_str() {
            "--query" => spec.query(&value()?),
            "--since" => {
                let raw = value()?;
                let ms = parse_timestamp(&raw).ok_or_else(|| anyhow!("bad --since date: {}", raw))?;
                spec.since(Utc.timestamp_millis_opt(ms).single().ok_or_else(|| anyhow!("--since out of range"))?)
            }
            "--location" => spec.location(&value()?),
            "--status" => spec.urgency(&value()?),
            "--type" => spec.type_keyword(&value()?),
            "--keyword" => spec.keyword(&value()?),
            "--needs" => spec.has_needs(true),
            "--surplus" => spec.has_surplus(true),
            "--view" => {
                view = match value()?.as_str() {
                    "list" => ViewMode::List,
                    "map" => ViewMode::Map,
                    other => return Err(anyhow!("unknown view: {}", other)),
                };
                spec
            }
            "--watch" => {
                watch = true;
                spec
            }
            other => return Err(anyhow!("unknown argument: {}", other)),
        };
    }
    Ok(CliArgs { spec, view, watch })
}

fn print_view(app: &App, mode: ViewMode) -> Result<()> {
    let state = app.state();
    let body = match mode {
        ViewMode::Map => {
            let layer = app.view().spatial();
            json!({
                "view": "map",
                "bounds": layer.bounds(),
                "markers": layer.visible_markers().collect::<Vec<_>>(),
                "unplaced": layer.unplaced(),
            })
        }
        ViewMode::List => {
            let list = app.view().list();
            json!({
                "view": "list",
                "cards": list.cards(),
                "empty": list.is_empty_state().then_some(helpkart::sink::EMPTY_STATE),
            })
        }
    };
    let out = json!({
        "banner": state.banner(),
        "last_updated": state.last_refresh_label(),
        "total": state.entities.len(),
        "result": body,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// A typed query replaces only the free text; flag criteria carry over.
fn query_spec(base: &FilterSpecBuilder, line: &str) -> FilterSpec {
    base.clone().query(line.trim()).build()
}

async fn watch_queries(app: &mut App, base: FilterSpecBuilder) -> Result<()> {
    let (tx, mut settled) = debounced_filters(Duration::from_millis(app.config().debounce_ms));
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tx.submit(query_spec(&base, &line));
        }
    });
    app.follow_filters(&mut settled, |state, summary| {
        println!(
            "{}",
            json!({"query": state.spec.query_text(), "visible": summary.visible, "hidden": summary.hidden})
        );
    })
    .await?;
    reader.await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;
    let cfg = Config::from_env();
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[("source", v_str(&cfg.data_url))]),
    );

    let mut app = App::from_config(cfg)?;
    if let Err(e) = app.load(now_ms()).await {
        eprintln!("{}: {:#}", app.state().banner(), e);
        std::process::exit(1);
    }
    if cli.view != app.state().view_mode {
        app.toggle_view();
    }
    app.set_filter(cli.spec.clone().build())?;

    if cli.watch {
        return watch_queries(&mut app, cli.spec).await;
    }
    print_view(&app, app.state().view_mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_full_filter() {
        let cli = parse_args(&args(&[
            "--query", "Rice", "--status", "critical", "--type", "school", "--keyword", "dal",
            "--needs", "--since", "2024-01-01", "--view", "list",
        ]))
        .unwrap();
        let spec = cli.spec.build();
        assert_eq!(spec.query_text(), "rice");
        assert!(spec.urgency().contains("critical"));
        assert!(spec.types().contains("school"));
        assert_eq!(spec.keywords(), ["dal".to_string()]);
        assert!(spec.has_needs());
        assert_eq!(spec.since_ms(), parse_timestamp("2024-01-01"));
        assert_eq!(cli.view, ViewMode::List);
        assert!(!cli.watch);
    }

    #[test]
    fn test_watch_query_keeps_flag_criteria() {
        let cli = parse_args(&args(&["--status", "critical", "--needs", "--query", "old", "--watch"])).unwrap();
        assert!(cli.watch);
        let spec = query_spec(&cli.spec, "  Rice \n");
        assert_eq!(spec.query_text(), "rice");
        assert!(spec.urgency().contains("critical"));
        assert!(spec.has_needs());
        assert_eq!(query_spec(&cli.spec, "").query_text(), "");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&["--query"])).is_err());
        assert!(parse_args(&args(&["--since", "soon"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
        assert!(parse_args(&args(&["--view", "globe"])).is_err());
    }
}

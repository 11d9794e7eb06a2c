use anyhow::{bail, Context, Result};
use scoutbox::kernel::layout::{FormKind, FormLayout};
use scoutbox::kernel::path::FieldPath;
use scoutbox::kernel::state::{Attempt, LeafValue};
use scoutbox::kernel::timer::format_hundredths;
use scoutbox::outbox::{ConnectivityMonitor, FileOutboxStore, Outbox, SubmissionSink, SyncCoordinator};
use scoutbox::services::api::{spawn_probe, ApiClient};
use scoutbox::{FormSession, Notice, ScoutConfig, SubmitOutcome};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
commands:
  fields                      list every field with its current value
  set <path> <json>           write a raw value
  check <path> <true|false>   tick or untick a checkbox
  add <path> <delta>          adjust a number
  made <path> [n] / missed <path> [n]
  pick <path> <option>        single choice
  toggle <path> <option>      multiple choice
  timer <start|stop|reset> <path>
  upload <path> <file>        upload a picture and attach it
  score | submit | pending | clear | help | quit
paths are dotted, e.g. auto_json.L1";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (kind, config_path) = parse_args()?;
    let config = ScoutConfig::load(config_path.as_deref())?;
    tracing::info!("Scouting console starting ({} form, server {})", kind, config.base_url);

    let api = ApiClient::from_config(&config);
    let schema = load_schema(&api, config.schema_path.as_deref()).await?;
    let layout = FormLayout::from_document(kind, &schema);

    let outbox = Outbox::new(FileOutboxStore::new(&config.outbox_path));
    let sink: Arc<dyn SubmissionSink> = Arc::new(api.clone());
    let (notice_tx, mut notice_rx) = mpsc::channel::<Notice>(32);

    let connectivity = ConnectivityMonitor::new(api.reachable().await);
    let probe_token = CancellationToken::new();
    let probe = spawn_probe(
        api.clone(),
        connectivity.clone(),
        config.probe_interval(),
        probe_token.clone(),
    );

    let sync = SyncCoordinator::new(outbox.clone(), Arc::clone(&sink), connectivity, notice_tx.clone())
        .with_interval(config.sync_interval())
        .with_startup_delay(config.startup_flush_delay())
        .spawn();

    let session = FormSession::start(layout, sink, outbox.clone(), notice_tx, config.score_tick())?;

    tokio::spawn(async move {
        while let Some(notice) = notice_rx.recv().await {
            if notice.is_warning() {
                tracing::warn!("{}", notice.message());
            } else {
                tracing::info!("{}", notice.message());
            }
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        if let Err(e) = run_command(&session, &api, &outbox, line).await {
            println!("error: {e:#}");
        }
    }

    session.shutdown();
    probe_token.cancel();
    let _ = probe.await;
    sync.shutdown().await;
    tracing::info!("Scouting console stopped");
    Ok(())
}

fn parse_args() -> Result<(FormKind, Option<PathBuf>)> {
    let mut kind = FormKind::Match;
    let mut config = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "match" => kind = FormKind::Match,
            "pit" => kind = FormKind::Pit,
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            other => bail!("unknown argument '{other}' (expected match, pit or --config <file>)"),
        }
    }
    Ok((kind, config))
}

async fn load_schema(api: &ApiClient, local: Option<&Path>) -> Result<Value> {
    match local {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading schema {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing schema {}", path.display()))
        }
        None => api.fetch_schema().await,
    }
}

async fn run_command(session: &FormSession, api: &ApiClient, outbox: &Outbox, line: &str) -> Result<()> {
    let mut parts = line.splitn(3, ' ');
    let command = parts.next().unwrap_or_default();
    let mut arg = || parts.next().map(str::trim).filter(|s| !s.is_empty());

    match command {
        "help" => println!("{HELP}"),
        "fields" => print_fields(session),
        "set" => {
            let path = path_arg(arg())?;
            let raw = arg().context("missing value")?;
            let json: Value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            let value = LeafValue::from_json(&json).context("value must be a scalar, list or made/missed pair")?;
            session.set(&path, value)?;
        }
        "check" => {
            let path = path_arg(arg())?;
            let checked = arg().map_or(true, |s| s == "true" || s == "1" || s == "yes");
            session.set_checked(&path, checked)?;
        }
        "add" => {
            let path = path_arg(arg())?;
            let delta: f64 = arg().unwrap_or("1").parse().context("delta must be a number")?;
            println!("{}", session.adjust_number(&path, delta)?);
        }
        "made" | "missed" => {
            let attempt = if command == "made" { Attempt::Made } else { Attempt::Missed };
            let path = path_arg(arg())?;
            let delta: i64 = arg().unwrap_or("1").parse().context("count must be an integer")?;
            let pair = session.record_attempt(&path, attempt, delta)?;
            println!("made {} / missed {}", pair.made, pair.missed);
        }
        "pick" => {
            let path = path_arg(arg())?;
            session.choose(&path, arg().context("missing option")?)?;
        }
        "toggle" => {
            let path = path_arg(arg())?;
            let option = arg().context("missing option")?;
            let selected = session
                .get(&path)
                .and_then(|v| v.selections().map(|s| s.contains(&option)))
                .unwrap_or(false);
            let now = session.toggle_option(&path, option, !selected)?;
            println!("{}", now.join(", "));
        }
        "timer" => {
            let action = arg().context("missing timer action")?;
            let path = path_arg(arg())?;
            match action {
                "start" => session.start_timer(&path)?,
                "stop" => println!("{}", format_hundredths(session.stop_timer(&path)?)),
                "reset" => session.reset_timer(&path)?,
                other => bail!("unknown timer action '{other}'"),
            }
        }
        "upload" => {
            let path = path_arg(arg())?;
            let file = arg().context("missing file")?;
            let reference = api.upload_image_file(Path::new(file)).await?;
            session.attach_reference(&path, &reference)?;
            println!("attached {reference}");
        }
        "score" => {
            let score = session.score();
            for section in &score.sections {
                println!("{:<20} {}", section.title, section.points);
            }
            println!("{:<20} {}", "Total", score.total);
        }
        "submit" => match session.submit().await? {
            SubmitOutcome::Delivered(receipt) => {
                let id = receipt.id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string());
                match receipt.total {
                    Some(total) => println!("submitted as {id} (server total {total})"),
                    None => println!("submitted as {id}"),
                }
            }
            SubmitOutcome::Offline { placeholder_id, .. } => println!("saved offline as {placeholder_id}"),
        },
        "pending" => {
            for entry in outbox.pending().await? {
                println!("{} {} {}", entry.enqueued_at.to_rfc3339(), entry.kind, entry.id);
            }
        }
        "clear" => session.clear()?,
        other => bail!("unknown command '{other}' (try 'help')"),
    }
    Ok(())
}

fn path_arg(arg: Option<&str>) -> Result<FieldPath> {
    let path = FieldPath::parse_dotted(arg.context("missing field path")?);
    if path.is_empty() {
        bail!("empty field path");
    }
    Ok(path)
}

fn print_fields(session: &FormSession) {
    for section in session.sections() {
        println!("== {}", section.spec.title);
        for leaf in section.descriptor.leaves() {
            let current = session
                .get(&leaf.path)
                .map(|v| v.to_json().to_string())
                .unwrap_or_default();
            let kind = leaf.kind().map_or("?", |k| k.name());
            println!("  {:<40} {:<16} {}", leaf.path.to_string(), kind, current);
        }
    }
}

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use listing_core::driver::{spawn_session, Command, Navigator, SessionHandle, SessionSnapshot};
use listing_core::query::{href, parse_bound};
use listing_core::session::RANGE_DEBOUNCE;
use listing_core::{ApiClient, Bounds, ListingKind, ResultPage};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "browse")]
#[command(about = "Browse listings from the terminal with URL-synchronized filters")]
struct Cli {
    /// Listing page to open: properties or creators
    #[arg(long, default_value = "properties")]
    kind: String,
    /// Initial query string, as found after `?` in a page URL
    #[arg(long, default_value = "")]
    query: String,
    /// Base URL of the listings API
    #[arg(long, env = "API_BASE_URL", default_value = "http://localhost:5000")]
    api_base: String,
    /// Request timeout seconds
    #[arg(long, env = "API_TIMEOUT_SECS", default_value_t = 12)]
    timeout_secs: u64,
}

/// Prints every shallow navigation instead of touching a browser history.
struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn push(&self, path: &str, query: &str) {
        println!("url {}", href(path, query));
    }
}

#[derive(Debug, PartialEq)]
enum Input {
    Session(Command),
    Show,
    Quit,
}

const HELP: &str = "commands: toggle <field> <value> | range <field> <min> <max> | page <n> | limit <n> | clear | go <query> | show | quit";

fn parse_number(raw: Option<&str>, what: &str) -> Result<i64> {
    let raw = raw.ok_or_else(|| anyhow!("missing {what}"))?;
    parse_bound(raw).ok_or_else(|| anyhow!("{what} is not a number: {raw}"))
}

fn parse_count(raw: Option<&str>, what: &str) -> Result<u32> {
    let n = parse_number(raw, what)?;
    u32::try_from(n).map_err(|_| anyhow!("{what} out of range: {n}"))
}

/// One input line. Blank lines and `#` comments yield `None`.
fn parse_line(line: &str) -> Result<Option<Input>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let input = match verb {
        "toggle" => {
            let field = words.next().ok_or_else(|| anyhow!("missing field"))?;
            let value = words.collect::<Vec<_>>().join(" ");
            if value.is_empty() {
                bail!("missing value");
            }
            Input::Session(Command::Toggle { field: field.to_string(), value })
        }
        "range" => {
            let field = words.next().ok_or_else(|| anyhow!("missing field"))?.to_string();
            let min = parse_number(words.next(), "min")?;
            let max = parse_number(words.next(), "max")?;
            Input::Session(Command::SetRange { field, bounds: Bounds::new(min, max) })
        }
        "page" => Input::Session(Command::SetPage(parse_count(words.next(), "page")?)),
        "limit" => Input::Session(Command::SetLimit(parse_count(words.next(), "limit")?)),
        "clear" => Input::Session(Command::ClearAll),
        "go" => Input::Session(Command::Navigate(words.next().unwrap_or_default().to_string())),
        "show" => Input::Show,
        "quit" | "exit" => Input::Quit,
        other => bail!("unknown command `{other}`"),
    };
    Ok(Some(input))
}

fn print_snapshot(snap: &SessionSnapshot) {
    let results = &snap.results;
    let pagination = results.pagination();
    println!(
        "{} results, page {} of {}{}",
        results.shown_total(),
        pagination.current_page,
        pagination.total_pages.max(1),
        if snap.loading { " (loading)" } else { "" }
    );
    for chip in &snap.active_filters {
        println!("  [{}: {}]", chip.label, chip.text);
    }
    for item in &results.items {
        println!("  {}  {}", item.title(), item.href());
    }
}

/// Waits out a pending range edit and the fetch it triggers.
async fn settle(handle: &SessionHandle) {
    tokio::time::sleep(RANGE_DEBOUNCE + Duration::from_millis(50)).await;
    let mut rx = handle.subscribe();
    let idle = rx.wait_for(|s| !s.loading);
    if tokio::time::timeout(Duration::from_secs(30), idle).await.is_err() {
        tracing::warn!("gave up waiting for the last fetch");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let args = Cli::parse();
    let kind = ListingKind::from_segment(&args.kind)
        .ok_or_else(|| anyhow!("unknown listing kind `{}` (expected properties or creators)", args.kind))?;
    let api = ApiClient::new(&args.api_base, Duration::from_secs(args.timeout_secs))?;
    tracing::info!(api_base = api.base_url(), kind = kind.segment(), "starting session");

    let handle = spawn_session(kind, ResultPage::default(), Arc::new(api), Arc::new(PrintNavigator));
    handle.send(Command::Navigate(args.query.clone())).await?;
    eprintln!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(Input::Session(cmd))) => handle.send(cmd).await?,
            Ok(Some(Input::Show)) => print_snapshot(&handle.snapshot()),
            Ok(Some(Input::Quit)) => break,
            Err(e) => eprintln!("{e}; {HELP}"),
        }
    }

    settle(&handle).await;
    print_snapshot(&handle.snapshot());
    handle.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_commands() {
        assert_eq!(
            parse_line("toggle city New Delhi").unwrap(),
            Some(Input::Session(Command::Toggle { field: "city".into(), value: "New Delhi".into() }))
        );
        assert_eq!(
            parse_line("range priceMin 5000000 200000").unwrap(),
            Some(Input::Session(Command::SetRange { field: "priceMin".into(), bounds: Bounds::new(200_000, 5_000_000) }))
        );
        assert_eq!(parse_line(" page 3 ").unwrap(), Some(Input::Session(Command::SetPage(3))));
        assert_eq!(parse_line("limit 24").unwrap(), Some(Input::Session(Command::SetLimit(24))));
        assert_eq!(parse_line("clear").unwrap(), Some(Input::Session(Command::ClearAll)));
        assert_eq!(
            parse_line("go propertyType=PLOT").unwrap(),
            Some(Input::Session(Command::Navigate("propertyType=PLOT".into())))
        );
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# warm up").unwrap(), None);
        assert_eq!(parse_line("quit").unwrap(), Some(Input::Quit));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_line("toggle city").is_err());
        assert!(parse_line("range priceMin abc 10").is_err());
        assert!(parse_line("page -2").is_err());
        assert!(parse_line("fly away").is_err());
    }
}

//! # Feed Test Utility
//!
//! Fetches one feed the way the poller does and prints what it found.
//!
//! ## Usage
//!
//! ```
//! cargo run --bin test_rss_feed -- https://example.com/feed.xml
//! cargo run --bin test_rss_feed -- https://example.com/feed.xml --since 2025-01-01T00:00:00Z
//! cargo run --bin test_rss_feed -- https://example.com/feed.xml --json
//! ```

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use colored::Colorize;
use std::process;

use feedwatch::environment::Config;
use feedwatch::fetch::{FetchClient, ReqwestTransport};
use feedwatch::logging::{self, ConsoleOutput};
use feedwatch::rss::{self, FeedStatus, TestRssFeedResult};

#[derive(Parser, Debug)]
#[clap(about = "Fetch a feed and print detailed diagnostics")]
struct Args {
    /// Feed URL to test
    url: String,

    /// Send If-Modified-Since with this RFC 3339 date
    #[clap(long)]
    since: Option<String>,

    /// Print the result as JSON
    #[clap(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::configure_logging_to(console_output(args.json));

    let since = match args.since.as_deref() {
        Some(value) => Some(
            DateTime::parse_from_rfc3339(value)
                .map_err(|e| anyhow!("Invalid --since date {:?}: {}", value, e))?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    let config = Config::from_env()?;
    let transport = ReqwestTransport::new(&config.transport)
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;
    let client = FetchClient::new(transport);

    if !args.json {
        println!("Testing feed: {}", args.url);
    }

    match rss::test_rss_feed(&client, &args.url, since, &config.policy).await {
        Ok(result) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_report(&result);
            }

            if result.status.is_success() {
                process::exit(0);
            }
            if !args.json {
                eprintln!("Feed test completed with errors: {:?}", result.status);
            }
            process::exit(1);
        }
        Err(err) => {
            eprintln!("Failed to test feed: {}", err);
            process::exit(2);
        }
    }
}

/// JSON goes to stdout, so logs move to stderr.
fn console_output(json: bool) -> ConsoleOutput {
    if json {
        ConsoleOutput::Stderr
    } else {
        ConsoleOutput::Stdout
    }
}

fn print_report(result: &TestRssFeedResult) {
    println!("\n{}", "═".repeat(100).bright_blue());
    println!("{}  {}", "FEED DIAGNOSTICS".bright_blue(), result.url.bright_yellow());
    println!("{}", "═".repeat(100).bright_blue());

    let status_str = format!("{:?}", result.status);
    let colored_status = match result.status {
        FeedStatus::Updated | FeedStatus::NotModified => status_str.bright_green(),
        FeedStatus::RequestFailed | FeedStatus::InvalidUrl => status_str.bright_red(),
        _ => status_str.bright_yellow(),
    };
    println!("{}: {}", "Status".bright_blue(), colored_status);

    match result.status_code {
        Some(code) => println!("{}: {}", "HTTP Status".bright_blue(), code),
        None => println!("{}: {}", "HTTP Status".bright_blue(), "None".dimmed()),
    }
    if let Some(ref final_url) = result.final_url {
        println!("{}: {}", "Final URL".bright_blue(), final_url);
    }
    if let Some(duration) = result.duration_secs {
        println!("{}: {:.3}s", "Duration".bright_blue(), duration);
    }
    match result.content_type {
        Some(ref content_type) => println!("{}: {}", "Content-Type".bright_blue(), content_type),
        None => println!("{}: {}", "Content-Type".bright_blue(), "None".dimmed()),
    }

    if !result.headers.is_empty() {
        println!("\n{}", "HTTP Headers".bright_blue());
        println!("{}", "─".repeat(80).dimmed());
        for (name, value) in &result.headers {
            println!("{}: {}", name.bright_magenta(), value);
        }
    }

    println!("{}: {}", "Entries Found".bright_blue(), result.entries_found);

    if let Some(ref stats) = result.interval_stats {
        println!("\n{}", "Publication Intervals (seconds)".bright_blue());
        println!("{}", "─".repeat(80).dimmed());
        println!("intervals: {}", stats.intervals);
        println!("min: {}  max: {}", stats.min_interval, stats.max_interval);
        println!("average: {}  median: {}", stats.average_interval, stats.median_interval);
        let newest = DateTime::from_timestamp(stats.newest_item_date, 0)
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| stats.newest_item_date.to_string());
        println!("newest item: {}", newest);
        if stats.sleepy {
            println!("{}", "Feed is sleepy".bright_yellow());
        }
    }
    if let Some(next_update) = result.next_update {
        println!("{}: {}", "Next Update".bright_blue(), next_update.to_rfc3339().bright_green());
    }

    if let Some(ref raw_preview) = result.raw_preview {
        println!("\n{}", "Raw Content Preview (hex)".bright_blue());
        println!("{}", "─".repeat(80).dimmed());
        for chunk in raw_preview.chunks(16) {
            let ascii: String = chunk
                .iter()
                .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
                .collect();
            let hex = format!("{:<47}", rss::hex_preview(chunk, 16));
            println!("{}  {}", hex.dimmed(), ascii.bright_white());
        }
    }

    if let Some(ref decoded) = result.decoded_preview {
        println!("\n{}", "Decoded Content Preview".bright_blue());
        println!("{}", "─".repeat(80).dimmed());
        println!("{}", decoded);
    }

    if !result.warnings.is_empty() {
        println!("\n{}", "Warnings".bright_yellow());
        println!("{}", "─".repeat(80).dimmed());
        for (i, warning) in result.warnings.iter().enumerate() {
            println!("{}. {}", i + 1, warning);
        }
    }

    if !result.errors.is_empty() {
        println!("\n{}", "Errors".bright_red());
        println!("{}", "─".repeat(80).dimmed());
        for (i, error) in result.errors.iter().enumerate() {
            println!("{}. {}", i + 1, error.bright_red());
        }
    }

    if !result.entries.is_empty() {
        println!("\n{}", "Feed Entries".bright_green());
        println!("{}", "─".repeat(80).dimmed());

        // Limit to 5 entries to avoid overwhelming output
        for (i, entry) in result.entries.iter().take(5).enumerate() {
            let title = entry.title.as_deref().unwrap_or("[No Title]");
            let url = entry.url.as_deref().unwrap_or("[No URL]");
            let pub_date = entry.pub_date.as_deref().unwrap_or("[No Date]");
            println!(
                "{}. {} ({})\n   {}",
                i + 1,
                title.bright_white(),
                pub_date.dimmed(),
                url.bright_cyan()
            );
        }
        if result.entries.len() > 5 {
            println!("... and {} more entries", result.entries.len() - 5);
        }
    }

    println!("\n{}", "═".repeat(100).bright_blue());
    if result.status.is_success() {
        println!("Feed test completed successfully with {} entries found", result.entries_found);
    }
}

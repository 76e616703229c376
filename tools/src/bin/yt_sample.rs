//! yt-sample: authorize against the YouTube Data API and print one response.
//!
//! The secrets path may also come from a `.env` file in the working
//! directory.
//!
//! Usage:
//!   YOUTUBE_CLIENT_SECRET_FILE=client_secret.json yt-sample search
//!   yt-sample --client-secrets client_secret.json popular --region BR
//!   yt-sample channels --id UC_x5XG1OV2P6uZZ5FSM9Ttw

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use youtube_sample::{
    client::YouTubeClient,
    oauth::{InstalledAppFlow, YOUTUBE_READONLY},
    request::{ChannelsList, SearchList, VideosList},
};

#[derive(Parser, Debug)]
#[command(name = "yt-sample", version, about = "Sample YouTube Data API v3 requests")]
struct Args {
    /// OAuth client-secrets JSON downloaded from the cloud console.
    #[arg(long, env = "YOUTUBE_CLIENT_SECRET_FILE")]
    client_secrets: PathBuf,

    /// Loopback port for the OAuth redirect (0 picks a free one).
    #[arg(long, default_value_t = 0)]
    port: u16,

    #[command(subcommand)]
    request: RequestCmd,
}

#[derive(Subcommand, Debug)]
enum RequestCmd {
    /// Channel information and statistics.
    Channels {
        /// Channel id; the authorized user's channel when omitted.
        #[arg(long)]
        id: Option<String>,
    },
    /// Most popular videos in a region.
    Popular {
        #[arg(long, default_value = "BR")]
        region: String,
        #[arg(long, default_value_t = 10)]
        max: u32,
    },
    /// Search videos published within a date window, ordered.
    Search {
        /// Free-text query.
        #[arg(long)]
        q: Option<String>,
        #[arg(long, default_value = "BR")]
        region: String,
        #[arg(long, default_value = "viewCount")]
        order: String,
        #[arg(long, default_value_t = 10)]
        max: u32,
        /// Start of the window (YYYY-MM-DD, UTC midnight).
        #[arg(long, default_value = "2023-03-01", value_parser = parse_day)]
        after: DateTime<Utc>,
        /// End of the window (YYYY-MM-DD, UTC midnight).
        #[arg(long, default_value = "2023-03-15", value_parser = parse_day)]
        before: DateTime<Utc>,
    },
}

fn parse_day(s: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
        .and_then(|d| d.and_hms_opt(0, 0, 0).ok_or_else(|| "invalid time".to_string()))
        .map(|dt| dt.and_utc())
}

fn main() -> Result<()> {
    env_logger::init();
    // Values already in the environment win over `.env`.
    if let Err(e) = dotenvy::dotenv() {
        log::debug!("yt-sample: no .env loaded: {e}");
    }
    let args = Args::parse();

    println!("{}", args.client_secrets.display());

    let flow = InstalledAppFlow::from_client_secrets_file(&args.client_secrets, &[YOUTUBE_READONLY])
        .with_context(|| format!("loading {}", args.client_secrets.display()))?;
    let credentials = flow.run_local_server(args.port, |url| {
        eprintln!("Please visit this URL to authorize this application: {url}");
    })?;
    let youtube = YouTubeClient::new(credentials);
    log::debug!("yt-sample: request={:?}", args.request);

    let response = match args.request {
        RequestCmd::Channels { id } => {
            let request = match id {
                Some(id) => ChannelsList::by_id(id),
                None => ChannelsList::mine(),
            };
            youtube.execute(&request)?
        }
        RequestCmd::Popular { region, max } => {
            youtube.execute(&VideosList::most_popular(region).max_results(max))?
        }
        RequestCmd::Search { q, region, order, max, after, before } => {
            let mut request = SearchList::default()
                .region(region)
                .order(order)
                .max_results(max)
                .published_between(after, before);
            if let Some(q) = q {
                request = request.query_text(q);
            }
            youtube.execute(&request)?
        }
    };

    println!();
    println!("{}", serde_json::to_string_pretty(&response)?);
    println!();
    Ok(())
}

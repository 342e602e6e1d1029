use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio_util::sync::CancellationToken;

use dlmeter_core::interceptor::client::ProgressClient;
use dlmeter_core::progress::throttle::ThrottlePolicy;

mod terminal_listener;
use terminal_listener::TerminalProgressListener;

#[derive(Parser)]
#[command(name = "dlmeter", about = "HTTP downloads with live progress metering")]
struct Args {
    /// URLs to download
    #[arg(required = true)]
    urls: Vec<String>,

    /// Directory to save files into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Minimum milliseconds between progress reports per download
    #[arg(short, long)]
    throttle_ms: Option<u64>,
}

/// Output name from the URL's final path segment.
fn file_name_for(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|base| base.rsplit('/').next())
        .filter(|name| !name.is_empty() && !name.contains(':'))
        .map(str::to_string)
        .unwrap_or_else(|| "download.bin".to_string())
}

/// Make `name` unique among `taken`, appending a counter when needed.
fn unique_name(name: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}-{}", name, n);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let throttle = match args.throttle_ms {
        Some(ms) => ThrottlePolicy::Interval(Duration::from_millis(ms)),
        None => ThrottlePolicy::EveryChunk,
    };

    if let Err(e) = tokio::fs::create_dir_all(&args.output_dir).await {
        eprintln!("Cannot create {}: {}", args.output_dir.display(), e);
        std::process::exit(1);
    }

    let listener = Arc::new(TerminalProgressListener::new());
    let client = Arc::new(
        ProgressClient::builder(listener.clone())
            .throttle(throttle)
            .build(),
    );

    // Ctrl-C cancels every in-flight transfer.
    let cancel_token = CancellationToken::new();
    {
        let cancel_token = cancel_token.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            cancel_token.cancel();
        });
    }

    let start = Instant::now();
    let mut taken = HashSet::new();
    let mut handles = Vec::with_capacity(args.urls.len());

    for url in args.urls {
        let download_id = unique_name(file_name_for(&url), &mut taken);
        let target = args.output_dir.join(&download_id);
        let client = Arc::clone(&client);
        let listener = Arc::clone(&listener);
        let cancel_token = cancel_token.clone();

        handles.push(tokio::spawn(async move {
            let response = match client.download_with_id(&url, &download_id).await {
                Ok(response) => response,
                Err(e) => {
                    listener.fail(&download_id, &e.to_string());
                    return false;
                }
            };
            if !response.status().is_success() {
                listener.fail(&download_id, &format!("HTTP {}", response.status()));
                return false;
            }
            match response.save_to(&target, cancel_token).await {
                Ok(_) => true,
                Err(e) => {
                    listener.fail(&download_id, &e.to_string());
                    false
                }
            }
        }));
    }

    let results = futures::future::join_all(handles).await;
    let failed = results
        .iter()
        .filter(|r| !matches!(r, Ok(true)))
        .count();

    let elapsed = start.elapsed();
    if failed == 0 {
        println!("All downloads completed in {:.2}s", elapsed.as_secs_f64());
    } else {
        eprintln!("{} download(s) failed", failed);
        std::process::exit(1);
    }
}

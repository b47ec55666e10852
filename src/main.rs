mod api;
mod constants;
mod data_structures;
mod errors;
mod logging;
mod render;
mod utils;

use crate::api::ApiClient;
use crate::constants::*;
use crate::data_structures::build_participant_map;
use crate::errors::{AppError, AppResult};
use crate::logging::{log, setup_logging, LogLevel};
use crate::render::render_document;
use crate::utils::{export_filename, save_text};

use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about = "Exports a Canvas discussion thread to a formatted text file with per-user statistics.", arg_required_else_help = true)]
struct CliArgs {
    /// Canvas instance, e.g. https://school.instructure.com
    #[arg(short, long, name = "URL")]
    base_url: String,

    /// Course id (the number after /courses/ in the page URL)
    #[arg(short, long)]
    course: i64,

    /// Discussion topic id (the number after /discussion_topics/)
    #[arg(short, long)]
    topic: i64,

    /// API access token; omit for anonymous/public instances
    #[arg(long, env = "CANVAS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory the export file is written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

fn validate_args(args: &CliArgs) -> AppResult<()> {
    if !args.base_url.starts_with("http://") && !args.base_url.starts_with("https://") {
        return Err(AppError::Argument(format!(
            "Base URL must start with http:// or https://, got '{}'",
            args.base_url
        )));
    }

    if args.course <= 0 || args.topic <= 0 {
        return Err(AppError::Argument(
            "Course and topic ids must be positive.".into(),
        ));
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    let exit_code = match main_async().await {
        Ok(code) => code,
        Err(e) => {
            log(LogLevel::Error, &format!("FATAL ERROR: {:?}", e));
            1
        }
    };
    if exit_code == 0 {
        Ok(())
    } else {
        Err(())
    }
}

async fn main_async() -> AppResult<i32> {
    setup_logging();
    let args = CliArgs::parse();
    validate_args(&args)?;
    let start_time = Instant::now();

    let client = ApiClient::new(&args.base_url, args.token.clone())?;
    log(
        LogLevel::Step,
        &format!(
            "Fetching discussion {} (course {}) from {}",
            args.topic,
            args.course,
            client.base_url()
        ),
    );

    let topic = client.fetch_topic(args.course, args.topic).await?;
    let title = topic
        .title
        .unwrap_or_else(|| format!("discussion_{}", args.topic));
    let url = topic.html_url.unwrap_or_else(|| {
        format!(
            "{}/courses/{}/discussion_topics/{}",
            client.base_url(),
            args.course,
            args.topic
        )
    });
    log(LogLevel::Info, &format!("Topic: '{}'", title));

    let view = client.fetch_view(args.course, args.topic).await?;
    log(
        LogLevel::Info,
        &format!(
            "Received {} top-level posts, {} participants.",
            view.view.len(),
            view.participants.len()
        ),
    );
    if view.view.is_empty() {
        log(LogLevel::Warning, "Discussion has no posts.");
    }

    log(LogLevel::Step, "Rendering export...");
    let participants = build_participant_map(&view.participants);
    let (content, stats) = render_document(&title, &url, &view.view, &participants);

    let fpath = args.out_dir.join(export_filename(&title));
    log(LogLevel::Step, &format!("Writing '{}'...", fpath.display()));
    if !save_text(&fpath, &content).await? {
        return Ok(1);
    }

    let sep = "=".repeat(SECTION_RULE_WIDTH);
    println!("\n{}\n{:^60}\n{}", sep, "Export Summary", sep);
    println!("Topic:        {}", title);
    println!("Posts:        {}", stats.total_posts());
    println!("Participants: {}", stats.len());
    println!("Total words:  {}", stats.total_words());
    println!("Output file:  {}", fpath.display());
    println!("Run time:     {:.3?}", start_time.elapsed());
    println!("{}", sep);

    log(LogLevel::Success, "Export complete.");
    Ok(0)
}

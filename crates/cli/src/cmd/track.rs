//! Track file changes and send them for analysis

use anyhow::{Context, Result};
use bv_core::{ProjectLayout, TrackOverrides, TrackSettings};
use cli_lib::util::format_interval;
use cli_lib::{run_once, TrackSession};
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub async fn run(path: Option<PathBuf>, mut overrides: TrackOverrides, one_shot: bool) -> Result<()> {
    // 1. Find project root
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    // --ignore-file is relative to where the command runs, not the root
    overrides.ignore_file = overrides.ignore_file.map(|file| cwd.join(file));
    let start = match path {
        Some(path) => cwd.join(path),
        None => cwd,
    };
    let layout = ProjectLayout::discover(&start);

    // 2. Load configuration (fails before anything starts)
    let settings =
        TrackSettings::resolve(layout, overrides).context("Failed to load project configuration")?;

    print_banner(&settings, one_shot);

    if one_shot {
        return run_one_shot(&settings).await;
    }

    // 3. Track until interrupted
    let session = TrackSession::start(settings).await?;
    println!("{}", "Watching for changes. Press Ctrl+C to stop.".dimmed());
    println!();

    let stats = session.run_until_ctrl_c().await?;

    println!();
    println!("{}", "Tracking stopped".bold());
    println!("  Events:   {}", stats.events);
    println!("  Batches:  {}", stats.flushes);
    if stats.dropped_on_shutdown > 0 {
        println!(
            "  {}",
            format!(
                "{} pending change(s) were not analyzed",
                stats.dropped_on_shutdown
            )
            .yellow()
        );
    }

    Ok(())
}

async fn run_one_shot(settings: &TrackSettings) -> Result<()> {
    match run_once(settings).await? {
        None => println!("{}", "No changes to analyze".dimmed()),
        Some(report) => {
            println!("{}", "Analysis complete".bold());
            println!("  Files sent:    {}", report.sent);
            println!("  Succeeded:     {}", report.succeeded.to_string().green());
            if report.failed > 0 {
                println!("  Failed:        {}", report.failed.to_string().red());
            }
            println!("  Skipped:       {}", report.skipped);
            if !report.topics.is_empty() {
                println!("  Topics:");
                for topic in &report.topics {
                    println!("    - {}", topic.title.cyan());
                }
            }
        }
    }
    Ok(())
}

fn print_banner(settings: &TrackSettings, one_shot: bool) {
    let project = &settings.project;

    println!("{}", "BrainVibe Tracker".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "Project:       {} ({})",
        project.display_name().cyan(),
        project.project_id
    );
    println!(
        "Directory:     {}",
        settings.layout.root().display().to_string().cyan()
    );
    println!("API:           {}", project.api_url);
    if one_shot {
        println!("Mode:          {}", "one-shot".yellow());
    } else {
        println!(
            "Intervals:     debounce {}, ceiling {}",
            format_interval(settings.debounce),
            format_interval(settings.ceiling)
        );
    }
    if let Some(file) = &settings.ignore.file {
        println!("Ignore file:   {}", file.display());
    }
    println!();
}

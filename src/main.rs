// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod archive;
mod document;
mod error;
mod repair;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;

use crate::document::{clean_conversation, scan_conversation};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Repair mojibake in a Messenger JSON conversation export",
    long_about = "Repair UTF-8 text that was decoded as Latin-1/Windows-1252 (\"Ã©\" instead of \"é\") in a Messenger conversation export. The title, participant names, message bodies, sender names and reaction actors are fixed; the result is written to a new file and the original is left untouched."
)]
struct Args {
    /// Conversation export to repair
    #[arg(default_value = archive::DEFAULT_INPUT, help = "Messenger JSON export to read")]
    input: PathBuf,

    /// Output file path (defaults to <input stem>_clean.json next to the input)
    #[arg(long, short, help = "Output file path (defaults to <stem>_clean.json next to the input)")]
    output: Option<PathBuf>,

    /// Only report encoding problems, write nothing
    #[arg(long, help = "Scan for encoding problems without writing an output file")]
    check: bool,

    /// Number of before/after samples to print
    #[arg(long, default_value_t = 3, help = "Number of repaired message samples to print")]
    samples: usize,

    /// Hide the progress bar
    #[arg(long, short, help = "Hide the progress bar")]
    quiet: bool,

    /// Log at debug level
    #[arg(long, short, help = "Enable debug logging (RUST_LOG takes precedence)")]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn progress_bar(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(0);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("#>-"));
    Ok(pb)
}

fn run(args: &Args) -> Result<()> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| archive::default_output_path(&args.input));

    println!("Reading {}...", args.input.display());
    let mut doc = archive::load(&args.input).context("Failed to load conversation")?;

    let before = scan_conversation(&doc);
    println!("{} messages found", before.messages);

    if before.messages > 0 {
        let share = before.affected_messages as f64 * 100.0 / before.messages as f64;
        println!(
            "{} encoding problems in {} messages ({:.1}%)",
            before.problems, before.affected_messages, share
        );
    } else {
        println!("{} encoding problems", before.problems);
    }

    if args.check {
        info!("Check only, nothing written");
        return Ok(());
    }

    archive::ensure_distinct(&args.input, &output)?;

    let pb = progress_bar(args.quiet)?;
    let report = clean_conversation(&mut doc, args.samples, &pb)
        .context("Failed to repair conversation")?;
    pb.finish_and_clear();

    let after = scan_conversation(&doc);
    println!("{} messages cleaned", report.messages_cleaned);
    println!(
        "Problems fixed: {}, remaining: {}",
        before.problems.saturating_sub(after.problems),
        after.problems
    );
    info!(
        "Title changed: {}, participants renamed: {}/{}, senders renamed: {}, reaction actors renamed: {}",
        report.title_changed,
        report.participants_renamed,
        report.participants,
        report.senders_renamed,
        report.actors_renamed
    );

    for (i, sample) in report.samples.iter().enumerate() {
        println!();
        println!("Sample {}:", i + 1);
        println!("  Before: \"{}\"", sample.before);
        println!("  After:  \"{}\"", sample.after);
    }

    println!();
    println!("Saving to {}...", output.display());
    archive::save(&output, &doc).context("Failed to save repaired conversation")?;

    println!("Done.");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(&args)
}

mod commands;
mod logging;
mod progress;
mod report;

use std::io::{self, BufRead, Write};
use std::process;

use anyhow::{bail, Context, Result};
use chapter_merge_core::config::{self, AppConfig};
use chapter_merge_core::{CancelFlag, MergeEngine, RunReport, Selection};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, MergeArgs, ScanArgs};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info, warn};

const EXIT_OK: i32 = 0;
const EXIT_INCOMPLETE: i32 = 1;
const EXIT_FATAL: i32 = 2;

fn main() {
    dotenv().ok();

    let guard = logging::init_logger();
    let args = Cli::parse();

    let code = match run(args) {
        Ok(code) => code,
        Err(err) => {
            error!("Error: {:#}", err);
            EXIT_FATAL
        }
    };

    // Flush the file log before exiting.
    drop(guard);
    process::exit(code);
}

fn run(args: Cli) -> Result<i32> {
    let Some(command) = args.command else {
        Cli::command().print_long_help()?;
        return Ok(EXIT_OK);
    };

    let config = config::load_configuration(args.config.as_deref())
        .context("Error loading configuration")?;

    match command {
        Commands::Merge(merge_args) => run_merge(config, merge_args),
        Commands::Scan(scan_args) => run_scan(config, scan_args),
        Commands::PrintConfig => {
            println!("Configuration: {:#?}", config);
            Ok(EXIT_OK)
        }
    }
}

fn run_scan(mut config: AppConfig, args: ScanArgs) -> Result<i32> {
    if let Some(pattern) = args.pattern {
        config.filename_pattern = pattern;
    }

    let engine = MergeEngine::new(config);
    let outcome = engine.scan(&args.source, &CliReporter::new())?;
    report::print_scan_report(&outcome, args.report);
    Ok(EXIT_OK)
}

fn apply_overrides(config: &mut AppConfig, args: &MergeArgs) {
    if let Some(output) = &args.output {
        config.output_directory = output.clone();
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(pattern) = &args.pattern {
        config.filename_pattern = pattern.clone();
    }
    if let Some(jobs) = args.jobs {
        config.parallelism = jobs;
    }
    if let Some(timeout) = args.timeout {
        config.per_merge_timeout_seconds = Some(timeout);
    }
    if args.force {
        config.overwrite = true;
    }
}

fn run_merge(mut config: AppConfig, args: MergeArgs) -> Result<i32> {
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    let cancel = CancelFlag::new();
    let engine = MergeEngine::new(config).with_cancel_flag(cancel.clone());
    let reporter = CliReporter::new();
    let outcome = engine.scan(&args.source, &reporter)?;
    report::print_scan_report(&outcome, args.report);

    let candidates = outcome.candidates().count();
    if candidates == 0 {
        info!("No chaptered sessions to merge in {}", args.source.display());
        // Ambiguous sessions still need a human.
        return Ok(if outcome.ambiguous().next().is_some() {
            EXIT_INCOMPLETE
        } else {
            EXIT_OK
        });
    }

    if !args.yes && !console::user_attended() {
        bail!("Not attached to a terminal, pass --yes to merge without confirmation");
    }

    let selection = if args.yes {
        Selection::from_keys(args.select)
    } else if !args.select.is_empty() {
        let prompt = format!(
            "Merge the selected sessions into {}?",
            engine.config().output_directory.display()
        );
        if !prompt_confirm(&prompt, Some(true))? {
            println!("Aborting, nothing merged");
            return Ok(EXIT_OK);
        }
        Selection::from_keys(args.select)
    } else {
        match prompt_selection()? {
            Some(selection) => selection,
            None => {
                println!("Aborting, nothing merged");
                return Ok(EXIT_OK);
            }
        }
    };

    // Ctrl-C at the prompts must still exit the process.
    install_cancel_handler(cancel);
    let report = engine.merge(outcome, &selection, &reporter)?;
    report::print_run_summary(&report);

    Ok(exit_code(&report))
}

fn exit_code(report: &RunReport) -> i32 {
    if report.fully_merged() {
        EXIT_OK
    } else {
        EXIT_INCOMPLETE
    }
}

fn install_cancel_handler(cancel: CancelFlag) {
    let result = ctrlc::set_handler(move || {
        if !cancel.is_cancelled() {
            eprintln!(
                "{}",
                "Cancelling, waiting for running merges to stop...".yellow()
            );
        }
        cancel.cancel();
    });
    if let Err(err) = result {
        warn!("Could not install Ctrl-C handler: {}", err);
    }
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            // EOF, nobody to ask
            return Ok(false);
        }

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}

/// Ask which sessions to merge. `None` means abort.
fn prompt_selection() -> io::Result<Option<Selection>> {
    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        input.clear();
        println!();
        println!(
            "Input (a)bort to exit without action. {}",
            "Input space-separated session keys to merge, or 'all' for every session."
                .bold()
                .green()
        );
        io::stdout().flush()?;

        if stdin.lock().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        if let Some(choice) = parse_selection_input(&input) {
            return Ok(choice);
        }
    }
}

/// `Some(None)` aborts, `None` asks again.
fn parse_selection_input(input: &str) -> Option<Option<Selection>> {
    let words: Vec<&str> = input.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }
    if words.iter().any(|w| *w == "a" || *w == "abort") {
        if words.len() > 1 {
            warn!("Abort requested along with other input, ignoring {:?}", words);
        }
        return Some(None);
    }
    if words.contains(&"all") {
        if words.len() > 1 {
            warn!("'all' requested along with other input, ignoring {:?}", words);
        }
        return Some(Some(Selection::All));
    }
    Some(Some(Selection::from_keys(words)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_selection_input() {
        assert_eq!(parse_selection_input("  \n"), None);
        assert_eq!(parse_selection_input("a\n"), Some(None));
        assert_eq!(parse_selection_input("0042 abort\n"), Some(None));
        assert_eq!(parse_selection_input("all 0042\n"), Some(Some(Selection::All)));
        assert_eq!(
            parse_selection_input("0042 0043\n"),
            Some(Some(Selection::from_keys(["0042", "0043"])))
        );
    }

    #[test]
    fn test_overrides_win_over_config() {
        let mut config = AppConfig::default();
        let args = MergeArgs {
            source: PathBuf::from("."),
            output: Some(PathBuf::from("/tmp/merged")),
            backend: Some(chapter_merge_core::BackendKind::Fallback),
            pattern: Some("gopro".to_string()),
            jobs: Some(3),
            timeout: Some(600),
            force: true,
            yes: true,
            select: Vec::new(),
            report: commands::ReportStyle::Table,
        };

        apply_overrides(&mut config, &args);

        assert_eq!(config.output_directory, PathBuf::from("/tmp/merged"));
        assert_eq!(config.backend, chapter_merge_core::BackendKind::Fallback);
        assert_eq!(config.filename_pattern, "gopro");
        assert_eq!(config.parallelism, 3);
        assert_eq!(config.per_merge_timeout_seconds, Some(600));
        assert!(config.overwrite);
    }

    #[test]
    fn test_exit_code_flags_unmerged_ambiguous_sessions() {
        use chapter_merge_core::Session;
        use std::time::Duration;

        let mut report = RunReport {
            results: Vec::new(),
            ambiguous: Vec::new(),
            complete: Vec::new(),
            deselected: Vec::new(),
            unknown_selection: Vec::new(),
            warnings: Vec::new(),
            duration: Duration::ZERO,
        };
        assert_eq!(exit_code(&report), EXIT_OK);

        report.ambiguous.push(Session {
            key: "DUP".to_string(),
            chapters: Vec::new(),
            ambiguous: true,
            duplicate_indices: Vec::new(),
        });
        assert_eq!(exit_code(&report), EXIT_INCOMPLETE);
    }
}

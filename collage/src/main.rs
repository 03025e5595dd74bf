#![warn(clippy::pedantic)]

pub mod cli;
pub mod global;

use anyhow::Result as AnyResult;

fn main() -> AnyResult<()> {
    let preferences = global::preferences::Preferences::get();
    let level = preferences.level_filter();

    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "collage.log" in the working directory.
    if has_term {
        env_logger::builder().filter_level(level).init();
    } else {
        let _ = simple_logging::log_to_file("collage.log", level);
    }
    if preferences.did_fail_to_load() {
        log::warn!("Preferences weren't available, defaulting.");
    }
    // First run. Leave a file behind for the user to edit.
    if global::preferences::Preferences::path().is_some_and(|path| !path.exists()) {
        if let Err(e) = preferences.save() {
            log::warn!("Failed to save preferences:\n{e:?}");
        }
    }

    // Paths are OSStrings, let the system handle character encoding restrictions.
    let mut args: Vec<std::ffi::OsString> = std::env::args_os().skip(1).collect();
    if args.is_empty() {
        println!("{}", cli::USAGE);
        return Ok(());
    }
    let command = args.remove(0);
    let args = cli::Args::new(args);
    match command.to_str() {
        Some("info") => cli::info(args),
        Some("edit") => cli::edit(args),
        Some("note") => cli::note(args),
        Some("rect") => cli::rect(args),
        Some("new-layer") => cli::new_layer(args),
        Some("import") => cli::import(args),
        Some("export") => cli::export(args),
        _ => {
            anyhow::bail!("unknown command {command:?}\n\n{}", cli::USAGE)
        }
    }
}

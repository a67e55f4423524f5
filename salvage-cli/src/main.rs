//! Command line interface for salvage.
//!
//! Reads a source file, recovers as much of its syntax tree as it can, prints
//! the result and reports whatever could not be parsed.

use clap::Parser;
use salvage_cli::{Args, RunOptions, run_file};

use salvage_lang::log;
use salvage_lang::utils::{error::report, fileloader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if cfg!(debug_assertions) | cfg!(test) {
        colog::default_builder()
            .filter_level(log::LevelFilter::Trace)
            .init();
    } else {
        colog::default_builder().init();
    }

    let args = Args::parse();
    let fullpath = fileloader::get_canonical_path(".", &args.file)?;
    let content = fileloader::load(&fullpath.to_string_lossy())?;
    let options = RunOptions::from_args(&args);
    if let Err(errs) = run_file(options, &content, &fullpath) {
        report(&content, fullpath.clone(), &errs);
        return Err(format!("{} part(s) of {} could not be parsed", errs.len(), args.file).into());
    }
    Ok(())
}

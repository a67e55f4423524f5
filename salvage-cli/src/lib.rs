use std::path::Path;

use salvage_lang::{
    Config, Recovered, log, recover, recovery,
    utils::error::ReportableError,
};

#[derive(clap::Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub mode: Mode,

    /// File name
    #[clap(value_parser)]
    pub file: String,

    /// Nesting depth below which recovered nodes are dropped.
    #[arg(long)]
    pub max_depth: Option<usize>,
}

impl Args {
    pub fn to_config(&self) -> Config {
        let mut recovery = recovery::Config::default();
        if let Some(max_depth) = self.max_depth {
            recovery.max_depth = max_depth;
        }
        Config { recovery }
    }
}

#[derive(clap::Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct Mode {
    /// Print the recovery tree as it stood before it was collapsed, and exit
    #[arg(long, default_value_t = false)]
    pub emit_tree: bool,

    /// Print the recovered syntax tree in debug form and exit
    #[arg(long, default_value_t = false)]
    pub emit_ast: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    EmitTree,
    EmitAst,
    /// Print the recovered source.
    Source,
}

/// Options derived from command line arguments.
#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    pub mode: RunMode,
    pub config: Config,
}

impl RunOptions {
    pub fn from_args(args: &Args) -> Self {
        let mode = if args.mode.emit_tree {
            RunMode::EmitTree
        } else if args.mode.emit_ast {
            RunMode::EmitAst
        } else {
            RunMode::Source
        };
        Self {
            mode,
            config: args.to_config(),
        }
    }
}

/// What gets printed for `recovered` in the given mode.
pub fn render(mode: RunMode, recovered: &Recovered) -> String {
    match mode {
        RunMode::EmitTree => recovered.tree_dump.clone(),
        RunMode::EmitAst => format!("{:#?}", recovered.unit),
        RunMode::Source => recovered.unit.to_string(),
    }
}

/// Recovers a single source file and prints the result. Whatever could not
/// be parsed comes back as errors; the output is printed either way.
pub fn run_file(
    options: RunOptions,
    content: &str,
    fullpath: &Path,
) -> Result<(), Vec<Box<dyn ReportableError>>> {
    log::debug!("Filename: {}", fullpath.display());
    let recovered = recover(content, Some(fullpath.to_path_buf()), options.config);
    println!("{}", render(options.mode, &recovered));
    if recovered.errors.is_empty() {
        Ok(())
    } else {
        Err(recovered.reportable_errors())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn modes_are_exclusive() {
        assert!(Args::try_parse_from(["salvage", "--emit-tree", "--emit-ast", "A.java"]).is_err());
        let args = Args::try_parse_from(["salvage", "--emit-tree", "A.java"]).unwrap();
        assert_eq!(RunOptions::from_args(&args).mode, RunMode::EmitTree);
        let args = Args::try_parse_from(["salvage", "A.java"]).unwrap();
        assert_eq!(RunOptions::from_args(&args).mode, RunMode::Source);
    }

    #[test]
    fn max_depth_reaches_the_recovery_config() {
        let args = Args::try_parse_from(["salvage", "--max-depth", "8", "A.java"]).unwrap();
        assert_eq!(args.to_config().recovery.max_depth, 8);
        let args = Args::try_parse_from(["salvage", "A.java"]).unwrap();
        assert_eq!(
            args.to_config().recovery,
            salvage_lang::recovery::Config::default()
        );
    }

    #[test]
    fn source_mode_prints_the_recovered_unit() {
        let recovered = recover("import a.b; x = 1", None, Config::default());
        assert_eq!(render(RunMode::Source, &recovered), "import a.b;\nx = 1;");
        assert!(render(RunMode::EmitTree, &recovered).starts_with("Recovered unit"));
    }
}

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use ariadne::{ColorGenerator, Config, Label, Report, ReportKind, Source};

use super::metadata::Location;

/// An error that knows where in the source it happened.
pub trait ReportableError: std::error::Error {
    /// Headline of the report.
    fn get_message(&self) -> String {
        self.to_string()
    }
    /// Source locations to underline, each with a short note.
    fn get_labels(&self) -> Vec<(Location, String)>;
}

/// Errors compare by their labels.
impl PartialEq for dyn ReportableError + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.get_labels() == other.get_labels()
    }
}

struct FileCache {
    pub storage: HashMap<PathBuf, ariadne::Source<String>>,
}

impl ariadne::Cache<PathBuf> for FileCache {
    type Storage = String;

    fn fetch(&mut self, id: &PathBuf) -> Result<&Source<Self::Storage>, impl std::fmt::Debug> {
        self.storage
            .get(id)
            .ok_or_else(|| format!("File not found: {}", id.display()))
    }

    fn display<'a>(&self, id: &'a PathBuf) -> Option<impl std::fmt::Display + 'a> {
        Some(id.display())
    }
}

static FILE_BUCKET: LazyLock<Mutex<FileCache>> = LazyLock::new(|| {
    Mutex::new(FileCache {
        storage: HashMap::new(),
    })
});

fn build_report<'a>(
    path: &PathBuf,
    e: &(dyn ReportableError + '_),
    colors: &mut ColorGenerator,
    color: bool,
) -> Option<Report<'a, (PathBuf, std::ops::Range<usize>)>> {
    let rawlabels = e.get_labels();
    let first = rawlabels.first()?;
    let labels = rawlabels
        .iter()
        .map(|(loc, message)| {
            let span = (path.clone(), loc.span.clone());
            Label::new(span)
                .with_message(message)
                .with_color(colors.next())
        })
        .collect::<Vec<_>>();
    let span = (path.clone(), first.0.span.clone());
    let report = Report::build(ReportKind::Error, span)
        .with_config(Config::default().with_color(color))
        .with_message(e.get_message())
        .with_labels(labels)
        .finish();
    Some(report)
}

/// Prints every error to stderr with source excerpts.
pub fn report(src: &str, path: PathBuf, errs: &[Box<dyn ReportableError + '_>]) {
    let mut colors = ColorGenerator::new();
    for e in errs {
        let Some(builder) = build_report(&path, e.as_ref(), &mut colors, true) else {
            log::error!("{}", e.get_message());
            continue;
        };
        if let Ok(mut cache) = FILE_BUCKET.lock() {
            let cache: &mut FileCache = &mut cache;
            cache
                .storage
                .insert(path.clone(), Source::from(src.to_string()));
            if let Err(e) = builder.eprint(cache) {
                log::error!("failed to print diagnostic: {e}");
            }
        }
    }
}

/// Renders every error as plain, uncolored text. Used by tests and by callers
/// that want to forward diagnostics somewhere other than stderr.
pub fn render_to_string(src: &str, path: PathBuf, errs: &[Box<dyn ReportableError + '_>]) -> String {
    let mut colors = ColorGenerator::new();
    let mut cache = FileCache {
        storage: HashMap::from([(path.clone(), Source::from(src.to_string()))]),
    };
    let mut buf = Vec::<u8>::new();
    for e in errs {
        match build_report(&path, e.as_ref(), &mut colors, false) {
            Some(builder) => {
                if let Err(e) = builder.write(&mut cache, &mut buf) {
                    log::error!("failed to render diagnostic: {e}");
                }
            }
            None => {
                buf.extend_from_slice(e.get_message().as_bytes());
                buf.push(b'\n');
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn dump_to_string(errs: &[Box<dyn ReportableError + '_>]) -> String {
    let mut res = String::new();
    for e in errs {
        res += e.get_message().as_str();
    }
    res
}

use std::{env, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),
    #[error("File {path} not found: {message}", path = path.display())]
    FileNotFound { message: String, path: PathBuf },
    #[error("Failed to convert into UTF: {0}")]
    UtfConversionError(#[from] std::string::FromUtf8Error),
}

pub fn get_canonical_path(current_file_or_dir: &str, relpath: &str) -> Result<PathBuf, Error> {
    let parent_dir = get_parent_dir(current_file_or_dir)?;
    let abspath = [parent_dir, PathBuf::from(relpath)]
        .into_iter()
        .collect::<PathBuf>();
    abspath.canonicalize().map_err(|e| Error::FileNotFound {
        message: e.to_string(),
        path: abspath,
    })
}

fn get_parent_dir(current_file: &str) -> Result<PathBuf, Error> {
    let current_filepath = std::path::Path::new(current_file);
    if current_filepath.is_dir() {
        Ok(current_filepath.into())
    } else {
        let cwd = env::current_dir()?;
        Ok(current_filepath.parent().map_or_else(|| cwd, PathBuf::from))
    }
}

pub fn load(canonical_path: &str) -> Result<String, Error> {
    let content = std::fs::read(canonical_path).map_err(|e| Error::FileNotFound {
        message: e.to_string(),
        path: PathBuf::from(canonical_path),
    })?;
    log::debug!("loaded {} bytes from {canonical_path}", content.len());
    let content_r = String::from_utf8(content).map_err(Error::from)?;
    Ok(content_r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = load("/definitely/not/here.java").expect_err("should be an error");
        match err {
            Error::FileNotFound { path, .. } => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.java"))
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn non_utf8_content_is_rejected() {
        let path = env::temp_dir().join("salvage_fileloader_non_utf8.java");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = load(&path.to_string_lossy()).expect_err("should be an error");
        assert!(matches!(err, Error::UtfConversionError(_)));
        let _ = std::fs::remove_file(path);
    }
}

//! Zip packaging and upload filename sanitising.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::MorpherError;

fn packaging_error(path: &Path, err: impl std::fmt::Display) -> MorpherError {
    MorpherError::Packaging(format!("{}: {err}", path.display()))
}

/// Zips the regular files directly inside `src` into `dest`, by bare filename.
///
/// Subdirectories are skipped. Returns the number of entries written.
pub fn zip_directory(src: &Path, dest: &Path) -> Result<usize, MorpherError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(src)
        .map_err(|err| packaging_error(src, err))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let out = File::create(dest).map_err(|err| packaging_error(dest, err))?;
    let mut writer = ZipWriter::new(BufWriter::new(out));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let Some(name) = path.file_name().map(|name| name.to_string_lossy().to_string()) else {
            continue;
        };
        writer.start_file(name, options)?;
        let mut input = File::open(path).map_err(|err| packaging_error(path, err))?;
        std::io::copy(&mut input, &mut writer).map_err(|err| packaging_error(path, err))?;
    }
    writer
        .finish()?
        .flush()
        .map_err(|err| packaging_error(dest, err))?;

    debug!("Packed {} files into {}", files.len(), dest.display());
    Ok(files.len())
}

/// Reduces an uploaded filename to something safe to join onto a path.
///
/// Non-ASCII is dropped, path separators become spaces, whitespace runs become
/// `_`, anything outside `[A-Za-z0-9_.-]` goes, then leading and trailing `.`
/// and `_` are trimmed. The result can be empty.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// The extension of `name`, lowercased, when it's one we accept.
pub fn allowed_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    crate::constants::ALLOWED_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(ext)
}

/// Rejects uploads whose extension isn't in the allow list.
pub fn check_upload_name(name: &str) -> Result<String, MorpherError> {
    allowed_extension(name).ok_or_else(|| MorpherError::UnsupportedUpload(name.to_string()))
}

/// `<brand>_<product>_creatives.zip` with spaces replaced by underscores.
pub fn download_name(brand: &str, product: &str) -> String {
    format!("{brand}_{product}_creatives.zip").replace(' ', "_")
}

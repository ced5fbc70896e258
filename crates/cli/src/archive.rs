use repowiki_pipeline::{PipelineError, Result};
use repowiki_protocol::FileRecord;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Entries above this size are skipped; they are never useful synopsis input.
const MAX_ENTRY_BYTES: u64 = 1024 * 1024;

/// Decodes a repository archive into text files.
///
/// GitHub zipballs wrap everything in one `<owner>-<repo>-<sha>/` directory;
/// that first path component is stripped. Directories, oversized entries
/// and anything that is not UTF-8 text are skipped. Archive order is kept.
pub fn text_entries(bytes: Vec<u8>) -> Result<Vec<FileRecord>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(invalid_archive)?;
    let mut files = Vec::with_capacity(archive.len());
    let mut skipped = 0usize;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(invalid_archive)?;
        if entry.is_dir() {
            continue;
        }

        let Some(path) = strip_root(entry.name()) else {
            continue;
        };
        if entry.size() > MAX_ENTRY_BYTES {
            log::debug!("Skipping large archive entry {path} ({} bytes)", entry.size());
            skipped += 1;
            continue;
        }

        let mut buffer = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buffer)?;
        match String::from_utf8(buffer) {
            Ok(text) if !text.contains('\0') => files.push(FileRecord::new(path, text)),
            _ => {
                log::debug!("Skipping non-text archive entry {path}");
                skipped += 1;
            }
        }
    }

    log::info!(
        "Extracted {} text files from archive ({skipped} skipped)",
        files.len()
    );
    Ok(files)
}

fn strip_root(name: &str) -> Option<String> {
    let (_, rest) = name.split_once('/')?;
    let rest = rest.trim_start_matches('/');
    (!rest.is_empty()).then(|| rest.to_string())
}

fn invalid_archive(err: zip::result::ZipError) -> PipelineError {
    PipelineError::SourceError(format!("invalid repository archive: {err}"))
}

//! Fixed denylist applied to raw repository listings before any expensive
//! processing. Pure and order preserving.

use crate::FileRecord;

/// Directory names whose whole subtree is build output or vendored dependencies.
const DENIED_DIRS: &[&str] = &["dist", "node_modules"];

/// Lockfiles matched by exact file name (any `*.lock` is matched separately).
const DENIED_FILE_NAMES: &[&str] = &["package-lock.json", "pnpm-lock.yaml"];

const DENIED_EXTENSIONS: &[&str] = &[
    // lockfiles
    "lock",
    // images
    "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "bmp", "tif", "tiff", "avif", "psd",
    // audio
    "mp3", "wav", "ogg", "flac", "aac", "m4a",
    // video
    "mp4", "webm", "mov", "avi", "mkv",
    // archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "iso", "jar",
    // executables and native libraries
    "exe", "dll", "so", "dylib", "bin", "class", "wasm",
    // fonts and documents
    "woff", "woff2", "ttf", "otf", "eot", "pdf",
];

/// Returns `false` when the path hits the denylist.
pub fn path_allowed(path: &str) -> bool {
    let normalized = normalize_path(path);
    let mut components = normalized.split('/').filter(|c| !c.is_empty()).peekable();

    while let Some(component) = components.next() {
        let is_last = components.peek().is_none();
        if !is_last {
            if DENIED_DIRS
                .iter()
                .any(|dir| component.eq_ignore_ascii_case(dir))
            {
                return false;
            }
            continue;
        }

        if DENIED_FILE_NAMES
            .iter()
            .any(|name| component.eq_ignore_ascii_case(name))
        {
            return false;
        }

        if let Some((_, ext)) = component.rsplit_once('.') {
            if DENIED_EXTENSIONS
                .iter()
                .any(|denied| ext.eq_ignore_ascii_case(denied))
            {
                return false;
            }
        }
    }

    true
}

/// Drops denied files, keeping the surviving records in input order.
pub fn filter_files(files: Vec<FileRecord>) -> Vec<FileRecord> {
    let before = files.len();
    let kept: Vec<FileRecord> = files
        .into_iter()
        .filter(|file| path_allowed(&file.path))
        .collect();
    if kept.len() != before {
        log::debug!("Path filter removed {} of {} files", before - kept.len(), before);
    }
    kept
}

pub fn filter_paths<S: AsRef<str>>(paths: impl IntoIterator<Item = S>) -> Vec<String> {
    paths
        .into_iter()
        .filter(|p| path_allowed(p.as_ref()))
        .map(|p| p.as_ref().to_string())
        .collect()
}

fn normalize_path(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while let Some(stripped) = value.strip_prefix("./") {
        value = stripped.to_string();
    }
    value
}

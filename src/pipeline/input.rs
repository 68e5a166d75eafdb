//! Input resolution: turn user-supplied paths into validated nest report files.
//!
//! pdfium needs a file-system path, so in-memory reports are written to a
//! [`TempDir`] that lives as long as the [`ResolvedInput`]. The `%PDF`
//! magic bytes are checked up front so callers get a meaningful error
//! rather than a pdfium failure.

use std::ffi::OsStr;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::{NestQuoteError, NestQuoteResult};
use crate::model::natural_cmp;

/// A validated nest report on disk.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input came from memory; the temp directory is removed on drop.
    Temporary { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Temporary { path, .. } => path,
        }
    }
}

/// Validate that a local file exists, is readable and starts with `%PDF`.
pub fn resolve_local(path: &Path) -> NestQuoteResult<ResolvedInput> {
    let path = path.to_path_buf();
    if !path.exists() {
        return Err(NestQuoteError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(NestQuoteError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(NestQuoteError::PermissionDenied { path });
        }
        Err(_) => return Err(NestQuoteError::FileNotFound { path }),
    }

    debug!("Resolved nest report: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Write an in-memory report to a temp directory as `<name>`, so the nest
/// keeps a meaningful name.
pub fn resolve_bytes(name: &str, bytes: &[u8]) -> NestQuoteResult<ResolvedInput> {
    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(NestQuoteError::NotAPdf {
            path: PathBuf::from(name),
            magic,
        });
    }
    let temp_dir = TempDir::new().map_err(|e| NestQuoteError::Internal(format!("tempdir: {e}")))?;
    let file_name = Path::new(name).file_name().unwrap_or(OsStr::new(name));
    let path = temp_dir.path().join(file_name);
    let mut file = std::fs::File::create(&path).map_err(|source| NestQuoteError::Io {
        path: path.clone(),
        source,
    })?;
    file.write_all(bytes).map_err(|source| NestQuoteError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(ResolvedInput::Temporary {
        path,
        _temp_dir: temp_dir,
    })
}

/// Expand directories into the PDFs they contain (natural order) and
/// validate every file. Order of the explicit arguments is kept.
pub fn resolve_inputs(paths: &[PathBuf]) -> NestQuoteResult<Vec<PathBuf>> {
    let mut resolved = Vec::new();
    for path in paths {
        if path.is_dir() {
            let entries = std::fs::read_dir(path).map_err(|source| NestQuoteError::Io {
                path: path.clone(),
                source,
            })?;
            let mut pdfs: Vec<PathBuf> = entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| {
                    p.extension()
                        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                        .unwrap_or(false)
                })
                .collect();
            pdfs.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
            for pdf in pdfs {
                resolve_local(&pdf)?;
                resolved.push(pdf);
            }
        } else {
            resolve_local(path)?;
            resolved.push(path.clone());
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_local(Path::new("/definitely/not/here.pdf")).err().unwrap();
        assert!(matches!(err, NestQuoteError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"hello").unwrap();
        let err = resolve_local(&path).err().unwrap();
        assert!(matches!(err, NestQuoteError::NotAPdf { magic, .. } if &magic == b"hell"));
    }

    #[test]
    fn directories_expand_to_sorted_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["job-10.pdf", "job-2.pdf", "readme.txt"] {
            std::fs::write(dir.path().join(name), b"%PDF-1.7\n").unwrap();
        }
        let resolved = resolve_inputs(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = resolved
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["job-2.pdf", "job-10.pdf"]);
    }
}

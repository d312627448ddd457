//! Bulk export of session artifacts into a single zip archive.
//!
//! Artifacts are copied into a private staging directory under their target
//! names, then written to `<prefix>_<format>_<YYYYMMDD_HHMMSS>.zip` in the
//! exports directory. The staging directory is removed when the export ends,
//! whether it succeeded or not.

use std::{
    collections::HashSet,
    fmt,
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::{errors::Error, sessions::SESSION_EXTENSION, Result};

pub const MANIFEST_NAME: &str = "stats.txt";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Telethon,
    Pyrogram,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Telethon, ExportFormat::Pyrogram];

    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Telethon => "telethon",
            ExportFormat::Pyrogram => "pyrogram",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Telethon => "Telethon",
            ExportFormat::Pyrogram => "Pyrogram",
        }
    }

    /// Both client libraries store a session as an SQLite `.session` file.
    pub fn extension(self) -> &'static str {
        SESSION_EXTENSION
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "telethon" => Some(ExportFormat::Telethon),
            "pyrogram" => Some(ExportFormat::Pyrogram),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOutcome {
    pub archive_path: PathBuf,
    /// Archive entry names of the exported artifacts, in input order.
    pub exported: Vec<String>,
    /// Refs that were dropped because the artifact was missing or unreadable.
    pub skipped: usize,
}

#[derive(Clone, Debug)]
pub struct Exporter {
    exports_dir: PathBuf,
    prefix: String,
}

impl Exporter {
    pub fn new(exports_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            exports_dir: exports_dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn exports_dir(&self) -> &Path {
        &self.exports_dir
    }

    pub fn export(
        &self,
        session_refs: &[PathBuf],
        format: ExportFormat,
        limit: Option<usize>,
        include_manifest: bool,
    ) -> Result<ExportOutcome> {
        self.export_at(session_refs, format, limit, include_manifest, Local::now())
    }

    pub fn export_at(
        &self,
        session_refs: &[PathBuf],
        format: ExportFormat,
        limit: Option<usize>,
        include_manifest: bool,
        now: DateTime<Local>,
    ) -> Result<ExportOutcome> {
        let refs = match limit {
            Some(n) if n > 0 => &session_refs[..n.min(session_refs.len())],
            _ => session_refs,
        };

        fs::create_dir_all(&self.exports_dir)
            .map_err(|e| export_err("create exports directory", e))?;
        let staging = tempfile::Builder::new()
            .prefix(&format!("export_{}_", now.format("%Y%m%d_%H%M%S")))
            .tempdir_in(&self.exports_dir)
            .map_err(|e| export_err("create staging directory", e))?;

        let mut staged: Vec<(String, PathBuf)> = Vec::with_capacity(refs.len());
        let mut used: HashSet<String> = HashSet::new();
        let mut skipped = 0usize;

        for src in refs {
            if !src.is_file() {
                tracing::debug!(path = %src.display(), "session artifact missing, skipping");
                skipped += 1;
                continue;
            }
            let name = unique_name(&target_name(src, format), &mut used);
            let dest = staging.path().join(&name);
            if let Err(e) = fs::copy(src, &dest) {
                tracing::warn!(path = %src.display(), error = %e, "failed to stage session artifact");
                used.remove(&name);
                skipped += 1;
                continue;
            }
            staged.push((name, dest));
        }

        let (archive_path, file) = self.create_archive_file(format, &now)?;
        let names: Vec<String> = staged.iter().map(|(n, _)| n.clone()).collect();

        let manifest_text = include_manifest.then(|| manifest(format, &now, &names));
        if let Err(e) = write_archive(file, &staged, manifest_text) {
            let _ = fs::remove_file(&archive_path);
            return Err(e);
        }

        tracing::info!(
            archive = %archive_path.display(),
            format = %format,
            exported = names.len(),
            skipped,
            "export written"
        );

        Ok(ExportOutcome {
            archive_path,
            exported: names,
            skipped,
        })
    }

    /// Create the archive file without ever replacing an existing one.
    fn create_archive_file(
        &self,
        format: ExportFormat,
        now: &DateTime<Local>,
    ) -> Result<(PathBuf, File)> {
        let base = format!(
            "{}_{}_{}",
            self.prefix,
            format.as_str(),
            now.format("%Y%m%d_%H%M%S")
        );
        for n in 0u32.. {
            let name = if n == 0 {
                format!("{base}.zip")
            } else {
                format!("{base}_{n}.zip")
            };
            let path = self.exports_dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(f) => return Ok((path, f)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(export_err("create archive", e)),
            }
        }
        Err(Error::Export("no free archive name".to_string()))
    }
}

fn target_name(src: &Path, format: ExportFormat) -> String {
    let stem = src
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "session".to_string());
    format!("{stem}.{}", format.extension())
}

fn unique_name(candidate: &str, used: &mut HashSet<String>) -> String {
    if used.insert(candidate.to_string()) {
        return candidate.to_string();
    }
    let path = Path::new(candidate);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut n = 2u32;
    loop {
        let name = format!("{stem}_{n}.{ext}");
        if used.insert(name.clone()) {
            return name;
        }
        n += 1;
    }
}

fn manifest(format: ExportFormat, now: &DateTime<Local>, names: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Export Date: {}\n", now.to_rfc3339()));
    out.push_str(&format!("Format: {}\n", format.as_str()));
    out.push_str(&format!("Total Sessions: {}\n", names.len()));
    out.push_str("\nSession Files:\n");
    for (i, name) in names.iter().enumerate() {
        out.push_str(&format!("  {}. {name}\n", i + 1));
    }
    out
}

fn write_archive(
    file: File,
    staged: &[(String, PathBuf)],
    manifest: Option<String>,
) -> Result<()> {
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(file);

    for (name, path) in staged {
        zip.start_file(name.as_str(), options)
            .map_err(|e| Error::Export(format!("add {name}: {e}")))?;
        let mut src = File::open(path).map_err(|e| export_err("read staged artifact", e))?;
        io::copy(&mut src, &mut zip).map_err(|e| export_err("write archive entry", e))?;
    }

    if let Some(text) = manifest {
        zip.start_file(MANIFEST_NAME, options)
            .map_err(|e| Error::Export(format!("add {MANIFEST_NAME}: {e}")))?;
        zip.write_all(text.as_bytes())
            .map_err(|e| export_err("write manifest", e))?;
    }

    let mut file = zip
        .finish()
        .map_err(|e| Error::Export(format!("finish archive: {e}")))?;
    file.flush().map_err(|e| export_err("flush archive", e))?;
    Ok(())
}

fn export_err(what: &str, e: io::Error) -> Error {
    Error::Export(format!("{what}: {e}"))
}

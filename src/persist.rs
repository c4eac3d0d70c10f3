use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::ValueEnum;
use csv::WriterBuilder;

use crate::{capture::CaptureRecord, utils::artifact_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArtifactFormat {
    /// JSON array of {"ts", "len"} objects
    Json,
    /// CSV with a `ts,len` header
    Csv,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Json => "json",
            ArtifactFormat::Csv => "csv",
        }
    }
}

/// Writes one file per capture window. Files are never reopened once written.
pub struct ArtifactWriter {
    dir: PathBuf,
    tag: String,
    format: ArtifactFormat,
}

impl ArtifactWriter {
    pub fn create(dir: &Path, tag: &str, format: ArtifactFormat) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create output directory '{}'", dir.display()))?;

        Ok(ArtifactWriter {
            dir: dir.to_path_buf(),
            tag: tag.to_owned(),
            format,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, records: &[CaptureRecord]) -> anyhow::Result<PathBuf> {
        let (path, file) = self.create_unique()?;

        let res = match self.format {
            ArtifactFormat::Json => write_json(file, records),
            ArtifactFormat::Csv => write_csv(file, records),
        };
        res.with_context(|| format!("failed to write artifact '{}'", path.display()))?;

        Ok(path)
    }

    /// Opens `<tag>_<secs>.<ext>`, falling back to `<tag>_<secs>-<n>.<ext>` when
    /// an earlier window in the same second already took the name.
    fn create_unique(&self) -> anyhow::Result<(PathBuf, File)> {
        let ext = self.format.extension();
        let stamp = chrono::Utc::now().timestamp();

        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                artifact_name(&self.tag, &stamp.to_string(), ext)
            } else {
                artifact_name(&self.tag, &format!("{}-{}", stamp, attempt), ext)
            };
            let path = self.dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(e).with_context(|| format!("cannot create artifact '{}'", path.display()))
                }
            }
        }
    }
}

fn write_json(file: File, records: &[CaptureRecord]) -> anyhow::Result<()> {
    let mut out = BufWriter::new(file);
    serde_json::to_writer(&mut out, records)?;
    out.flush()?;
    Ok(())
}

fn write_csv(file: File, records: &[CaptureRecord]) -> anyhow::Result<()> {
    let mut out = WriterBuilder::new().has_headers(false).from_writer(file);
    out.write_record(["ts", "len"])?; // header, also for empty windows
    for rec in records {
        out.serialize(rec)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test {
    use std::path::PathBuf;

    use super::*;

    pub fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("streamcap-{}-{}", name, std::process::id()));
        _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn json_artifact_contents() {
        let dir = scratch_dir("json");
        let writer = ArtifactWriter::create(&dir, "free", ArtifactFormat::Json).unwrap();
        let path = writer
            .write(&[
                CaptureRecord { timestamp: 0.25, length: 1400 },
                CaptureRecord { timestamp: 0.5, length: 66 },
            ])
            .unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("free_"));
        assert!(name.ends_with(".json"));

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, r#"[{"ts":0.25,"len":1400},{"ts":0.5,"len":66}]"#);
    }

    #[test]
    fn csv_artifact_contents() {
        let dir = scratch_dir("csv");
        let writer = ArtifactWriter::create(&dir, "sc_low", ArtifactFormat::Csv).unwrap();
        let path = writer.write(&[CaptureRecord { timestamp: 1.5, length: 100 }]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ts,len\n1.5,100\n");
    }

    #[test]
    fn empty_window_still_written() {
        let dir = scratch_dir("empty");
        let json = ArtifactWriter::create(&dir, "a", ArtifactFormat::Json).unwrap();
        assert_eq!(fs::read_to_string(json.write(&[]).unwrap()).unwrap(), "[]");

        let csv = ArtifactWriter::create(&dir, "b", ArtifactFormat::Csv).unwrap();
        assert_eq!(fs::read_to_string(csv.write(&[]).unwrap()).unwrap(), "ts,len\n");
    }

    #[test]
    fn same_second_does_not_overwrite() {
        let dir = scratch_dir("collide");
        let writer = ArtifactWriter::create(&dir, "apple_low", ArtifactFormat::Json).unwrap();
        let paths: Vec<_> = (0..4).map(|_| writer.write(&[]).unwrap()).collect();

        let mut unique = paths.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 4);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 4);
    }

    #[test]
    fn unwritable_directory_is_an_error() {
        let dir = scratch_dir("blocked");
        fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("file");
        fs::write(&blocker, b"x").unwrap();

        assert!(ArtifactWriter::create(&blocker.join("sub"), "t", ArtifactFormat::Json).is_err());
    }
}

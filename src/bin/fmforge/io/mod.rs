use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Returns `true` if stderr is a terminal (interactive).
pub fn stderr_is_tty() -> bool {
    io::stderr().is_terminal()
}

pub fn open_input(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;
    Ok(BufReader::new(file))
}

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Creates `dir` and any missing parents.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

/// Output files written into one directory, remembered for the summary.
pub struct OutputDir {
    root: PathBuf,
    written: Vec<PathBuf>,
}

impl OutputDir {
    pub fn new(root: &Path) -> Result<Self> {
        ensure_dir(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            written: Vec::new(),
        })
    }

    pub fn create(&mut self, file_name: &str) -> Result<BufWriter<File>> {
        let path = self.root.join(file_name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        self.written.push(path);
        Ok(BufWriter::new(file))
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

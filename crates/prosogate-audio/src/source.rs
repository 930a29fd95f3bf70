use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Pull-style reader over a downloaded audio file. The speech backend pulls
/// fixed-size chunks until exhaustion; a zero-length read means the source
/// is drained.
#[derive(Debug)]
pub struct AudioSource {
    path: PathBuf,
    file: Option<File>,
}

impl AudioSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Read up to `buf.len()` bytes. Returns 0 once exhausted or closed.
    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.read(buf),
            None => Ok(0),
        }
    }

    /// Release the underlying file handle. Idempotent.
    pub fn close(&mut self) {
        self.file.take();
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

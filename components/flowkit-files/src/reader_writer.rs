use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Mutex;

/// File access used for configuration, contract sources and key files.
pub trait ReaderWriter: Send + Sync {
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8], perm: u32) -> io::Result<()>;

    fn file_exists(&self, path: &str) -> bool {
        self.read_file(path).is_ok()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemReaderWriter;

impl FileSystemReaderWriter {
    pub fn new() -> FileSystemReaderWriter {
        FileSystemReaderWriter
    }
}

impl ReaderWriter for FileSystemReaderWriter {
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_file(&self, path: &str, data: &[u8], perm: u32) -> io::Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, data)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(perm))?;
        }
        #[cfg(not(unix))]
        let _ = perm;
        Ok(())
    }

    fn file_exists(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }
}

/// In-memory files keyed by path.
#[derive(Debug, Default)]
pub struct MemoryReaderWriter {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryReaderWriter {
    pub fn new() -> MemoryReaderWriter {
        MemoryReaderWriter::default()
    }

    pub fn with_file(self, path: &str, content: &str) -> MemoryReaderWriter {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.to_string(), content.as_bytes().to_vec());
        }
        self
    }

    pub fn content(&self, path: &str) -> Option<String> {
        let files = self.files.lock().ok()?;
        files
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).to_string())
    }
}

impl ReaderWriter for MemoryReaderWriter {
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        let files = self
            .files
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{path}: file not found"))
        })
    }

    fn write_file(&self, path: &str, data: &[u8], _perm: u32) -> io::Result<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

//! Byte stores backing the settings log.
//!
//! - [`RamStore`]: fixed array, erased to `0xFF`; tests and volatile boards
//! - [`FileStore`]: whole region mirrored to a file (host)
//! - [`NvsStore`]: whole region as one NVS blob (ESP32)
//!
//! Writes land in a RAM image; `commit` pushes the image to the backend.

use crate::hal::{ByteStore, StorageError};

#[cfg(any(target_os = "espidf", all(feature = "std", not(target_os = "espidf"))))]
use super::store::REGION_SIZE;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::*;

/// Value of an erased byte.
pub const ERASED: u8 = 0xFF;

/// NVS namespace holding the settings blob.
pub const NVS_NAMESPACE: &str = "keyer";

/// NVS key of the settings blob.
pub const NVS_BLOB_KEY: &str = "log";

/// Volatile store of `N` bytes.
#[derive(Clone, Debug)]
pub struct RamStore<const N: usize> {
    bytes: [u8; N],
    commits: u32,
}

impl<const N: usize> Default for RamStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RamStore<N> {
    pub const fn new() -> Self {
        Self { bytes: [ERASED; N], commits: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of successful commits.
    pub fn commits(&self) -> u32 {
        self.commits
    }
}

impl<const N: usize> ByteStore for RamStore<N> {
    fn len(&self) -> usize {
        N
    }

    fn read(&self, offset: usize) -> u8 {
        self.bytes.get(offset).copied().unwrap_or(ERASED)
    }

    fn write(&mut self, offset: usize, value: u8) -> Result<(), StorageError> {
        let byte = self.bytes.get_mut(offset).ok_or(StorageError::OutOfRange)?;
        *byte = value;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.commits += 1;
        Ok(())
    }
}

/// Region image persisted as a plain file.
#[cfg(all(feature = "std", not(target_os = "espidf")))]
pub struct FileStore {
    path: std::path::PathBuf,
    image: std::vec::Vec<u8>,
}

#[cfg(all(feature = "std", not(target_os = "espidf")))]
impl FileStore {
    /// Load `path`, or start erased if it does not exist yet.
    pub fn open(path: impl Into<std::path::PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let mut image = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => std::vec::Vec::new(),
            Err(e) => return Err(e),
        };
        image.resize(REGION_SIZE, ERASED);
        Ok(Self { path, image })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(all(feature = "std", not(target_os = "espidf")))]
impl ByteStore for FileStore {
    fn len(&self) -> usize {
        self.image.len()
    }

    fn read(&self, offset: usize) -> u8 {
        self.image.get(offset).copied().unwrap_or(ERASED)
    }

    fn write(&mut self, offset: usize, value: u8) -> Result<(), StorageError> {
        let byte = self.image.get_mut(offset).ok_or(StorageError::OutOfRange)?;
        *byte = value;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        std::fs::write(&self.path, &self.image).map_err(|_| StorageError::CommitFailed)
    }
}

/// Region image persisted as a single NVS blob.
#[cfg(target_os = "espidf")]
pub struct NvsStore {
    nvs: EspNvs<NvsDefault>,
    image: [u8; REGION_SIZE],
}

#[cfg(target_os = "espidf")]
impl NvsStore {
    /// Open the namespace and load the blob. A missing blob reads as erased.
    pub fn open(partition: EspDefaultNvsPartition) -> Result<Self, esp_idf_svc::sys::EspError> {
        let nvs = EspNvs::new(partition, NVS_NAMESPACE, true)?;
        let mut image = [ERASED; REGION_SIZE];
        let mut buf = [ERASED; REGION_SIZE];
        if let Some(stored) = nvs.get_blob(NVS_BLOB_KEY, &mut buf)? {
            let n = stored.len().min(REGION_SIZE);
            image[..n].copy_from_slice(&stored[..n]);
        }
        Ok(Self { nvs, image })
    }
}

#[cfg(target_os = "espidf")]
impl ByteStore for NvsStore {
    fn len(&self) -> usize {
        REGION_SIZE
    }

    fn read(&self, offset: usize) -> u8 {
        self.image.get(offset).copied().unwrap_or(ERASED)
    }

    fn write(&mut self, offset: usize, value: u8) -> Result<(), StorageError> {
        let byte = self.image.get_mut(offset).ok_or(StorageError::OutOfRange)?;
        *byte = value;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.nvs.set_blob(NVS_BLOB_KEY, &self.image).map_err(|_| StorageError::CommitFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_store_erased() {
        let store = RamStore::<16>::new();
        assert_eq!(store.len(), 16);
        assert!(store.as_bytes().iter().all(|&b| b == ERASED));
        assert_eq!(store.read(100), ERASED);
    }

    #[test]
    fn test_ram_store_bounds() {
        let mut store = RamStore::<4>::new();
        assert_eq!(store.write(3, 7), Ok(()));
        assert_eq!(store.read(3), 7);
        assert_eq!(store.write(4, 7), Err(StorageError::OutOfRange));
        store.commit().unwrap();
        assert_eq!(store.commits(), 1);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_file_store_round_trip() {
        let file = tempfile::NamedTempFile::new().unwrap();

        // Empty file reads as erased
        let mut store = FileStore::open(file.path()).unwrap();
        assert_eq!(store.len(), REGION_SIZE);
        assert_eq!(store.read(10), ERASED);
        store.write(10, 42).unwrap();
        store.commit().unwrap();

        let reopened = FileStore::open(file.path()).unwrap();
        assert_eq!(reopened.read(10), 42);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_file_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyer-settings.bin");

        let mut store = FileStore::open(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(store.read(0), ERASED);
        store.commit().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), REGION_SIZE as u64);
    }
}

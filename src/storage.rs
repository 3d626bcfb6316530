use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SERVER_IP: &str = "SERVER_IP";
pub const SERVER_PORT: &str = "SERVER_PORT";
pub const USER_ID: &str = "userId";
pub const CSRF: &str = "csrf";
pub const DEVICE_TOKEN: &str = "token";

/// String map persisted as one postcard file. Each write lands in a temp file
/// beside the store and is renamed over it, so the file on disk is always a
/// complete earlier or later version. A failed write leaves memory unchanged.
#[derive(Debug)]
pub struct KvStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl KvStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let data = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            postcard::from_bytes(&data).with_context(|| format!("decoding {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    pub fn set_many(&mut self, pairs: &[(&str, &str)]) -> Result<()> {
        let mut next = self.entries.clone();
        for (key, value) in pairs {
            next.insert((*key).to_string(), (*value).to_string());
        }
        self.commit(next)
    }

    pub fn remove(&mut self, keys: &[&str]) -> Result<()> {
        let mut next = self.entries.clone();
        for key in keys {
            next.remove(*key);
        }
        self.commit(next)
    }

    fn commit(&mut self, next: BTreeMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

        let data = postcard::to_allocvec(&next)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", dir.display()))?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .with_context(|| format!("writing {}", self.path.display()))?;
        self.entries = next;
        Ok(())
    }
}

// archiver_core/src/store.rs

//! On-disk archives.
//! `ArchiveStore` keeps one JSON file per record in a directory. How records
//! are named and encoded is described by a `RecordSchema`; the newest key is
//! always recomputed from the directory, never cached.

use anyhow::Context;

use crate::keys::ArchiveKey;
use crate::utils;

/// Read/write contract shared by every archive kind.
pub trait Archive: Send + Sync {
    type Key: ArchiveKey;
    type Record;

    /// Newest key present, `None` for an empty archive.
    fn latest_key(&self) -> anyhow::Result<Option<Self::Key>>;
    /// Persists one record. Writing is all-or-nothing.
    fn write(&self, record: &Self::Record) -> anyhow::Result<()>;
    /// Loads the record stored under `key`, if any.
    fn read(&self, key: &Self::Key) -> anyhow::Result<Option<Self::Record>>;
}

/// Where a schema keeps the key of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLocation {
    /// Parsed from the file name.
    FileName,
    /// Read from the file body.
    Content,
}

/// Naming and encoding of one record type.
pub trait RecordSchema: Send + Sync {
    type Key: ArchiveKey;
    type Record: Send + Sync;

    fn key_of(&self, record: &Self::Record) -> Self::Key;
    fn file_name(&self, record: &Self::Record) -> String;

    /// Whether `file_name` belongs to this archive. For `KeyLocation::FileName`
    /// schemas this also yields the key.
    fn key_from_file_name(&self, file_name: &str) -> Option<Self::Key>;

    fn key_location(&self) -> KeyLocation {
        KeyLocation::FileName
    }

    /// Reads the key from a file body. Only consulted for `KeyLocation::Content`.
    fn key_from_contents(&self, _contents: &str) -> Option<Self::Key> {
        None
    }

    /// File name of `key` when it can be derived from the key alone.
    fn exact_file_name(&self, _key: &Self::Key) -> Option<String> {
        None
    }

    fn encode(&self, record: &Self::Record) -> anyhow::Result<String>;
    fn decode(&self, file_name: &str, contents: &str) -> anyhow::Result<Self::Record>;
}

/// Directory of one-file-per-record JSON documents.
#[derive(Debug, Clone)]
pub struct ArchiveStore<S: RecordSchema> {
    dir: std::path::PathBuf,
    schema: S,
}

impl<S: RecordSchema> ArchiveStore<S> {
    pub fn new<P: AsRef<std::path::Path>>(dir: P, schema: S) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            schema,
        }
    }

    pub fn get_dir(&self) -> &std::path::Path {
        &self.dir
    }

    pub fn get_schema(&self) -> &S {
        &self.schema
    }

    /// File names in the directory that belong to this archive, sorted.
    /// A missing directory is an empty archive.
    fn archive_file_names(&self) -> anyhow::Result<Vec<String>> {
        if !self.dir.exists() {
            return anyhow::Ok(Vec::new());
        }

        let mut names = Vec::new();
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list archive '{}'", self.dir.display()))?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else { continue };
            if self.schema.key_from_file_name(&name).is_some() {
                names.push(name);
            }
        }
        names.sort();

        anyhow::Ok(names)
    }

    fn read_file(&self, file_name: &str) -> anyhow::Result<String> {
        let path = self.dir.join(file_name);
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read '{}'", path.display()))
    }

    /// Key of an archive file, reading its body when the schema requires it.
    fn key_of_file(&self, file_name: &str) -> anyhow::Result<Option<S::Key>> {
        match self.schema.key_location() {
            KeyLocation::FileName => anyhow::Ok(self.schema.key_from_file_name(file_name)),
            KeyLocation::Content => {
                let contents = self.read_file(file_name)?;
                let key = self.schema.key_from_contents(&contents);
                if key.is_none() {
                    tracing::warn!(file = file_name, dir = %self.dir.display(), "archive file without a readable key");
                }
                anyhow::Ok(key)
            }
        }
    }

    /// All records, ordered by key.
    pub fn load_all(&self) -> anyhow::Result<Vec<S::Record>> {
        let mut records = Vec::new();
        for name in self.archive_file_names()? {
            let contents = self.read_file(&name)?;
            let record = self.schema.decode(&name, &contents)
                .with_context(|| format!("Failed to decode '{}'", self.dir.join(&name).display()))?;
            records.push(record);
        }
        records.sort_by_key(|r| self.schema.key_of(r));

        anyhow::Ok(records)
    }
}

impl<S: RecordSchema> Archive for ArchiveStore<S> {
    type Key = S::Key;
    type Record = S::Record;

    fn latest_key(&self) -> anyhow::Result<Option<S::Key>> {
        let mut latest: Option<S::Key> = None;
        for name in self.archive_file_names()? {
            if let Some(key) = self.key_of_file(&name)? {
                if latest.as_ref().map_or(true, |l| key > *l) {
                    latest = Some(key);
                }
            }
        }

        anyhow::Ok(latest)
    }

    fn write(&self, record: &S::Record) -> anyhow::Result<()> {
        let file_name = self.schema.file_name(record);
        let contents = self.schema.encode(record)?;
        utils::write_atomic(&self.dir.join(&file_name), &contents)?;
        tracing::info!(file = %file_name, dir = %self.dir.display(), "Saved record");

        anyhow::Ok(())
    }

    fn read(&self, key: &S::Key) -> anyhow::Result<Option<S::Record>> {
        if let Some(name) = self.schema.exact_file_name(key) {
            if !self.dir.join(&name).is_file() {
                return anyhow::Ok(None);
            }
            let contents = self.read_file(&name)?;
            let record = self.schema.decode(&name, &contents)?;
            return anyhow::Ok((self.schema.key_of(&record) == *key).then_some(record));
        }

        for name in self.archive_file_names()? {
            if self.key_of_file(&name)?.as_ref() == Some(key) {
                let contents = self.read_file(&name)?;
                return anyhow::Ok(Some(self.schema.decode(&name, &contents)?));
            }
        }

        anyhow::Ok(None)
    }
}

use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
    time::SystemTime,
};

use compact_str::{format_compact, CompactString};

use crate::error::StoreError;

/// Detects whether cached compiled output is stale relative to its source.
/// Opaque to the engine; the cache only compares fingerprints for equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(CompactString);

impl Fingerprint {
    pub fn new(value: impl Into<CompactString>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateMeta {
    pub name: CompactString,
    pub fingerprint: Fingerprint,
}

/// Storage of template source text, owned by the host.
pub trait TemplateStore: Send + Sync {
    fn load(&self, name: &str) -> Result<(String, Fingerprint), StoreError>;
    fn save(&self, name: &str, text: &str) -> Result<(), StoreError>;
    fn list(&self) -> Result<Vec<TemplateMeta>, StoreError>;
    fn delete(&self, name: &str) -> Result<(), StoreError>;
}

/// Template files under a root directory, named by relative path.
/// Fingerprints combine modification time and file size.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a template name under the root, rejecting absolute paths and
    /// traversal segments.
    fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        let valid = !name.is_empty()
            && !Path::new(name).is_absolute()
            && name
                .split(|c| c == '/' || c == '\\')
                .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
        if !valid {
            return Err(StoreError::InvalidName(name.into()));
        }
        Ok(self.root.join(name))
    }
}

impl TemplateStore for FsStore {
    fn load(&self, name: &str) -> Result<(String, Fingerprint), StoreError> {
        let path = self.resolve(name)?;
        let text = fs::read_to_string(&path).map_err(|err| map_io(err, name))?;
        let metadata = fs::metadata(&path)?;
        Ok((text, fs_fingerprint(&metadata)))
    }

    fn save(&self, name: &str, text: &str) -> Result<(), StoreError> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, text)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<TemplateMeta>, StoreError> {
        let mut out = Vec::new();
        visit(&self.root, &self.root, &mut out)?;
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.resolve(name)?;
        fs::remove_file(&path).map_err(|err| map_io(err, name))
    }
}

fn map_io(err: io::Error, name: &str) -> StoreError {
    if err.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(name.into())
    } else {
        StoreError::Io(err)
    }
}

fn fs_fingerprint(metadata: &fs::Metadata) -> Fingerprint {
    let modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    Fingerprint::new(format_compact!("{modified}-{}", metadata.len()))
}

fn visit(root: &Path, dir: &Path, out: &mut Vec<TemplateMeta>) -> Result<(), StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        // An absent root simply lists as empty.
        Err(err) if err.kind() == io::ErrorKind::NotFound && dir == root => return Ok(()),
        Err(err) => return Err(err.into()),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            visit(root, &path, out)?;
        } else {
            let rel = path.strip_prefix(root).unwrap_or(path.as_path());
            let mut name = CompactString::default();
            for component in rel.components() {
                if !name.is_empty() {
                    name.push('/');
                }
                name.push_str(&component.as_os_str().to_string_lossy());
            }
            out.push(TemplateMeta {
                name,
                fingerprint: fs_fingerprint(&metadata),
            });
        }
    }
    Ok(())
}

/// In-memory store with per-template revision counters as fingerprints.
/// Useful for hosts that keep template source in a database, and for tests.
#[derive(Default)]
pub struct MemoryStore {
    templates: RwLock<HashMap<CompactString, StoredTemplate>>,
}

struct StoredTemplate {
    text: String,
    revision: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates<N, T>(templates: impl IntoIterator<Item = (N, T)>) -> Self
    where
        N: Into<CompactString>,
        T: Into<String>,
    {
        let store = Self::new();
        {
            let mut map = store
                .templates
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            for (name, text) in templates {
                map.insert(
                    name.into(),
                    StoredTemplate {
                        text: text.into(),
                        revision: 1,
                    },
                );
            }
        }
        store
    }
}

impl TemplateStore for MemoryStore {
    fn load(&self, name: &str) -> Result<(String, Fingerprint), StoreError> {
        let templates = self
            .templates
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let stored = templates
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.into()))?;
        Ok((
            stored.text.clone(),
            Fingerprint::new(format_compact!("{}", stored.revision)),
        ))
    }

    fn save(&self, name: &str, text: &str) -> Result<(), StoreError> {
        let mut templates = self
            .templates
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = templates
            .entry(name.into())
            .or_insert_with(|| StoredTemplate {
                text: String::new(),
                revision: 0,
            });
        entry.text = text.to_owned();
        entry.revision += 1;
        Ok(())
    }

    fn list(&self) -> Result<Vec<TemplateMeta>, StoreError> {
        let templates = self
            .templates
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<_> = templates
            .iter()
            .map(|(name, stored)| TemplateMeta {
                name: name.clone(),
                fingerprint: Fingerprint::new(format_compact!("{}", stored.revision)),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut templates = self
            .templates
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        templates
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.into()))
    }
}

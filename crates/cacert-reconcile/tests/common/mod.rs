//! In-memory host for engine tests.
//!
//! Every collaborator records what it was asked to do so tests can assert
//! on invocation counts as well as on end state.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cacert_reconcile::{Host, Reconciler};
use cacert_truststore::{
    profile, CertSource, CommandOutput, CommandRunner, CommandSpec, DirectorySpec, FileSpec,
    Filesystem, OsFacts, PackageEnsure, PackageManager, SourceResolver, TrustStoreError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub content: Vec<u8>,
    pub owner: String,
    pub group: String,
    pub mode: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirMeta {
    pub owner: String,
    pub group: String,
    pub mode: u32,
}

#[derive(Default)]
struct FsState {
    dirs: BTreeMap<PathBuf, DirMeta>,
    files: BTreeMap<PathBuf, Entry>,
    failing_files: BTreeSet<PathBuf>,
    fail_directories: bool,
    writes: usize,
}

#[derive(Default)]
pub struct FakeFs {
    state: Mutex<FsState>,
}

impl FakeFs {
    pub fn file(&self, path: impl AsRef<Path>) -> Option<Entry> {
        self.state.lock().unwrap().files.get(path.as_ref()).cloned()
    }

    pub fn dir(&self, path: impl AsRef<Path>) -> Option<DirMeta> {
        self.state.lock().unwrap().dirs.get(path.as_ref()).cloned()
    }

    pub fn put_file(&self, path: impl Into<PathBuf>, content: &[u8]) {
        let entry = Entry {
            content: content.to_vec(),
            owner: "root".to_string(),
            group: "root".to_string(),
            mode: 0o644,
        };
        self.state.lock().unwrap().files.insert(path.into(), entry);
    }

    pub fn put_dir(&self, path: impl Into<PathBuf>, mode: u32) {
        let meta = DirMeta {
            owner: "root".to_string(),
            group: "root".to_string(),
            mode,
        };
        self.state.lock().unwrap().dirs.insert(path.into(), meta);
    }

    pub fn set_dir_mode(&self, path: impl AsRef<Path>, mode: u32) {
        if let Some(meta) = self.state.lock().unwrap().dirs.get_mut(path.as_ref()) {
            meta.mode = mode;
        }
    }

    pub fn fail_file(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().failing_files.insert(path.into());
    }

    pub fn fail_directories(&self) {
        self.state.lock().unwrap().fail_directories = true;
    }

    pub fn file_names_in(&self, dir: impl AsRef<Path>) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir.as_ref()))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn is_untouched(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.dirs.is_empty() && state.files.is_empty() && state.writes == 0
    }
}

#[async_trait]
impl Filesystem for FakeFs {
    async fn ensure_directory(&self, spec: &DirectorySpec) -> Result<bool, TrustStoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_directories {
            return Err(TrustStoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only file system",
            )));
        }
        let wanted = DirMeta {
            owner: spec.owner.clone(),
            group: spec.group.clone(),
            mode: spec.mode,
        };
        let mut changed = state.dirs.get(&spec.path) != Some(&wanted);
        if changed {
            state.dirs.insert(spec.path.clone(), wanted);
            state.writes += 1;
        }

        if spec.purge {
            let unmanaged: Vec<PathBuf> = state
                .files
                .keys()
                .filter(|p| p.parent() == Some(spec.path.as_path()))
                .filter(|p| {
                    p.file_name()
                        .map(|n| !spec.keep.contains(n.to_string_lossy().as_ref()))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            for path in unmanaged {
                state.files.remove(&path);
                state.writes += 1;
                changed = true;
            }
            if spec.recurse {
                let subdirs: Vec<PathBuf> = state
                    .dirs
                    .keys()
                    .filter(|p| p.parent() == Some(spec.path.as_path()))
                    .cloned()
                    .collect();
                for dir in subdirs {
                    state.dirs.remove(&dir);
                    state.files.retain(|p, _| !p.starts_with(&dir));
                    state.writes += 1;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    async fn ensure_file(&self, spec: &FileSpec) -> Result<bool, TrustStoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_files.contains(&spec.path) {
            return Err(TrustStoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            )));
        }
        let wanted = Entry {
            content: spec.content.clone(),
            owner: spec.owner.clone(),
            group: spec.group.clone(),
            mode: spec.mode,
        };
        if state.files.get(&spec.path) == Some(&wanted) {
            return Ok(false);
        }
        state.files.insert(spec.path.clone(), wanted);
        state.writes += 1;
        Ok(true)
    }

    async fn remove_file(&self, path: &Path) -> Result<bool, TrustStoreError> {
        let mut state = self.state.lock().unwrap();
        let removed = state.files.remove(path).is_some();
        if removed {
            state.writes += 1;
        }
        Ok(removed)
    }
}

#[derive(Default)]
pub struct FakePackages {
    calls: Mutex<Vec<(String, PackageEnsure)>>,
    installed: Mutex<BTreeMap<String, String>>,
    fail: Mutex<bool>,
}

impl FakePackages {
    pub fn calls(&self) -> Vec<(String, PackageEnsure)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn installed(&self, name: &str) -> Option<String> {
        self.installed.lock().unwrap().get(name).cloned()
    }

    pub fn fail(&self) {
        *self.fail.lock().unwrap() = true;
    }
}

#[async_trait]
impl PackageManager for FakePackages {
    async fn ensure_package(
        &self,
        name: &str,
        ensure: &PackageEnsure,
    ) -> Result<bool, TrustStoreError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), ensure.clone()));
        if *self.fail.lock().unwrap() {
            return Err(TrustStoreError::CommandFailed(format!(
                "install {name}: exit code 100: E: Unable to locate package"
            )));
        }
        let mut installed = self.installed.lock().unwrap();
        let changed = match ensure {
            PackageEnsure::Installed => {
                if installed.contains_key(name) {
                    false
                } else {
                    installed.insert(name.to_string(), "1.0".to_string());
                    true
                }
            }
            PackageEnsure::Absent => installed.remove(name).is_some(),
            PackageEnsure::Version(v) => {
                if installed.get(name) == Some(v) {
                    false
                } else {
                    installed.insert(name.to_string(), v.clone());
                    true
                }
            }
        };
        Ok(changed)
    }
}

/// How the fake answers a given argv.
#[derive(Clone)]
pub enum Reply {
    Ok(String),
    Exit(i32, String),
    Unavailable,
}

#[derive(Default)]
pub struct FakeCommands {
    calls: Mutex<Vec<Vec<String>>>,
    replies: Mutex<BTreeMap<String, Reply>>,
}

impl FakeCommands {
    /// Script the reply for a space-joined argv. Unscripted commands succeed
    /// with empty output.
    pub fn reply(&self, argv: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(argv.to_string(), reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|argv| argv.join(" "))
            .collect()
    }

    pub fn count(&self, argv: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == argv).count()
    }
}

#[async_trait]
impl CommandRunner for FakeCommands {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, TrustStoreError> {
        self.calls.lock().unwrap().push(spec.argv.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&spec.argv.join(" "))
            .cloned()
            .unwrap_or(Reply::Ok(String::new()));
        match reply {
            Reply::Ok(output) => Ok(CommandOutput {
                success: true,
                exit_code: Some(0),
                output,
            }),
            Reply::Exit(code, output) => Ok(CommandOutput {
                success: false,
                exit_code: Some(code),
                output,
            }),
            Reply::Unavailable => Err(TrustStoreError::CommandNotFound(spec.program().to_string())),
        }
    }
}

#[derive(Default)]
pub struct FakeSources {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl FakeSources {
    pub fn put(&self, path: impl Into<PathBuf>, content: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), content.to_vec());
    }
}

#[async_trait]
impl SourceResolver for FakeSources {
    async fn fetch(
        &self,
        source: &CertSource,
        _verify_https: bool,
    ) -> Result<Vec<u8>, TrustStoreError> {
        match source {
            CertSource::Inline(text) => Ok(text.as_bytes().to_vec()),
            CertSource::Path(path) => self
                .files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| TrustStoreError::Source(format!("{}: not found", path.display()))),
            CertSource::Url(url) => Err(TrustStoreError::Source(format!("{url}: unreachable"))),
        }
    }
}

/// A fake host plus handles on each collaborator.
#[derive(Default, Clone)]
pub struct FakeHost {
    pub fs: Arc<FakeFs>,
    pub packages: Arc<FakePackages>,
    pub commands: Arc<FakeCommands>,
    pub sources: Arc<FakeSources>,
}

impl FakeHost {
    pub fn host(&self) -> Host {
        Host {
            filesystem: self.fs.clone(),
            packages: self.packages.clone(),
            commands: self.commands.clone(),
            sources: self.sources.clone(),
        }
    }

    pub fn reconciler(&self, family: &str, name: &str, major: &str) -> Reconciler {
        let facts = OsFacts::new(family, name, major);
        let profile = profile::resolve(&facts).unwrap();
        Reconciler::new(profile, self.host())
    }
}

//! In-memory stand-ins for the upstream host and the build sandbox

use crate::error::{PackyardError, PackyardResult};
use crate::orchestration::{CommandOutput, SandboxProvider, Workspace};
use crate::upstream::UpstreamHost;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DEMO_ZIP: &[u8] = b"PK\x03\x04demo-archive";

const HEAD_REVISION: &str = "0123456789abcdef0123456789abcdef01234567";
const PACKAGES_ROOT: &str = "/home/app/repo/packages";

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Upstream host with fixed tags and packages, counting every call
pub struct FakeUpstream {
    tags: Mutex<Vec<String>>,
    packages: Vec<String>,
    fail_status: Mutex<Option<u16>>,
    tag_calls: AtomicUsize,
    package_calls: AtomicUsize,
    head_calls: AtomicUsize,
}

impl FakeUpstream {
    /// Every tag and the head revision contain the same packages
    pub fn new(tags: &[&str], packages: &[&str]) -> Self {
        Self {
            tags: Mutex::new(strings(tags)),
            packages: strings(packages),
            fail_status: Mutex::new(None),
            tag_calls: AtomicUsize::new(0),
            package_calls: AtomicUsize::new(0),
            head_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_tags(&self, tags: &[&str]) {
        *self.tags.lock().unwrap() = strings(tags);
    }

    /// Make every following call fail with an HTTP status
    pub fn fail_with_status(&self, status: u16) {
        *self.fail_status.lock().unwrap() = Some(status);
    }

    pub fn head(&self) -> String {
        HEAD_REVISION.to_string()
    }

    pub fn tag_calls(&self) -> usize {
        self.tag_calls.load(Ordering::SeqCst)
    }

    pub fn package_calls(&self) -> usize {
        self.package_calls.load(Ordering::SeqCst)
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    fn check(&self, path: &str) -> PackyardResult<()> {
        match *self.fail_status.lock().unwrap() {
            Some(status) => Err(PackyardError::UpstreamStatus {
                url: format!("https://api.github.com/repos/lucsoft/cluster/{}", path),
                status,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl UpstreamHost for FakeUpstream {
    async fn list_tags(&self) -> PackyardResult<Vec<String>> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        self.check("tags")?;
        Ok(self.tags.lock().unwrap().clone())
    }

    async fn list_package_dirs(&self, revision: &str) -> PackyardResult<Vec<String>> {
        self.package_calls.fetch_add(1, Ordering::SeqCst);
        self.check("contents/packages")?;

        let known = revision == HEAD_REVISION
            || self.tags.lock().unwrap().iter().any(|t| t == revision);
        if known {
            Ok(self.packages.clone())
        } else {
            Err(PackyardError::VersionNotFound(revision.to_string()))
        }
    }

    async fn head_revision(&self) -> PackyardResult<String> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        self.check("commits")?;
        Ok(self.head())
    }
}

/// What the packaging tool prints and produces for one package
#[derive(Clone, Default)]
struct FakePackage {
    output: String,
    files: HashMap<String, Vec<u8>>,
}

#[derive(Default)]
struct SandboxState {
    packages: HashMap<String, FakePackage>,
    failing_step: Option<String>,
    delay: Option<Duration>,
    destroy_delay: Option<Duration>,
    failing_destroys: AtomicUsize,
    scripts: Mutex<Vec<String>>,
    created: AtomicUsize,
    live: AtomicUsize,
    package_runs: AtomicUsize,
}

/// Sandbox whose workspaces answer the build scripts from memory
#[derive(Clone, Default)]
pub struct FakeSandbox {
    state: Arc<SandboxState>,
}

impl FakeSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sandbox that knows one package, `demo`, producing one zip
    pub fn demo() -> Self {
        Self::new().with_package(
            "demo",
            ".out/demo/demo-v1.2.0.zip\n",
            &[(".out/demo/demo-v1.2.0.zip", DEMO_ZIP)],
        )
    }

    /// Register a package: its tool output and files relative to its directory
    pub fn with_package(self, name: &str, output: &str, files: &[(&str, &[u8])]) -> Self {
        let package = FakePackage {
            output: output.to_string(),
            files: files
                .iter()
                .map(|(rel, data)| (format!("{}/{}/{}", PACKAGES_ROOT, name, rel), data.to_vec()))
                .collect(),
        };
        self.configure(|state| {
            state.packages.insert(name.to_string(), package);
        })
    }

    /// Scripts containing `marker` exit with code 1
    pub fn failing_step(self, marker: &str) -> Self {
        self.configure(|state| state.failing_step = Some(marker.to_string()))
    }

    /// Delay the packaging step
    pub fn with_delay(self, delay: Duration) -> Self {
        self.configure(|state| state.delay = Some(delay))
    }

    /// Delay every teardown
    pub fn with_destroy_delay(self, delay: Duration) -> Self {
        self.configure(|state| state.destroy_delay = Some(delay))
    }

    /// The next `count` teardowns fail without destroying anything
    pub fn failing_destroys(self, count: usize) -> Self {
        self.configure(|state| state.failing_destroys = AtomicUsize::new(count))
    }

    fn configure(self, apply: impl FnOnce(&mut SandboxState)) -> Self {
        let mut state = Arc::try_unwrap(self.state).unwrap_or_else(|_| {
            panic!("configure the fake sandbox before sharing it");
        });
        apply(&mut state);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn workspaces_created(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }

    pub fn live_workspaces(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    /// Number of packaging tool runs across all workspaces
    pub fn package_runs(&self) -> usize {
        self.state.package_runs.load(Ordering::SeqCst)
    }

    /// Every script run so far, in order
    pub fn scripts(&self) -> Vec<String> {
        self.state.scripts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SandboxProvider for FakeSandbox {
    async fn ensure_ready(&self) -> PackyardResult<()> {
        Ok(())
    }

    async fn create(&self) -> PackyardResult<Arc<dyn Workspace>> {
        let n = self.state.created.fetch_add(1, Ordering::SeqCst);
        self.state.live.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeWorkspace {
            id: format!("fake-{}", n),
            state: Arc::clone(&self.state),
            destroyed: Mutex::new(false),
        }))
    }

    fn runtime_name(&self) -> &'static str {
        "Fake"
    }
}

struct FakeWorkspace {
    id: String,
    state: Arc<SandboxState>,
    destroyed: Mutex<bool>,
}

impl FakeWorkspace {
    fn exit(code: i32, stdout: &str) -> CommandOutput {
        CommandOutput {
            code,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }
}

#[async_trait]
impl Workspace for FakeWorkspace {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, script: &str, cwd: &str) -> PackyardResult<CommandOutput> {
        self.state.scripts.lock().unwrap().push(script.to_string());

        if let Some(marker) = &self.state.failing_step {
            if script.contains(marker.as_str()) {
                return Ok(CommandOutput {
                    code: 1,
                    stdout: String::new(),
                    stderr: format!("{} failed", marker),
                });
            }
        }

        if script.starts_with("test -d") {
            let dir = script.trim_start_matches("test -d").trim().trim_matches('\'');
            let name = dir.rsplit('/').next().unwrap_or_default();
            let code = if self.state.packages.contains_key(name) { 0 } else { 1 };
            return Ok(Self::exit(code, ""));
        }

        if script.contains("project") {
            self.state.package_runs.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.state.delay {
                tokio::time::sleep(delay).await;
            }
            let name = cwd.rsplit('/').next().unwrap_or_default();
            return Ok(match self.state.packages.get(name) {
                Some(package) => Self::exit(0, &package.output),
                None => Self::exit(1, ""),
            });
        }

        if script.contains("--version") {
            return Ok(Self::exit(0, "Pkl 0.30.2 (Linux, fake)\n"));
        }

        Ok(Self::exit(0, ""))
    }

    async fn read_file(&self, path: &str) -> PackyardResult<Vec<u8>> {
        self.state
            .packages
            .values()
            .find_map(|p| p.files.get(path).cloned())
            .ok_or_else(|| PackyardError::WorkspaceRead {
                path: path.to_string(),
                reason: "No such file or directory".to_string(),
            })
    }

    async fn destroy(&self) -> PackyardResult<()> {
        if let Some(delay) = self.state.destroy_delay {
            tokio::time::sleep(delay).await;
        }

        let failing = &self.state.failing_destroys;
        if failing
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(PackyardError::Internal(format!("{} is busy", self.id)));
        }

        let mut destroyed = self.destroyed.lock().unwrap();
        if !*destroyed {
            *destroyed = true;
            self.state.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

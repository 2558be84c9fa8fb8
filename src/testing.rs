//! Scripted collaborators for unit tests
//!
//! `ScriptedRunner` stands in for every external tool. It records each
//! invocation and reproduces the filesystem effects the pipeline relies on:
//! a clone creates the version markers, ninja creates the library, zip
//! creates the archive, unzip creates the NDK directory named inside the
//! archive.

use crate::context::BuildContext;
use crate::error::{BuilderError, BuilderResult};
use crate::fetch::Fetcher;
use crate::process::{CommandOutput, CommandRunner, Invocation};
use crate::workdir::SourceRevision;
use async_trait::async_trait;
use semver::Version;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const HEAD: &str = "0123456789abcdef0123456789abcdef01234567";

pub const VULKAN_HEADER_FIXTURE: &str = "\
// Version of this file
#define VK_HEADER_VERSION 303

// Complete version of this file
#define VK_HEADER_VERSION_COMPLETE VK_MAKE_API_VERSION(0, 1, 4, VK_HEADER_VERSION)
";

const NDK_ROOT_MARKER: &str = "ndk-root:";

/// Archive body whose simulated extraction creates `root`; any other body
/// extracts to the directory named by the archive file
pub fn ndk_archive(root: &str) -> String {
    format!("{} {}\n", NDK_ROOT_MARKER, root)
}

const ARTIFACT: &str = "src/freedreno/vulkan/libvulkan_freedreno.so";

pub fn sample_revision() -> SourceRevision {
    SourceRevision {
        commit: HEAD.to_string(),
        commit_short: HEAD[..7].to_string(),
        version: "25.1.0-devel".to_string(),
        vulkan: Version::new(1, 4, 303),
    }
}

pub fn sample_context(workdir: impl Into<PathBuf>, patched: bool) -> BuildContext {
    if patched {
        let patch = "sample;merge_requests/1;".parse().expect("valid descriptor");
        BuildContext::patched(sample_revision(), workdir, vec![patch])
    } else {
        BuildContext::unpatched(sample_revision(), workdir)
    }
}

pub struct ScriptedRunner {
    calls: Mutex<Vec<Invocation>>,
    missing: Vec<String>,
    failing: Vec<String>,
    head: Mutex<String>,
    upstream: Mutex<Option<String>>,
    artifact: Option<PathBuf>,
    produce_archive: bool,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(vec![]),
            missing: vec![],
            failing: vec![],
            head: Mutex::new(HEAD.to_string()),
            upstream: Mutex::new(None),
            artifact: Some(PathBuf::from(ARTIFACT)),
            produce_archive: true,
        }
    }

    /// Tools that probe as not installed
    pub fn without_tools(mut self, tools: &[&str]) -> Self {
        self.missing.extend(tools.iter().map(|t| t.to_string()));
        self
    }

    /// Every invocation of `program` exits with code 1
    pub fn failing(mut self, program: &str) -> Self {
        self.failing.push(program.to_string());
        self
    }

    /// ninja succeeds without producing the library
    pub fn without_artifact(mut self) -> Self {
        self.artifact = None;
        self
    }

    /// zip succeeds without producing the archive
    pub fn without_archive(mut self) -> Self {
        self.produce_archive = false;
        self
    }

    /// Make the next `git fetch` see a new upstream commit
    pub fn set_upstream(&self, commit: &str) {
        *self.upstream.lock().unwrap() = Some(commit.to_string());
    }

    pub fn head(&self) -> String {
        self.head.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }

    fn git(&self, inv: &Invocation) -> String {
        match inv.subcommand() {
            Some("clone") => {
                let checkout = resolve(inv, inv.args.last().expect("clone target"));
                let header = checkout.join("include/vulkan/vulkan_core.h");
                std::fs::create_dir_all(header.parent().unwrap()).unwrap();
                std::fs::write(checkout.join("VERSION"), "25.1.0-devel\n").unwrap();
                std::fs::write(header, VULKAN_HEADER_FIXTURE).unwrap();
                String::new()
            }
            Some("rev-parse") => {
                let head = self.head();
                match inv.args.get(1).map(String::as_str) {
                    Some("--short") => head[..7].to_string(),
                    Some("FETCH_HEAD") => self.upstream.lock().unwrap().clone().unwrap_or(head),
                    _ => head,
                }
            }
            Some("merge") => {
                if let Some(upstream) = self.upstream.lock().unwrap().clone() {
                    *self.head.lock().unwrap() = upstream;
                }
                String::new()
            }
            _ => String::new(),
        }
    }

    fn simulate(&self, inv: &Invocation) -> String {
        match inv.program.as_str() {
            "git" => return self.git(inv),
            "ninja" => {
                if let Some(ref artifact) = self.artifact {
                    let lib = resolve(inv, &inv.args[1]).join(artifact);
                    std::fs::create_dir_all(lib.parent().unwrap()).unwrap();
                    std::fs::write(lib, b"\x7fELF").unwrap();
                }
            }
            "zip" if self.produce_archive => {
                std::fs::write(resolve(inv, &inv.args[1]), b"PK\x03\x04").unwrap();
            }
            "unzip" => {
                let archive = inv.args.iter().find(|a| a.ends_with(".zip")).unwrap();
                let dest = inv
                    .args
                    .iter()
                    .position(|a| a == "-d")
                    .map(|i| resolve(inv, &inv.args[i + 1]))
                    .unwrap();
                let contents = std::fs::read_to_string(resolve(inv, archive)).unwrap_or_default();
                let root = match contents.strip_prefix(NDK_ROOT_MARKER) {
                    Some(root) => root.trim().to_string(),
                    None => {
                        let name = Path::new(archive).file_name().unwrap().to_string_lossy();
                        name.trim_end_matches("-linux.zip").to_string()
                    }
                };
                std::fs::create_dir_all(dest.join(root)).unwrap();
            }
            _ => {}
        }
        String::new()
    }
}

fn resolve(inv: &Invocation, arg: &str) -> PathBuf {
    match inv.cwd {
        Some(ref cwd) => cwd.join(arg),
        None => PathBuf::from(arg),
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> BuilderResult<CommandOutput> {
        self.calls.lock().unwrap().push(invocation.clone());

        if self.failing.contains(&invocation.program) {
            return Ok(CommandOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: format!("{}: scripted failure", invocation.program),
            });
        }

        let stdout = self.simulate(invocation);
        if let Some(ref log) = invocation.log {
            std::fs::write(log, &stdout).unwrap();
        }
        Ok(CommandOutput {
            code: Some(0),
            stdout,
            stderr: String::new(),
        })
    }

    async fn probe(&self, tool: &str) -> bool {
        !self.missing.iter().any(|m| m == tool)
    }
}

/// Fetcher that writes a placeholder file instead of downloading
pub struct RecordingFetcher {
    requests: Mutex<Vec<(String, u32)>>,
    fail: bool,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(vec![]),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            requests: Mutex::new(vec![]),
            fail: true,
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
    }

    pub fn attempts(&self) -> Vec<u32> {
        self.requests.lock().unwrap().iter().map(|(_, a)| *a).collect()
    }
}

#[async_trait]
impl Fetcher for RecordingFetcher {
    async fn fetch(&self, url: &str, dest: &Path, attempts: u32) -> BuilderResult<u64> {
        self.requests.lock().unwrap().push((url.to_string(), attempts));
        if self.fail {
            return Err(BuilderError::Download {
                url: url.to_string(),
                attempts,
                reason: "connection refused".to_string(),
            });
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let body = format!("downloaded from {}\n", url);
        std::fs::write(dest, &body).unwrap();
        Ok(body.len() as u64)
    }
}

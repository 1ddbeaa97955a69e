use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::builtins::map_builtin;
use crate::error::BridgeError;
use crate::executor::{CommandPolicy, Executor};
use crate::platform::{clean, Platform};

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AutocompleteRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ExecuteResponse {
    pub output: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_cwd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl ExecuteResponse {
    fn ok(output: String, error: String, cwd: &Path) -> Self {
        ExecuteResponse { output, error, new_cwd: Some(path_string(cwd)), exit_code: None }
    }

    pub fn from_error(e: &BridgeError, cwd: Option<&Path>) -> Self {
        let new_cwd = if e.before_cwd() { None } else { cwd.map(path_string) };
        ExecuteResponse { output: String::new(), error: e.to_string(), new_cwd, exit_code: None }
    }
}

/// Request handling shared by every server thread. Holds no per-request state.
#[derive(Debug, Clone)]
pub struct Bridge {
    platform: Platform,
    executor: Executor,
    policy: CommandPolicy,
}

impl Bridge {
    pub fn new(platform: Platform, executor: Executor, policy: CommandPolicy) -> Self {
        Bridge { platform, executor, policy }
    }

    fn resolve_cwd(&self, cwd: Option<&str>) -> PathBuf {
        match cwd {
            Some(raw) => self.platform.normalize(raw),
            None => self.platform.normalize("~"),
        }
    }

    /// Returns the HTTP status alongside the body.
    pub fn execute(&self, req: ExecuteRequest) -> (u16, ExecuteResponse) {
        let command = match req.command.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => return reply_err(BridgeError::MissingCommand, None),
        };
        let cwd = self.resolve_cwd(req.cwd.as_deref());
        match self.dispatch(command, &cwd) {
            Ok(resp) => (200, resp),
            Err(e) => {
                if let BridgeError::Unexpected(ref io) = e { error!("execute {:?} in {}: {:?}", command, cwd.display(), io); }
                reply_err(e, Some(&cwd))
            }
        }
    }

    fn dispatch(&self, command: &str, cwd: &Path) -> Result<ExecuteResponse, BridgeError> {
        let trimmed = command.trim();
        if let Some(target) = trimmed.strip_prefix("cd ") {
            let new_cwd = self.change_dir(target.trim_start(), cwd)?;
            return Ok(ExecuteResponse::ok(String::new(), String::new(), &new_cwd));
        }
        if let Some(result) = map_builtin(command, cwd) {
            return Ok(ExecuteResponse::ok(result?, String::new(), cwd));
        }
        self.policy.check(trimmed)?;
        debug!("shell: {:?} in {}", command, cwd.display());
        let out = self.executor.run(command, cwd)?;
        Ok(ExecuteResponse { exit_code: out.exit_code, ..ExecuteResponse::ok(out.stdout, out.stderr, cwd) })
    }

    // Only validates; the client carries the resulting directory into its next request.
    fn change_dir(&self, target: &str, cwd: &Path) -> Result<PathBuf, BridgeError> {
        let path = self.platform.expand_home(target);
        let path = if path.is_absolute() { path } else { cwd.join(path) };
        if path.is_dir() {
            Ok(clean(&path))
        } else {
            Err(BridgeError::Navigation(path_string(&path)))
        }
    }

    pub fn autocomplete(&self, req: AutocompleteRequest) -> Vec<String> {
        let text = req.text.unwrap_or_default();
        if text.is_empty() {
            return Vec::new();
        }
        let cwd = self.resolve_cwd(req.cwd.as_deref());
        let token = text.rsplit(char::is_whitespace).next().unwrap_or("");

        let (dir, prefix) = self.split_token(token, &cwd);
        let prefix = prefix.as_str();

        let entries = match fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) => { debug!("autocomplete: cannot read {}: {}", dir.display(), e); return Vec::new(); }
        };
        let show_hidden = prefix.starts_with('.');
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !name.starts_with(prefix) || (name.starts_with('.') && !show_hidden) {
                    return None;
                }
                if entry.path().is_dir() {
                    Some(format!("{}{}", name, self.platform.separator()))
                } else {
                    Some(name)
                }
            })
            .collect()
    }

    // Split a typed token into the directory to list and the name prefix to match.
    fn split_token(&self, token: &str, cwd: &Path) -> (PathBuf, String) {
        let is_sep = |c: char| self.platform.is_separator(c);
        if token.is_empty() || token.ends_with(is_sep) {
            return (self.search_base(token, cwd), String::new());
        }
        if token.starts_with('~') && !token.contains(is_sep) {
            // `~` or `~user`: complete the expanded home path itself
            let expanded = self.platform.expand_home(token);
            if let (Some(parent), Some(name)) = (expanded.parent(), expanded.file_name()) {
                if expanded.is_absolute() {
                    return (parent.to_path_buf(), name.to_string_lossy().into_owned());
                }
            }
        }
        match token.rfind(is_sep) {
            Some(i) => (self.search_base(&token[..=i], cwd), token[i + 1..].to_string()),
            None => (cwd.to_path_buf(), token.to_string()),
        }
    }

    // Directory that a typed token (without its trailing partial name) refers to.
    fn search_base(&self, head: &str, cwd: &Path) -> PathBuf {
        if head.is_empty() {
            return cwd.to_path_buf();
        }
        let p = self.platform.expand_home(head);
        if p.is_absolute() { p } else { cwd.join(p) }
    }
}

fn reply_err(e: BridgeError, cwd: Option<&Path>) -> (u16, ExecuteResponse) {
    (e.status(), ExecuteResponse::from_error(&e, cwd))
}

fn path_string(p: &Path) -> String { p.to_string_lossy().into_owned() }

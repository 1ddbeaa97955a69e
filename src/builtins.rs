use std::fs;
use std::path::Path;

use crate::error::BridgeError;

// Commands answered in-process; none of them spawn or block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin<'a> { Pwd, Ls, Echo(&'a str) }

impl<'a> Builtin<'a> {
    pub fn parse(cmd: &'a str) -> Option<Self> {
        let cmd = cmd.trim();
        match cmd {
            "pwd" => Some(Builtin::Pwd),
            "ls" => Some(Builtin::Ls),
            _ => cmd.strip_prefix("echo ").map(Builtin::Echo),
        }
    }

    pub fn run(self, cwd: &Path) -> Result<String, BridgeError> {
        match self {
            Builtin::Pwd => Ok(format!("{}\n", cwd.display())),
            Builtin::Echo(text) => Ok(format!("{}\n", text)),
            Builtin::Ls => {
                let entries = fs::read_dir(cwd)
                    .map_err(|e| BridgeError::Builtin(format!("ls: {}: {}", cwd.display(), e)))?;
                let mut out = String::new();
                for entry in entries {
                    let entry = entry.map_err(|e| BridgeError::Builtin(format!("ls: {}: {}", cwd.display(), e)))?;
                    out.push_str(&entry.file_name().to_string_lossy());
                    out.push('\n');
                }
                if out.is_empty() { out.push('\n'); }
                Ok(out)
            }
        }
    }
}

/// `None` means "not a builtin": the caller falls through to the shell.
pub fn map_builtin(cmd: &str, cwd: &Path) -> Option<Result<String, BridgeError>> {
    Builtin::parse(cmd).map(|b| b.run(cwd))
}

use std::env;
use std::path::{Component, Path, PathBuf};

/// Host conventions, picked once at startup and handed to everything that
/// touches paths or spawns the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform { Unix, Windows }

impl Platform {
    pub fn detect() -> Self { if cfg!(windows) { Platform::Windows } else { Platform::Unix } }

    pub fn separator(self) -> char { match self { Platform::Unix => '/', Platform::Windows => '\\' } }

    pub fn is_separator(self, c: char) -> bool {
        match self { Platform::Unix => c == '/', Platform::Windows => c == '/' || c == '\\' }
    }

    /// Shell program and the flag that makes it run a single command string.
    pub fn shell(self) -> (&'static str, &'static str) {
        match self { Platform::Unix => ("/bin/sh", "-c"), Platform::Windows => ("cmd", "/C") }
    }

    pub fn home_dir(self) -> Option<PathBuf> { dirs::home_dir() }

    /// `~` and `~user` prefixes become the matching home directory. Anything
    /// that cannot be resolved is returned untouched.
    pub fn expand_home(self, raw: &str) -> PathBuf {
        let Some(rest) = raw.strip_prefix('~') else { return PathBuf::from(raw) };
        let (user, tail) = match rest.find(|c: char| self.is_separator(c)) {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };
        let home = if user.is_empty() { self.home_dir() } else { user_home(user) };
        match home {
            Some(h) if tail.is_empty() => h,
            Some(h) => h.join(tail),
            None => PathBuf::from(raw),
        }
    }

    /// Home-expand, anchor relative paths at the process working directory,
    /// then fold `.`/`..` lexically. The path does not need to exist.
    pub fn normalize(self, raw: &str) -> PathBuf {
        let p = self.expand_home(raw);
        let p = if p.is_absolute() { p } else { env::current_dir().map(|d| d.join(&p)).unwrap_or(p) };
        clean(&p)
    }
}

pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => { out.pop(); }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() { out.push("."); }
    out
}

// `~user` needs the password database; `dirs` only knows the current user.
#[cfg(unix)]
fn user_home(name: &str) -> Option<PathBuf> {
    nix::unistd::User::from_name(name).ok().flatten().map(|u| u.dir)
}

#[cfg(not(unix))]
fn user_home(_name: &str) -> Option<PathBuf> { None }

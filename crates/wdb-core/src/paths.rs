//! # Path Translation
//!
//! The controller speaks OS-native paths (`C:\dir\file.exe`) to the kernel but
//! reports paths to its consumer in the host shell's convention. The
//! translation itself is a collaborator behind [`PathTranslator`]; the
//! controller uses it only for the executable path, module paths and the
//! `PATH` environment variable.
//!
//! Two translators are provided:
//!
//! - [`NativePaths`]: identity, for consumers that already use Windows paths
//! - [`MsysPaths`]: POSIX-style shells (MSYS2, Cygwin, Git Bash), where
//!   `/c/dir` and `/cygdrive/c/dir` name `C:\dir` and path lists use `:`

/// Conversion between host and OS-native path conventions.
pub trait PathTranslator
{
    /// Native path to host convention.
    fn to_host_path(&self, native: &str) -> String;

    /// Host path to native convention.
    fn to_native_path(&self, host: &str) -> String;

    /// Whether `list` is a path list in host convention (and so needs
    /// converting before the OS loader sees it).
    fn is_host_path_list(&self, list: &str) -> bool;

    /// Host path list to native path list.
    fn to_native_path_list(&self, list: &str) -> String;

    /// Native path list to host path list.
    fn to_host_path_list(&self, list: &str) -> String;
}

/// Identity translation: host paths are native paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePaths;

impl PathTranslator for NativePaths
{
    fn to_host_path(&self, native: &str) -> String
    {
        native.to_string()
    }

    fn to_native_path(&self, host: &str) -> String
    {
        host.to_string()
    }

    fn is_host_path_list(&self, _list: &str) -> bool
    {
        false
    }

    fn to_native_path_list(&self, list: &str) -> String
    {
        list.to_string()
    }

    fn to_host_path_list(&self, list: &str) -> String
    {
        list.to_string()
    }
}

/// POSIX-shell path convention on Windows
///
/// ## Example
///
/// ```rust
/// use wdb_core::paths::{MsysPaths, PathTranslator};
///
/// let paths = MsysPaths::default();
/// assert_eq!(paths.to_native_path("/c/Windows/notepad.exe"), r"C:\Windows\notepad.exe");
/// assert_eq!(paths.to_host_path(r"C:\Windows\notepad.exe"), "/c/Windows/notepad.exe");
/// assert_eq!(paths.to_native_path_list("/c/bin:/d/tools"), r"C:\bin;D:\tools");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MsysPaths
{
    root: Option<String>,
}

impl MsysPaths
{
    /// Translator whose `/` maps to the native directory `root`
    /// (for example `C:\msys64`). Without a root, other absolute POSIX paths
    /// are only re-slashed.
    pub fn with_root(root: impl Into<String>) -> Self
    {
        let root = root.into().trim_end_matches(['\\', '/']).to_string();
        Self { root: Some(root) }
    }

    fn drive_prefix(path: &str) -> Option<(char, &str)>
    {
        let rest = path.strip_prefix("/cygdrive").unwrap_or(path);
        let mut chars = rest.chars();
        if chars.next() != Some('/') {
            return None;
        }
        let drive = chars.next().filter(char::is_ascii_alphabetic)?;
        let tail = &rest[2..];
        if tail.is_empty() || tail.starts_with('/') {
            Some((drive, tail))
        } else {
            None
        }
    }
}

fn has_drive(path: &str) -> bool
{
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl PathTranslator for MsysPaths
{
    fn to_host_path(&self, native: &str) -> String
    {
        if let Some(root) = &self.root {
            if let Some(prefix) = native.get(..root.len()).filter(|prefix| prefix.eq_ignore_ascii_case(root)) {
                let rest = &native[prefix.len()..];
                if rest.is_empty() || rest.starts_with(['\\', '/']) {
                    let rest = rest.replace('\\', "/");
                    return if rest.is_empty() { "/".to_string() } else { rest };
                }
            }
        }
        if has_drive(native) {
            let drive = native[..1].to_ascii_lowercase();
            let rest = native[2..].replace('\\', "/");
            let rest = rest.trim_start_matches('/');
            return if rest.is_empty() {
                format!("/{drive}")
            } else {
                format!("/{drive}/{rest}")
            };
        }
        native.replace('\\', "/")
    }

    fn to_native_path(&self, host: &str) -> String
    {
        if has_drive(host) {
            return host.replace('/', "\\");
        }
        if let Some((drive, tail)) = Self::drive_prefix(host) {
            let tail = tail.trim_start_matches('/').replace('/', "\\");
            return format!("{}:\\{tail}", drive.to_ascii_uppercase());
        }
        match (&self.root, host.starts_with('/')) {
            (Some(root), true) => format!("{root}{}", host.replace('/', "\\")),
            _ => host.replace('/', "\\"),
        }
    }

    fn is_host_path_list(&self, list: &str) -> bool
    {
        !list.contains(';') && !has_drive(list)
    }

    fn to_native_path_list(&self, list: &str) -> String
    {
        list.split(':')
            .filter(|entry| !entry.is_empty())
            .map(|entry| self.to_native_path(entry))
            .collect::<Vec<_>>()
            .join(";")
    }

    fn to_host_path_list(&self, list: &str) -> String
    {
        list.split(';')
            .filter(|entry| !entry.is_empty())
            .map(|entry| self.to_host_path(entry))
            .collect::<Vec<_>>()
            .join(":")
    }
}

/// Last path component, splitting on either `\` or `/`
///
/// A name with no separator is its own base name.
pub fn basename(path: &str) -> &str
{
    match path.rfind(['\\', '/']) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_native_paths_identity()
    {
        let paths = NativePaths;
        assert_eq!(paths.to_native_path(r"C:\a\b.exe"), r"C:\a\b.exe");
        assert_eq!(paths.to_host_path(r"C:\a\b.exe"), r"C:\a\b.exe");
        assert!(!paths.is_host_path_list(r"C:\bin;C:\tools"));
    }

    #[test]
    fn test_msys_drive_paths()
    {
        let paths = MsysPaths::default();
        assert_eq!(paths.to_native_path("/c/Program Files/app.exe"), r"C:\Program Files\app.exe");
        assert_eq!(paths.to_native_path("/cygdrive/d/src/main.exe"), r"D:\src\main.exe");
        assert_eq!(paths.to_native_path("/c"), r"C:\");
        assert_eq!(paths.to_native_path("C:/already/native"), r"C:\already\native");
        assert_eq!(paths.to_host_path(r"D:\src\main.exe"), "/d/src/main.exe");
        assert_eq!(paths.to_host_path(r"C:\"), "/c");
    }

    #[test]
    fn test_msys_relative_and_rooted_paths()
    {
        let paths = MsysPaths::default();
        assert_eq!(paths.to_native_path("build/app.exe"), r"build\app.exe");
        assert_eq!(paths.to_native_path("/usr/bin/ls.exe"), r"\usr\bin\ls.exe");

        let rooted = MsysPaths::with_root(r"C:\msys64\");
        assert_eq!(rooted.to_native_path("/usr/bin/ls.exe"), r"C:\msys64\usr\bin\ls.exe");
        assert_eq!(rooted.to_host_path(r"C:\msys64\usr\bin\ls.exe"), "/usr/bin/ls.exe");
        assert_eq!(rooted.to_host_path(r"c:\MSYS64"), "/");
        assert_eq!(rooted.to_host_path(r"C:\msys64x\file"), "/c/msys64x/file");
    }

    #[test]
    fn test_msys_path_lists()
    {
        let paths = MsysPaths::default();
        assert!(paths.is_host_path_list("/c/bin:/usr/bin"));
        assert!(!paths.is_host_path_list(r"C:\bin;C:\tools"));
        assert!(!paths.is_host_path_list(r"C:\bin"));
        assert_eq!(paths.to_native_path_list("/c/bin:/d/tools:"), r"C:\bin;D:\tools");
        assert_eq!(paths.to_host_path_list(r"C:\bin;D:\tools"), "/c/bin:/d/tools");
    }

    #[test]
    fn test_basename()
    {
        assert_eq!(basename(r"C:\Windows\System32\kernel32.dll"), "kernel32.dll");
        assert_eq!(basename("/c/Windows/System32/kernel32.dll"), "kernel32.dll");
        assert_eq!(basename(r"C:\mixed/dir\user32.dll"), "user32.dll");
        assert_eq!(basename("ntdll.dll"), "ntdll.dll");
    }
}

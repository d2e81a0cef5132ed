//! Command line and environment construction for launched targets.
//!
//! The command line is the native executable path, one space, then the
//! argument string exactly as given. Nothing is quoted or escaped, so callers
//! pass pre-quoted arguments.
//!
//! The environment is passed through unchanged except `PATH`: the OS loader
//! resolves DLL dependencies with it, so a host-convention path list is
//! converted to the native convention first.

use crate::paths::PathTranslator;

/// Build the `CreateProcess` command line.
///
/// ```rust
/// use wdb_core::launch::build_command_line;
///
/// assert_eq!(build_command_line(r"C:\bin\app.exe", "-v \"a b\""), r#"C:\bin\app.exe -v "a b""#);
/// ```
pub fn build_command_line(native_program: &str, args: &str) -> String
{
    let mut command_line = String::with_capacity(native_program.len() + args.len() + 1);
    command_line.push_str(native_program);
    command_line.push(' ');
    command_line.push_str(args);
    command_line
}

/// Build the `NAME=value` list handed to the OS
///
/// Entries with an empty name are dropped. `PATH` is matched
/// case-insensitively, as Windows environment names are.
pub fn build_environment(env: &[(String, String)], paths: &dyn PathTranslator) -> Vec<String>
{
    env.iter()
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| {
            if name.eq_ignore_ascii_case("PATH") && paths.is_host_path_list(value) {
                format!("{name}={}", paths.to_native_path_list(value))
            } else {
                format!("{name}={value}")
            }
        })
        .collect()
}

/// Encode `s` as NUL-terminated UTF-16.
pub fn to_wide(s: &str) -> Vec<u16>
{
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Encode an environment list as a Unicode environment block: each entry
/// NUL-terminated, the block terminated by one more NUL.
pub fn encode_environment_block(entries: &[String]) -> Vec<u16>
{
    let mut block: Vec<u16> = entries.iter().flat_map(|entry| to_wide(entry)).collect();
    if block.is_empty() {
        block.push(0);
    }
    block.push(0);
    block
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::paths::{MsysPaths, NativePaths};

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)>
    {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_command_line_is_verbatim()
    {
        assert_eq!(build_command_line(r"C:\a.exe", ""), r"C:\a.exe ");
        assert_eq!(build_command_line(r"C:\a.exe", "x  y\tz"), "C:\\a.exe x  y\tz");
    }

    #[test]
    fn test_environment_converts_only_path()
    {
        let paths = MsysPaths::default();
        let vars = env(&[("HOME", "/home/me"), ("Path", "/c/bin:/d/tools"), ("TMP", "/tmp")]);
        let block = build_environment(&vars, &paths);
        assert_eq!(block, vec!["HOME=/home/me", r"Path=C:\bin;D:\tools", "TMP=/tmp"]);
    }

    #[test]
    fn test_environment_keeps_native_path_list()
    {
        let paths = MsysPaths::default();
        let vars = env(&[("PATH", r"C:\bin;C:\tools")]);
        assert_eq!(build_environment(&vars, &paths), vec![r"PATH=C:\bin;C:\tools"]);
        assert_eq!(build_environment(&vars, &NativePaths), vec![r"PATH=C:\bin;C:\tools"]);
    }

    #[test]
    fn test_environment_drops_unnamed_entries()
    {
        let vars = env(&[("", "orphan"), ("A", "1")]);
        assert_eq!(build_environment(&vars, &NativePaths), vec!["A=1"]);
    }

    #[test]
    fn test_environment_block_encoding()
    {
        let block = encode_environment_block(&["A=1".to_string(), "B=2".to_string()]);
        let expected: Vec<u16> = "A=1\0B=2\0\0".encode_utf16().collect();
        assert_eq!(block, expected);
        assert_eq!(encode_environment_block(&[]), vec![0, 0]);
    }
}

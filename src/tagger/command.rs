use std::ffi::{OsStr, OsString};
use std::path::Path;

/// Field/value pairs written to every file, in argument order.
pub const TAG_SET: [(&str, &str); 3] = [
    ("Make", "Meta"),
    ("Model", "Ray-Ban Meta Smart Glasses"),
    ("Software", "Meta View App"),
];

/// Makes the tool rewrite the file in place instead of writing a copy.
pub const OVERWRITE_FLAG: &str = "-overwrite_original";

/// A fully built tool invocation: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl Invocation {
    /// The complete argument vector, program first.
    pub fn argv(&self) -> Vec<&OsStr> {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .collect()
    }

    /// Space-joined rendering for log lines.
    pub fn display(&self) -> String {
        self.argv()
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `-<Field>=<Value>` flag for one tag.
pub fn tag_flag(field: &str, value: &str) -> String {
    format!("-{field}={value}")
}

/// Build the tool command for `path`:
/// tool, tag flags, overwrite flag, `extra_args` verbatim, then the path.
pub fn build_command<S: AsRef<OsStr>>(path: &Path, tool: &Path, extra_args: &[S]) -> Invocation {
    let mut args: Vec<OsString> = TAG_SET
        .iter()
        .map(|(field, value)| tag_flag(field, value).into())
        .collect();
    args.push(OVERWRITE_FLAG.into());
    args.extend(extra_args.iter().map(|a| a.as_ref().to_os_string()));
    args.push(path.as_os_str().to_os_string());

    Invocation {
        program: tool.as_os_str().to_os_string(),
        args,
    }
}

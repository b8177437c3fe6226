use std::ffi::{CStr, CString};
use thiserror::Error;

/// Failure of a single path application. Never aborts a batch; it is recorded
/// and the run moves on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct PathError {
    /// Raw errno-like code from the primitive, absent for pre-call failures
    /// such as a path that cannot be encoded as a C string.
    pub code: Option<i32>,
    pub reason: String,
}

/// Capability seam over the opaque native primitive: one synchronous attempt
/// to modify one absolute filesystem path. 0 means success, anything else is
/// an errno-like failure code.
pub trait PathApplier: Send + Sync {
    fn apply(&self, path: &CStr) -> i32;
}

#[cfg(feature = "exploit")]
mod ffi {
    use std::os::raw::{c_char, c_int};

    #[link(name = "poc")]
    extern "C" {
        pub fn poc(path: *const c_char) -> c_int;
    }
}

/// The real primitive. Builds without the `exploit` feature keep the type and
/// the call path but report ENOSYS, so the rest of the app stays exercisable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExploitApplier;

impl PathApplier for ExploitApplier {
    #[cfg(feature = "exploit")]
    fn apply(&self, path: &CStr) -> i32 {
        unsafe { ffi::poc(path.as_ptr()) }
    }

    #[cfg(not(feature = "exploit"))]
    fn apply(&self, path: &CStr) -> i32 {
        let _ = path;
        libc::ENOSYS
    }
}

/// Runs the primitive once for `path` and interprets its result.
pub fn run_path(applier: &dyn PathApplier, path: &str) -> Result<(), PathError> {
    let c_path = CString::new(path).map_err(|_| PathError {
        code: None,
        reason: "Path could not be encoded as a C string".to_string(),
    })?;

    let code = applier.apply(&c_path);
    if code == 0 {
        Ok(())
    } else {
        Err(PathError {
            code: Some(code),
            reason: failure_reason(code),
        })
    }
}

/// Human-readable reason for a known errno-like code, with a generic
/// fallback carrying the raw value.
pub fn failure_reason(code: i32) -> String {
    match code {
        libc::ENOENT => "File not found - The path doesn't exist".to_string(),
        libc::EACCES => "Permission denied - Cannot access the file".to_string(),
        libc::EPERM => "Operation not permitted - Insufficient privileges".to_string(),
        libc::EISDIR => "Expected a file but found a directory".to_string(),
        libc::ENOTDIR => "Expected a directory but found a file".to_string(),
        libc::ENOSPC => "No space left on device".to_string(),
        libc::EBADF => "Bad file descriptor".to_string(),
        libc::EINVAL => "Invalid argument for operation".to_string(),
        other => format!("Exploit failed with code {}", other),
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted applier for tests: returns the configured code per path
    /// (default 0) and records every call in order.
    pub struct FakeApplier {
        results: HashMap<String, i32>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeApplier {
        pub fn new(results: &[(&str, i32)]) -> Self {
            FakeApplier {
                results: results
                    .iter()
                    .map(|(p, c)| (p.to_string(), *c))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn call_log(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PathApplier for FakeApplier {
        fn apply(&self, path: &CStr) -> i32 {
            let path = path.to_string_lossy().into_owned();
            let code = self.results.get(&path).copied().unwrap_or(0);
            self.calls.lock().unwrap().push(path);
            code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeApplier;
    use super::*;

    #[test]
    fn success_maps_to_ok() {
        let applier = FakeApplier::new(&[]);
        assert!(run_path(&applier, "/tmp/anything").is_ok());
        assert_eq!(applier.call_log(), vec!["/tmp/anything"]);
    }

    #[test]
    fn known_codes_map_to_fixed_reasons() {
        let cases = [
            (libc::ENOENT, "File not found - The path doesn't exist"),
            (libc::EACCES, "Permission denied - Cannot access the file"),
            (libc::EPERM, "Operation not permitted - Insufficient privileges"),
            (libc::EISDIR, "Expected a file but found a directory"),
            (libc::ENOTDIR, "Expected a directory but found a file"),
            (libc::ENOSPC, "No space left on device"),
            (libc::EBADF, "Bad file descriptor"),
            (libc::EINVAL, "Invalid argument for operation"),
        ];
        for (code, reason) in cases {
            assert_eq!(failure_reason(code), reason);
        }
    }

    #[test]
    fn unknown_code_carries_raw_value() {
        assert_eq!(failure_reason(9999), "Exploit failed with code 9999");
    }

    #[test]
    fn failing_path_reports_code_and_reason() {
        let applier = FakeApplier::new(&[("/a", libc::EACCES)]);
        let err = run_path(&applier, "/a").unwrap_err();
        assert_eq!(err.code, Some(libc::EACCES));
        assert_eq!(err.reason, "Permission denied - Cannot access the file");
    }

    #[test]
    fn interior_nul_is_a_path_failure_not_a_panic() {
        let applier = FakeApplier::new(&[]);
        let err = run_path(&applier, "/bad\0path").unwrap_err();
        assert_eq!(err.code, None);
        // The primitive must never have been invoked.
        assert!(applier.call_log().is_empty());
    }
}

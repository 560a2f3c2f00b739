// ABOUTME: Recompile decision for the native evaluator, keyed on source hashes

use clap::ValueEnum;
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

const GCPP_FLAGS: &[&str] = &["-O1", "-fconcepts-ts"];

/// When to rebuild the evaluator executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecompileMode {
    Never,
    Change,
    Always,
}

/// Directory the preprocessor is installed in: the evaluator binary and
/// its C++ sources live here.
pub fn install_root() -> PathBuf {
    if let Ok(root) = std::env::var("LISP_PREPROCESS_HOME") {
        return PathBuf::from(root);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Rebuild the evaluator when its sources changed (or unconditionally for
/// `always`). The decision hashes `cpp/lisp.cpp` and every header under
/// `cpp/` and compares the folded digest with `cpp/.source.hash`.
pub fn recompile_if_necessary(mode: RecompileMode, root: &Path) -> io::Result<()> {
    if mode == RecompileMode::Never {
        debug!("Skipping recompilation (--recompile=never).");
        return Ok(());
    }

    let cpp_dir = root.join("cpp");
    let origin = cpp_dir.join("lisp.cpp");
    let hash_path = cpp_dir.join(".source.hash");

    let mut changed = false;
    let mut digest = String::new();
    if mode != RecompileMode::Always {
        digest = directory_digest(&cpp_dir, &origin)?;
        let previous = fs::read_to_string(&hash_path).unwrap_or_default();
        changed = digest != previous;
        debug!("Hashed evaluator sources (digest: {}).", digest);
    }

    if mode == RecompileMode::Always || changed {
        debug!("Recompiling the evaluator with g++.");
        let status = Command::new("g++")
            .args(GCPP_FLAGS)
            .arg("-o")
            .arg(root.join("lisp"))
            .arg(&origin)
            .status()?;
        if !status.success() {
            return Err(io::Error::other(format!("g++ exited with {}", status)));
        }
    }

    if changed {
        fs::write(&hash_path, digest)?;
    }
    Ok(())
}

/// XOR-fold the md5 digests of `lisp.cpp` and all headers in the
/// directory, hex-encoded. Order-independent by construction, but the
/// file list is still sorted for stable logging.
fn directory_digest(dir: &Path, origin: &Path) -> io::Result<String> {
    let mut files = vec![origin.to_path_buf()];
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "h") {
            files.push(path);
        }
    }
    files.sort();

    let mut combined = [0u8; 16];
    for file in files {
        let digest = md5::compute(fs::read(&file)?);
        for (acc, byte) in combined.iter_mut().zip(digest.iter()) {
            *acc ^= byte;
        }
    }
    Ok(combined.iter().map(|b| format!("{:02x}", b)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_never_mode_touches_nothing() {
        let dir = TempDir::new().unwrap();
        // No cpp/ directory exists; `never` must not care.
        assert!(recompile_if_necessary(RecompileMode::Never, dir.path()).is_ok());
    }

    #[test]
    fn test_digest_changes_with_contents() {
        let dir = TempDir::new().unwrap();
        let cpp = dir.path().join("cpp");
        fs::create_dir(&cpp).unwrap();
        let origin = cpp.join("lisp.cpp");

        fs::write(&origin, "int main() {}").unwrap();
        let first = directory_digest(&cpp, &origin).unwrap();

        fs::write(&origin, "int main() { return 1; }").unwrap();
        let second = directory_digest(&cpp, &origin).unwrap();

        assert_ne!(first, second);
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn test_digest_folds_headers() {
        let dir = TempDir::new().unwrap();
        let cpp = dir.path().join("cpp");
        fs::create_dir(&cpp).unwrap();
        let origin = cpp.join("lisp.cpp");
        fs::write(&origin, "int main() {}").unwrap();

        let without_header = directory_digest(&cpp, &origin).unwrap();
        fs::write(cpp.join("gen.h"), "#define X 1").unwrap();
        let with_header = directory_digest(&cpp, &origin).unwrap();

        assert_ne!(without_header, with_header);
    }
}

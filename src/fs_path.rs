//! Traversal-safe path composition.
//!
//! Every segment is clamped into `/segment` space before joining, so a
//! literal `..` can climb within its own segment but never above the base.
//! Pure string/path manipulation: no filesystem access.

use std::path::{Component, Path, PathBuf};

/// Normalize one segment as if it were rooted at `/`, returning the relative
/// remainder. `..` pops within the segment and is discarded at the floor.
fn clamp(segment: &str) -> PathBuf {
    let mut stack: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(segment).components() {
        match component {
            Component::Normal(part) => stack.push(part),
            Component::ParentDir => {
                stack.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    stack.into_iter().collect()
}

/// Join `segments` under `base`, clamping each segment first so the result
/// can never escape `base`.
pub fn secure_join<P: AsRef<Path>>(base: P, segments: &[&str]) -> PathBuf {
    let mut joined = base.as_ref().to_path_buf();
    for segment in segments {
        joined.push(clamp(segment));
    }
    joined
}

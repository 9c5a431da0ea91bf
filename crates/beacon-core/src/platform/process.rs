//! Best-effort process identity.

/// Resolve the current process id as a signed 64-bit value.
///
/// Returns `None` when the id cannot be represented; publishers map that to
/// the `-1` sentinel in the on-disk formats. Resolution failure is never
/// fatal anywhere in this crate.
pub fn resolve_pid() -> Option<i64> {
    i64::try_from(std::process::id()).ok()
}

//! Module name handling.
//!
//! Modules are identified by an author-qualified name such as
//! `puppetlabs-stdlib` or `puppetlabs/stdlib`. Both separators are accepted on
//! input; names are normalized to the dash form everywhere else. A module is
//! installed into a directory named after its unqualified part (`stdlib`).

/// Normalize a full module name, unifying `/` separators to `-`.
pub fn normalize(full_name: &str) -> String {
    full_name.replace('/', "-")
}

/// Split a full module name into `(author, module)`.
///
/// Returns `None` when the name has no separator or the author part is empty
/// or contains a `.`.
pub fn split_full_name(full_name: &str) -> Option<(&str, &str)> {
    let idx = full_name.find(['-', '/'])?;
    let (author, rest) = full_name.split_at(idx);
    let module = &rest[1..];
    if author.is_empty() || author.contains('.') || module.is_empty() {
        return None;
    }
    Some((author, module))
}

/// Whether `full_name` is a well-formed author-qualified module name.
pub fn is_full_name(full_name: &str) -> bool {
    split_full_name(full_name).is_some()
}

/// The on-disk directory name a module installs into.
///
/// For names without an author part the whole name is used.
pub fn module_dir_name(full_name: &str) -> &str {
    match split_full_name(full_name) {
        Some((_, module)) => module,
        None => full_name,
    }
}

//! Lexical path helpers over `/` separated strings.

/// Shortest equivalent path, resolving `.` and `..` lexically.
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".into();
    }
    let normalized = to_slash(path);
    let rooted = normalized.starts_with('/');
    let mut parts: Vec<&str> = vec![];
    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".into(),
        (false, false) => joined,
    }
}

/// Every element but the last, cleaned.
pub fn dir(path: &str) -> String {
    let normalized = to_slash(path);
    match normalized.rfind('/') {
        Some(0) => "/".into(),
        Some(index) => clean(&normalized[..index]),
        None => ".".into(),
    }
}

pub fn join(base: &str, path: &str) -> String {
    if path.is_empty() {
        return clean(base);
    }
    if base.is_empty() {
        return clean(path);
    }
    clean(&format!("{base}/{path}"))
}

pub fn is_absolute(path: &str) -> bool {
    std::path::Path::new(path).is_absolute() || path.starts_with('/')
}

/// Forward slashes, as written in configuration files.
pub fn to_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// Platform separators, as used when touching the file system.
pub fn from_slash(path: &str) -> String {
    if std::path::MAIN_SEPARATOR == '/' {
        path.to_string()
    } else {
        path.replace('/', std::path::MAIN_SEPARATOR_STR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_relative_segments() {
        assert_eq!(clean("./contracts/../contracts/A.cdc"), "contracts/A.cdc");
        assert_eq!(clean("a//b/./c/"), "a/b/c");
        assert_eq!(clean("../a"), "../a");
        assert_eq!(clean("/../a"), "/a");
        assert_eq!(clean(""), ".");
        assert_eq!(clean("./"), ".");
    }

    #[test]
    fn joins_relative_to_directory() {
        assert_eq!(join(&dir("contracts/C.cdc"), "./A.cdc"), "contracts/A.cdc");
        assert_eq!(join(&dir("C.cdc"), "A.cdc"), "A.cdc");
        assert_eq!(join(&dir("a/b/C.cdc"), "../A.cdc"), "a/A.cdc");
        assert_eq!(dir("/C.cdc"), "/");
    }

    #[test]
    fn converts_separators() {
        assert_eq!(to_slash("contracts\\A.cdc"), "contracts/A.cdc");
    }
}

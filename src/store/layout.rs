use std::fmt;

/// Segment under every class prefix; bump it to move to a new on-disk layout
/// without colliding with records written by older versions.
pub const FORMAT_VERSION: &str = "v1";
pub const MARKER_SUFFIX: &str = ".private";

/// Prefixes set aside for body metalinks and a write journal. Nothing is
/// stored under them yet.
pub const RESERVED_PREFIXES: [&str; 2] = ["metalink", "journal"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    Request,
    Header,
    Body,
}

impl ResourceClass {
    pub const ALL: [ResourceClass; 3] = [
        ResourceClass::Request,
        ResourceClass::Header,
        ResourceClass::Body,
    ];

    pub const fn prefix(self) -> &'static str {
        match self {
            ResourceClass::Request => "request",
            ResourceClass::Header => "header",
            ResourceClass::Body => "body",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Directory holding every record of one class.
pub fn class_root(class: ResourceClass) -> String {
    format!("{}/{FORMAT_VERSION}", class.prefix())
}

pub fn path_for(class: ResourceClass, digest: &str) -> String {
    format!("{}/{digest}", class_root(class))
}

pub fn marker_path_for(path: &str) -> String {
    format!("{path}{MARKER_SUFFIX}")
}

pub fn is_marker_path(path: &str) -> bool {
    path.ends_with(MARKER_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_class_prefixed_and_versioned() {
        assert_eq!(path_for(ResourceClass::Request, "abc"), "request/v1/abc");
        assert_eq!(path_for(ResourceClass::Header, "abc"), "header/v1/abc");
        assert_eq!(path_for(ResourceClass::Body, "abc"), "body/v1/abc");
    }

    #[test]
    fn marker_is_suffixed_sibling() {
        let path = path_for(ResourceClass::Body, "abc");
        assert_eq!(marker_path_for(&path), "body/v1/abc.private");
        assert!(is_marker_path(&marker_path_for(&path)));
        assert!(!is_marker_path(&path));
    }

    #[test]
    fn classes_never_collide() {
        let paths: Vec<String> = ResourceClass::ALL
            .iter()
            .map(|class| path_for(*class, "same"))
            .collect();
        assert_ne!(paths[0], paths[1]);
        assert_ne!(paths[1], paths[2]);
        assert_ne!(paths[0], paths[2]);
        for reserved in RESERVED_PREFIXES {
            assert!(ResourceClass::ALL.iter().all(|c| c.prefix() != reserved));
        }
    }
}

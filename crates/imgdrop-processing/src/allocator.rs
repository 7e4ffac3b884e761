use imgdrop_core::constants::DEFAULT_EXTENSION;

const RANDOM_BYTES: usize = 16;
const MAX_EXTENSION_LEN: usize = 10;

/// Produces storage names of the form `<32 hex chars>.<ext>`.
///
/// Names are never checked against existing records; 128 random bits make a
/// collision negligible, and the store's unique constraint catches the rest.
#[derive(Debug, Clone, Default)]
pub struct FilenameAllocator;

impl FilenameAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Allocate a name, taking the extension from `source_name` (a declared
    /// filename or remote path) when its last component contains a dot.
    pub fn allocate(&self, source_name: Option<&str>) -> String {
        let random_bytes: [u8; RANDOM_BYTES] = rand::random();
        format!("{}.{}", hex::encode(random_bytes), extension_of(source_name))
    }
}

/// Lowercased alphanumeric extension of the final path component, or the default.
pub fn extension_of(source_name: Option<&str>) -> String {
    let Some(name) = source_name else {
        return DEFAULT_EXTENSION.to_string();
    };

    let last_component = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let extension = match last_component.rsplit_once('.') {
        Some((_, ext)) => ext
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(MAX_EXTENSION_LEN)
            .collect::<String>()
            .to_lowercase(),
        None => String::new(),
    };

    if extension.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else {
        extension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn name_is_hex_plus_extension() {
        let name = FilenameAllocator::new().allocate(Some("Holiday.PNG"));
        let (stem, ext) = name.split_once('.').unwrap();
        assert_eq!(stem.len(), 32);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ext, "png");
    }

    #[test]
    fn extension_defaults_to_jpg() {
        assert_eq!(extension_of(None), "jpg");
        assert_eq!(extension_of(Some("no_extension")), "jpg");
        assert_eq!(extension_of(Some("trailing.")), "jpg");
    }

    #[test]
    fn extension_comes_from_last_path_component() {
        assert_eq!(extension_of(Some("photos/file_12.jpg")), "jpg");
        assert_eq!(extension_of(Some("dir.v2/file")), "jpg");
        assert_eq!(extension_of(Some("archive.tar.gz")), "gz");
    }

    #[test]
    fn extension_is_sanitized() {
        assert_eq!(extension_of(Some("evil.p/../ng")), "jpg");
        assert_eq!(extension_of(Some("weird.J p\"G")), "jpg");
        assert_eq!(extension_of(Some("x.webp")), "webp");
    }

    #[test]
    fn ten_thousand_allocations_are_distinct() {
        let allocator = FilenameAllocator::new();
        let names: HashSet<String> = (0..10_000).map(|_| allocator.allocate(None)).collect();
        assert_eq!(names.len(), 10_000);
    }
}

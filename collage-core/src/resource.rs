//! # Resource identifiers
//!
//! Identifies the source artifact a shape list is drawn over. Immutable, compared by every field
//! and by variant, so a file and a class file with the same short name are distinct resources.

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceIdentifier {
    /// A workspace file, by portable path.
    File { short_name: String, path: String },
    /// A class inside a jar, which has no workspace path of its own.
    ClassFile {
        short_name: String,
        class_name: String,
        jar_name: String,
    },
}
impl ResourceIdentifier {
    /// File resource named after the last component of its path.
    #[must_use]
    pub fn for_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let short_name = std::path::Path::new(&path)
            .file_name()
            .map_or_else(|| path.clone(), |name| name.to_string_lossy().into_owned());
        Self::File { short_name, path }
    }
    /// Class file resource named after the simple class name.
    #[must_use]
    pub fn for_class(class_name: impl Into<String>, jar_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        let short_name = class_name
            .rsplit('.')
            .next()
            .unwrap_or(&class_name)
            .to_owned()
            + ".class";
        Self::ClassFile {
            short_name,
            class_name,
            jar_name: jar_name.into(),
        }
    }
    #[must_use]
    pub fn short_name(&self) -> &str {
        match self {
            Self::File { short_name, .. } | Self::ClassFile { short_name, .. } => short_name,
        }
    }
    /// Workspace path, if this resource has one.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::File { path, .. } => Some(path),
            Self::ClassFile { .. } => None,
        }
    }
}
impl std::fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File { path, .. } => f.write_str(path),
            Self::ClassFile {
                class_name,
                jar_name,
                ..
            } => write!(f, "{class_name} ({jar_name})"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::ResourceIdentifier;

    #[test]
    fn short_names() {
        let file = ResourceIdentifier::for_path("/project/src/Main.java");
        assert_eq!(file.short_name(), "Main.java");
        assert_eq!(file.path(), Some("/project/src/Main.java"));

        let class = ResourceIdentifier::for_class("java.util.ArrayList", "rt.jar");
        assert_eq!(class.short_name(), "ArrayList.class");
        assert_eq!(class.path(), None);
    }
    #[test]
    fn equality_includes_variant() {
        let file = ResourceIdentifier::File {
            short_name: "A".into(),
            path: "a".into(),
        };
        let class = ResourceIdentifier::ClassFile {
            short_name: "A".into(),
            class_name: "a".into(),
            jar_name: "a".into(),
        };
        assert_ne!(file, class);
        assert_eq!(file, ResourceIdentifier::for_path("a").clone_with_short_name("A"));
    }

    impl ResourceIdentifier {
        fn clone_with_short_name(&self, name: &str) -> Self {
            let mut this = self.clone();
            match &mut this {
                Self::File { short_name, .. } | Self::ClassFile { short_name, .. } => {
                    *short_name = name.to_owned();
                }
            }
            this
        }
    }
    #[test]
    fn equality_by_fields() {
        assert_eq!(
            ResourceIdentifier::for_path("x/y.txt"),
            ResourceIdentifier::for_path("x/y.txt")
        );
        assert_ne!(
            ResourceIdentifier::for_path("x/y.txt"),
            ResourceIdentifier::for_path("z/y.txt")
        );
    }
}

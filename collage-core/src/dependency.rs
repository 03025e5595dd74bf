//! # Plugin dependencies
//!
//! A saved collage is tagged with the plugins (and their versions) that contributed the shape types
//! it contains. On load the tags are merged against what is installed, so that data written by a newer
//! plugin is refused and data from an uninstalled plugin is kept but flagged. On save the tags are pruned
//! back to what the tree actually references.

/// The plugin providing the collage model itself. Always depended upon.
pub const CORE_PLUGIN_ID: &str = "org.eclipselabs.collage";
/// Provider of rectangles, ellipses and sketches.
pub const DRAW_PLUGIN_ID: &str = "org.eclipselabs.collage.draw";
/// Provider of text notes.
pub const TEXT_PLUGIN_ID: &str = "org.eclipselabs.collage.text";
/// Version of the collage model written by this crate.
pub const MODEL_VERSION: &str = "0.1.0";

/// A dotted `major.minor.micro.qualifier` version. Missing numeric parts are zero,
/// the qualifier compares as a string.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub qualifier: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version {0:?}")]
pub struct ParseVersionError(String);

impl std::str::FromStr for Version {
    type Err = ParseVersionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || ParseVersionError(s.to_owned());
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let mut parts = trimmed.splitn(4, '.');
        let mut number = |required: bool| -> Result<u32, ParseVersionError> {
            match parts.next() {
                Some(part) if part.bytes().all(|b| b.is_ascii_digit()) && !part.is_empty() => {
                    part.parse().map_err(|_| error())
                }
                None if !required => Ok(0),
                _ => Err(error()),
            }
        };
        let major = number(true)?;
        let minor = number(false)?;
        let micro = number(false)?;
        let qualifier = parts.next().unwrap_or_default();
        if !qualifier
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(error());
        }
        Ok(Self {
            major,
            minor,
            micro,
            qualifier: qualifier.to_owned(),
        })
    }
}
impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

/// A `(plugin, version)` tag. Equality ignores the `missing` flag.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PluginDependency {
    pub id: String,
    /// Kept as written, so saving a file doesn't reformat foreign versions.
    pub version: String,
    /// Set on load when the plugin is not installed.
    #[serde(skip)]
    pub missing: bool,
}
impl PartialEq for PluginDependency {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.version == other.version
    }
}
impl Eq for PluginDependency {}
impl PluginDependency {
    #[must_use]
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            missing: false,
        }
    }
    pub fn parsed_version(&self) -> Result<Version, ParseVersionError> {
        self.version.parse()
    }
}

/// Plugins available to this build. The core model always comes first.
#[must_use]
pub fn installed() -> Vec<PluginDependency> {
    [CORE_PLUGIN_ID, DRAW_PLUGIN_ID, TEXT_PLUGIN_ID]
        .into_iter()
        .map(|id| PluginDependency::new(id, MODEL_VERSION))
        .collect()
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// Every offending plugin, one per line, followed by advice.
    #[error("{0}")]
    NewerVersion(String),
    #[error("plugin {plugin} has {source}")]
    InvalidVersion {
        plugin: String,
        source: ParseVersionError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub dependencies: Vec<PluginDependency>,
    /// One per missing plugin, suitable for showing to the user.
    pub warnings: Vec<String>,
}

/// Merge the dependencies stored with loaded data against the current ones.
///
/// Current entries are kept as they are. Loaded entries with no current counterpart are appended and
/// flagged missing, with a warning each. A loaded entry newer than its current counterpart fails the
/// whole merge, and the error lists every such entry.
pub fn merge(
    current: &[PluginDependency],
    loaded: &[PluginDependency],
) -> Result<Merged, DependencyError> {
    let mut merged = current.to_vec();
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    for loaded_dep in loaded {
        match current.iter().find(|dep| dep.id == loaded_dep.id) {
            Some(current_dep) => {
                let invalid = |source| DependencyError::InvalidVersion {
                    plugin: loaded_dep.id.clone(),
                    source,
                };
                let loaded_version = loaded_dep.parsed_version().map_err(invalid)?;
                let current_version = current_dep.parsed_version().map_err(invalid)?;
                if loaded_version > current_version {
                    errors.push(format!(
                        "Version of plugin {} that exported stored data ({}) exceeds current version ({}).",
                        current_dep.id, loaded_dep.version, current_dep.version
                    ));
                }
            }
            None => {
                let warning = format!(
                    "Stored data depends on plugin {}, which is not installed.",
                    loaded_dep.id
                );
                log::warn!("{warning}");
                warnings.push(warning);
                merged.push(PluginDependency {
                    missing: true,
                    ..loaded_dep.clone()
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(Merged {
            dependencies: merged,
            warnings,
        })
    } else {
        let advice = if errors.len() == 1 {
            "version of this plugin."
        } else {
            "versions of these plugins."
        };
        let message = format!(
            "{}\nPlease upgrade to the latest {advice}",
            errors.join("\n")
        );
        log::error!("{message}");
        Err(DependencyError::NewerVersion(message))
    }
}

/// Cut `dependencies` down to the plugins actually used.
///
/// Keeps the entries whose plugin provides a shape in `referenced`, every missing entry if the tree
/// holds any unrecognized shapes (there is no telling which plugin they came from), and the core plugin.
#[must_use]
pub fn prune<'a>(
    dependencies: &[PluginDependency],
    referenced: impl IntoIterator<Item = &'a str>,
    has_unknown_shapes: bool,
) -> Vec<PluginDependency> {
    let referenced: hashbrown::HashSet<&str> = referenced.into_iter().collect();
    dependencies
        .iter()
        .filter(|dep| {
            referenced.contains(dep.id.as_str())
                || (has_unknown_shapes && dep.missing)
                || dep.id == CORE_PLUGIN_ID
        })
        .cloned()
        .collect()
}

/// Fold another collage's missing dependencies into `into`, as when importing its layers.
///
/// Installed plugins are already present, so only missing entries are considered. A missing entry
/// replaces an existing one of the same plugin when it is newer, and is otherwise dropped.
pub fn absorb_missing(into: &mut Vec<PluginDependency>, imported: &[PluginDependency]) {
    let mut to_add = Vec::new();
    for new_dep in imported.iter().filter(|dep| dep.missing) {
        let new_version = new_dep.parsed_version().unwrap_or_default();
        let mut should_add = true;
        into.retain(|existing| {
            if existing.id != new_dep.id {
                return true;
            }
            if new_version <= existing.parsed_version().unwrap_or_default() {
                should_add = false;
                true
            } else {
                false
            }
        });
        if should_add {
            to_add.push(new_dep.clone());
        }
    }
    into.extend(to_add);
}

use collage_core::color::Rgb;

const DOCUMENTATION: &str = r#"# Collage preferences. You may edit this file, but be aware that formatting and comments will not
# be preserved.

# creator    - name recorded on every shape you draw.
# colour     - colour of new shapes, six hex digits without a leading '#'. e.g. "ff8000"
# line_width - outline width of new rectangles, ellipses and sketches, at least 1.
# log_level  - one of "off", "error", "warn", "info", "debug", "trace".

"#;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Settings {
    pub creator: String,
    pub colour: Rgb,
    pub line_width: u32,
    pub log_level: String,
}
impl Default for Settings {
    fn default() -> Self {
        let creator = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "(unknown)".to_owned());
        Self {
            creator,
            colour: Rgb::BLACK,
            line_width: collage_core::state::shape::DEFAULT_LINE_WIDTH,
            log_level: "info".to_owned(),
        }
    }
}

pub struct Preferences {
    failed_to_load: bool,
    pub settings: Settings,
}
impl Preferences {
    const FILENAME: &'static str = "preferences.toml";
    /// Shared global preferences, saved and loaded from the user's preference directory.
    /// (Or defaulted, if unavailable for some reason)
    #[must_use]
    pub fn get() -> &'static Self {
        static GLOBAL_PREFERENCES: std::sync::OnceLock<Preferences> = std::sync::OnceLock::new();

        GLOBAL_PREFERENCES.get_or_init(|| match Self::path() {
            None => Self::no_path(),
            Some(path) => Self::load_or_default(&path),
        })
    }
    /// Where the preferences file lives, whether or not it exists yet.
    #[must_use]
    pub fn path() -> Option<std::path::PathBuf> {
        let mut dir = preferences_dir()?;
        dir.push(Self::FILENAME);
        Some(dir)
    }
    #[must_use]
    pub fn no_path() -> Self {
        Self {
            failed_to_load: true,
            settings: Settings::default(),
        }
    }
    #[must_use]
    fn load_or_default(path: &std::path::Path) -> Self {
        let settings: anyhow::Result<Settings> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let settings : Settings = toml::from_str(&string)?;
            Ok(settings)
        };

        match settings {
            Ok(settings) => Self {
                failed_to_load: false,
                settings,
            },
            Err(_) => Self::no_path(),
        }
    }
    /// Return true if loading user's settings failed. This can be useful for
    /// displaying a warning.
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failed_to_load
    }
    /// The configured log level, or Info if it isn't one.
    #[must_use]
    pub fn level_filter(&self) -> log::LevelFilter {
        self.settings
            .log_level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Explicity do *not* create recursively. If not found, the user probably has a good reason.
        // Ignore errors (could already exist). Any real errors will be emitted by file access below.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        let mut string = toml::ser::to_string_pretty(&self.settings)?;
        // Prefix some documentation.
        string = DOCUMENTATION.to_owned() + &string;
        std::fs::write(preferences, string)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_file_defaults_rest() {
        let settings: Settings = toml::from_str("colour = \"ff8000\"").unwrap();
        assert_eq!(settings.colour.to_string(), "ff8000");
        assert_eq!(settings.line_width, 3);
        assert_eq!(settings.log_level, "info");
    }
    #[test]
    fn bad_colour_rejected() {
        assert!(toml::from_str::<Settings>("colour = \"#ff8000\"").is_err());
    }
    #[test]
    fn level_parsing() {
        let mut preferences = Preferences::no_path();
        assert_eq!(preferences.level_filter(), log::LevelFilter::Info);
        preferences.settings.log_level = "trace".into();
        assert_eq!(preferences.level_filter(), log::LevelFilter::Trace);
        preferences.settings.log_level = "loud".into();
        assert_eq!(preferences.level_filter(), log::LevelFilter::Info);
    }
    #[test]
    fn documented_output_parses() {
        let string = DOCUMENTATION.to_owned()
            + &toml::ser::to_string_pretty(&Settings::default()).unwrap();
        let settings: Settings = toml::from_str(&string).unwrap();
        assert_eq!(settings.creator, Settings::default().creator);
    }
}

//! Configuration: file filtering rules, organize defaults and category overrides.
//!
//! Configuration is stored in TOML format with the following structure:
//!
//! ```toml
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.tmp", "node_modules/**"]
//! extensions = ["bak"]
//! regex = []
//! directories = ["node_modules", ".git"]
//!
//! [filters.include]
//! patterns = []
//!
//! [organize]
//! on_duplicate = "rename"
//! recursive = false
//! keep_structure = false
//! backup_overwritten = true
//! # output_dir = "Organized"
//!
//! [categories]
//! Images = ["raw", "cr2"]
//! Documents = ["pages"]
//! ```

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::duplicate::DuplicatePolicy;
use crate::file_category::{Category, FileMapper};

/// Errors that can occur during configuration loading and filtering.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Invalid glob pattern '{0}': expected *.ext or dir/**")]
    InvalidGlobPattern(String),

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    #[error("Unknown category '{0}' in [categories]")]
    UnknownCategory(String),

    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Full configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub filters: FilterRules,

    #[serde(default)]
    pub organize: OrganizeSettings,

    /// Extra extensions per category, keyed by category directory name.
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
}

/// Root-level filter rules configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to include hidden files (starting with "."). Defaults to false.
    #[serde(default)]
    pub enable_hidden_files: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

/// Rules for excluding files from organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns to exclude, matched against the path relative to the root.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude (e.g., "bak", "log").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns to exclude, matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,

    /// Directory names never descended into during recursive walks.
    #[serde(default)]
    pub directories: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Defaults for the `organize` command. Command-line flags take precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeSettings {
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,

    #[serde(default)]
    pub recursive: bool,

    /// With `recursive`, keep each file's sub-path under its category.
    #[serde(default)]
    pub keep_structure: bool,

    /// Move files replaced by `overwrite` into the run's backup area.
    #[serde(default = "default_backup_overwritten")]
    pub backup_overwritten: bool,

    /// Create category directories under this subdirectory of the root.
    #[serde(default)]
    pub output_dir: Option<String>,
}

fn default_backup_overwritten() -> bool {
    true
}

impl Default for OrganizeSettings {
    fn default() -> Self {
        Self {
            on_duplicate: DuplicatePolicy::default(),
            recursive: false,
            keep_structure: false,
            backup_overwritten: default_backup_overwritten(),
            output_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.dirtidyrc.toml` in the current directory
    /// 3. Look for `~/.config/dirtidy/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".dirtidyrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("dirtidy")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Compile filter rules into optimized structures for matching.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }

    /// Build the categorizer, applying `[categories]` overrides.
    pub fn file_mapper(&self) -> Result<FileMapper, ConfigError> {
        let mut mapper = FileMapper::default();
        for (name, extensions) in &self.categories {
            let category: Category = name
                .parse()
                .map_err(|_| ConfigError::UnknownCategory(name.clone()))?;
            for ext in extensions {
                mapper.add_extension_mapping(ext, category);
            }
        }
        Ok(mapper)
    }
}

/// Compiled, optimized filter structures for efficient file matching.
///
/// Glob and regex patterns are parsed once here rather than on each file.
#[derive(Debug)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_directories: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_directories: rules
                .exclude
                .directories
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Override the hidden-file setting (e.g. from `--include-hidden`).
    pub fn set_hidden_files(&mut self, enabled: bool) {
        self.enable_hidden_files = enabled;
    }

    /// Add directory names to prune (e.g. from `--exclude-dir`).
    pub fn exclude_directories<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude_directories
            .extend(names.into_iter().map(|n| n.as_ref().to_lowercase()));
    }

    /// Check if a file should be included in organization (not excluded).
    ///
    /// `rel_path` is the file's path relative to the organized root.
    ///
    /// Checks are performed in this order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, always include
    /// 2. Hidden file filter - if hidden and disabled, exclude
    /// 3. Exact filename match - if matched, exclude
    /// 4. File extension match - if matched, exclude
    /// 5. Glob pattern match - if matched, exclude
    /// 6. Regex pattern match - if matched, exclude
    /// 7. Default: include
    pub fn should_include(&self, rel_path: &Path) -> bool {
        let file_name = rel_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self
            .include_patterns
            .iter()
            .any(|pattern| pattern.matches_path(rel_path))
        {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = rel_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(rel_path))
        {
            return false;
        }

        if self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
        {
            return false;
        }

        true
    }

    /// Whether a recursive walk may enter a directory with this name.
    pub fn should_descend(&self, dir_name: &str) -> bool {
        if !self.enable_hidden_files && dir_name.starts_with('.') {
            return false;
        }
        !self.exclude_directories.contains(&dir_name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(rules: FilterRules) -> CompiledFilters {
        Config {
            filters: rules,
            ..Default::default()
        }
        .compile_filters()
        .unwrap()
    }

    #[test]
    fn test_default_config_hides_hidden_files() {
        let compiled = Config::default().compile_filters().unwrap();

        assert!(!compiled.should_include(Path::new(".DS_Store")));
        assert!(!compiled.should_descend(".git"));
        assert!(compiled.should_include(Path::new("photo.jpg")));
    }

    #[test]
    fn test_hidden_file_included_when_enabled() {
        let compiled = compiled(FilterRules {
            enable_hidden_files: true,
            ..Default::default()
        });

        assert!(compiled.should_include(Path::new(".DS_Store")));
    }

    #[test]
    fn test_exclude_exact_filename_and_extension() {
        let compiled = compiled(FilterRules {
            enable_hidden_files: true,
            exclude: ExcludeRules {
                filenames: vec!["Thumbs.db".to_string()],
                extensions: vec!["bak".to_string(), ".tmp".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("Thumbs.db")));
        assert!(!compiled.should_include(Path::new("file.BAK")));
        assert!(!compiled.should_include(Path::new("file.tmp")));
        assert!(compiled.should_include(Path::new("image.jpg")));
    }

    #[test]
    fn test_glob_pattern_directory_boundary_semantics() {
        let compiled = compiled(FilterRules {
            enable_hidden_files: true,
            exclude: ExcludeRules {
                patterns: vec!["**/logs/**".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("logs/file.txt")));
        assert!(!compiled.should_include(Path::new("app/logs/file.txt")));
        assert!(compiled.should_include(Path::new("my_logs/file.txt")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let compiled = compiled(FilterRules {
            include: IncludeRules {
                patterns: vec![".important".to_string()],
            },
            ..Default::default()
        });

        assert!(compiled.should_include(Path::new(".important")));
        assert!(!compiled.should_include(Path::new(".other")));
    }

    #[test]
    fn test_exclude_regex() {
        let compiled = compiled(FilterRules {
            exclude: ExcludeRules {
                regex: vec![r"^test_.*\.txt$".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("test_file.txt")));
        assert!(compiled.should_include(Path::new("file.txt")));
    }

    #[test]
    fn test_invalid_patterns_return_errors() {
        let bad_regex = Config {
            filters: FilterRules {
                exclude: ExcludeRules {
                    regex: vec!["[invalid(".to_string()],
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            bad_regex.compile_filters(),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));

        let bad_glob = Config {
            filters: FilterRules {
                exclude: ExcludeRules {
                    patterns: vec!["[invalid".to_string()],
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            bad_glob.compile_filters(),
            Err(ConfigError::InvalidGlobPattern(_))
        ));
    }

    #[test]
    fn test_excluded_directories_are_case_insensitive() {
        let mut compiled = Config::default().compile_filters().unwrap();
        compiled.exclude_directories(["Node_Modules"]);

        assert!(!compiled.should_descend("node_modules"));
        assert!(compiled.should_descend("src"));
    }

    #[test]
    fn test_parse_organize_and_categories_sections() {
        let config = Config::from_toml(
            r#"
            [organize]
            on_duplicate = "skip"
            recursive = true
            output_dir = "Organized"

            [categories]
            Images = ["raw"]
            "#,
        )
        .unwrap();

        assert_eq!(config.organize.on_duplicate, DuplicatePolicy::Skip);
        assert!(config.organize.recursive);
        assert!(config.organize.backup_overwritten);
        assert_eq!(config.organize.output_dir.as_deref(), Some("Organized"));

        let mapper = config.file_mapper().unwrap();
        assert_eq!(mapper.categorize(Path::new("shot.RAW")), Category::Image);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let config = Config::from_toml("[categories]\nPictures = [\"raw\"]\n").unwrap();
        assert!(matches!(
            config.file_mapper(),
            Err(ConfigError::UnknownCategory(name)) if name == "Pictures"
        ));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        assert!(matches!(
            Config::from_toml("[organize\n"),
            Err(ConfigError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = Config::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }
}

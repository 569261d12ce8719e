/// File categorization system for organizing files by type.
///
/// This module maps file names and extensions to broader categories
/// (e.g., "Images", "Audio", "Documents"). Categorization only looks at the
/// name of a file, never at its content.
///
/// # Examples
///
/// ```
/// use dirtidy::file_category::{Category, FileMapper};
/// use std::path::Path;
///
/// let mapper = FileMapper::default();
/// assert_eq!(mapper.categorize(Path::new("photo.JPG")), Category::Image);
/// assert_eq!(mapper.categorize(Path::new("notes.txt")), Category::Document);
/// assert_eq!(mapper.categorize(Path::new("Makefile")), Category::NoExtension);
/// ```
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Represents a broad file category.
///
/// Categories are used to organize files into meaningful groups
/// for directory-based organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Image files (PNG, JPG, GIF, etc.)
    Image,
    /// Video files (MP4, MKV, AVI, etc.)
    Video,
    /// Audio files (MP3, WAV, FLAC, etc.)
    Audio,
    /// Document files (PDF, DOCX, TXT, etc.)
    Document,
    /// Spreadsheet files (XLSX, CSV, ODS, etc.)
    Spreadsheet,
    /// Presentation files (PPTX, KEY, ODP, etc.)
    Presentation,
    /// Archive files (ZIP, RAR, 7Z, etc.)
    Archive,
    /// Code/Source files (Rust, Python, JavaScript, etc.)
    Code,
    /// Installers and binaries (EXE, DMG, DEB, etc.)
    Executable,
    /// Font files (TTF, OTF, WOFF, etc.)
    Font,
    /// Partial downloads and editor scratch files
    Temp,
    /// Files without any extension
    NoExtension,
    /// Unknown or uncategorized files
    Other,
}

impl Category {
    /// All categories, in the order they are listed in reports.
    pub const ALL: [Category; 13] = [
        Category::Image,
        Category::Video,
        Category::Audio,
        Category::Document,
        Category::Spreadsheet,
        Category::Presentation,
        Category::Archive,
        Category::Code,
        Category::Executable,
        Category::Font,
        Category::Temp,
        Category::NoExtension,
        Category::Other,
    ];

    /// Returns the directory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirtidy::file_category::Category;
    ///
    /// assert_eq!(Category::Image.dir_name(), "Images");
    /// assert_eq!(Category::Audio.dir_name(), "Audio");
    /// assert_eq!(Category::Other.dir_name(), "Other");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Image => "Images",
            Category::Video => "Videos",
            Category::Audio => "Audio",
            Category::Document => "Documents",
            Category::Spreadsheet => "Spreadsheets",
            Category::Presentation => "Presentations",
            Category::Archive => "Archives",
            Category::Code => "Code",
            Category::Executable => "Executables",
            Category::Font => "Fonts",
            Category::Temp => "Temp",
            Category::NoExtension => "NoExtension",
            Category::Other => "Other",
        }
    }

    /// Returns a human-readable description of this category.
    pub fn description(&self) -> &'static str {
        match self {
            Category::Image => "Image files",
            Category::Video => "Video files",
            Category::Audio => "Audio files",
            Category::Document => "Document files",
            Category::Spreadsheet => "Spreadsheet files",
            Category::Presentation => "Presentation files",
            Category::Archive => "Archive files",
            Category::Code => "Source code files",
            Category::Executable => "Executables and installers",
            Category::Font => "Font files",
            Category::Temp => "Temporary and partial files",
            Category::NoExtension => "Files without an extension",
            Category::Other => "Other files",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Parses a category from its directory name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.dir_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// Names that always count as documents regardless of extension.
const SPECIAL_DOCUMENT_NAMES: &[&str] = &[
    "readme",
    "readme.txt",
    "readme.md",
    "license",
    "license.txt",
    "license.md",
];

/// Returns true for partial downloads and office lock files.
pub fn is_probably_temporary(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower.ends_with(".tmp")
        || lower.ends_with(".part")
        || lower.ends_with(".crdownload")
        || lower.starts_with("~$")
}

/// Maps file names and extensions to categories.
///
/// This struct encapsulates the logic for categorizing files.
/// It uses a HashMap for efficient lookups and can be extended
/// with custom mappings from the configuration file.
#[derive(Debug, Clone)]
pub struct FileMapper {
    extension_map: HashMap<String, Category>,
}

impl FileMapper {
    /// Creates a new `FileMapper` with all standard mappings.
    pub fn new() -> Self {
        let mut mapper = Self {
            extension_map: HashMap::new(),
        };
        mapper.populate_standard_mappings();
        mapper
    }

    fn populate_standard_mappings(&mut self) {
        let table: &[(Category, &[&str])] = &[
            (
                Category::Image,
                &[
                    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "heic", "svg",
                ],
            ),
            (
                Category::Video,
                &["mp4", "mkv", "mov", "avi", "wmv", "webm", "m4v"],
            ),
            (
                Category::Audio,
                &["mp3", "wav", "flac", "aac", "m4a", "ogg", "opus"],
            ),
            (
                Category::Document,
                &["pdf", "doc", "docx", "txt", "rtf", "md", "odt"],
            ),
            (Category::Spreadsheet, &["xls", "xlsx", "csv", "ods"]),
            (Category::Presentation, &["ppt", "pptx", "key", "odp"]),
            (
                Category::Archive,
                &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"],
            ),
            (
                Category::Code,
                &[
                    "py", "js", "ts", "java", "c", "cpp", "h", "hpp", "cs", "go", "rs", "php",
                    "html", "css", "json", "yaml", "yml", "sql", "sh",
                ],
            ),
            (
                Category::Executable,
                &["exe", "msi", "dmg", "pkg", "deb", "rpm", "apk"],
            ),
            (Category::Font, &["ttf", "otf", "woff", "woff2"]),
        ];

        for (category, extensions) in table {
            for ext in *extensions {
                self.add_extension_mapping(ext, *category);
            }
        }
    }

    /// Adds a file extension to category mapping, replacing any previous one.
    ///
    /// A leading dot is ignored, so `".raw"` and `"raw"` are equivalent.
    pub fn add_extension_mapping(&mut self, ext: &str, category: Category) {
        let ext = ext.trim().trim_start_matches('.').to_lowercase();
        if !ext.is_empty() {
            self.extension_map.insert(ext, category);
        }
    }

    /// Maps a file extension to a category.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirtidy::file_category::{Category, FileMapper};
    ///
    /// let mapper = FileMapper::default();
    /// assert_eq!(mapper.extension_to_category("pdf"), Some(Category::Document));
    /// assert_eq!(mapper.extension_to_category("PNG"), Some(Category::Image));
    /// assert_eq!(mapper.extension_to_category("xyz"), None);
    /// ```
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        self.extension_map.get(&ext.to_lowercase()).copied()
    }

    /// Determines the category for a file from its name.
    ///
    /// The function uses the following strategy:
    /// 1. `README`/`LICENSE` style names are documents
    /// 2. Temporary and partial downloads go to `Temp`
    /// 3. Files without an extension go to `NoExtension`
    /// 4. Known extensions map to their category
    /// 5. Everything else is `Other`
    pub fn categorize(&self, path: &Path) -> Category {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        let lower = name.to_lowercase();

        if SPECIAL_DOCUMENT_NAMES.contains(&lower.as_str()) {
            return Category::Document;
        }

        if is_probably_temporary(&name) {
            return Category::Temp;
        }

        let Some(ext) = path.extension().map(|e| e.to_string_lossy()) else {
            return Category::NoExtension;
        };
        if ext.is_empty() {
            return Category::NoExtension;
        }

        self.extension_to_category(&ext).unwrap_or(Category::Other)
    }
}

impl Default for FileMapper {
    fn default() -> Self {
        Self::new()
    }
}

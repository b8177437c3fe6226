use std::fmt::Write as _;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

const PREVIEW_MAX_BYTES: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    pub size: u64,
}

/// Read-only directory browser backing the system file viewer. Errors are
/// captured into the model and shown in place of the listing.
pub struct FileBrowser {
    pub current_path: PathBuf,
    pub entries: Vec<FileEntry>,
    pub error: Option<String>,
}

impl FileBrowser {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut browser = FileBrowser {
            current_path: path.into(),
            entries: Vec::new(),
            error: None,
        };
        browser.reload();
        browser
    }

    /// Reads the current directory: directories first, then files, each
    /// name-sorted. Hidden entries are listed; this browser exists to poke at
    /// system internals.
    pub fn reload(&mut self) {
        self.entries.clear();
        self.error = None;

        let read = match fs::read_dir(&self.current_path) {
            Ok(read) => read,
            Err(err) => {
                self.error = Some(format!("Cannot read directory: {}", err));
                return;
            }
        };

        for entry in read.flatten() {
            let path = entry.path();
            let metadata = entry.metadata();
            let is_directory = metadata.as_ref().map(|m| m.is_dir()).unwrap_or(false);
            let size = metadata.map(|m| m.len()).unwrap_or(0);
            self.entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                is_directory,
                size,
            });
        }

        self.entries.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
    }

    pub fn enter(&mut self, index: usize) {
        if let Some(entry) = self.entries.get(index) {
            if entry.is_directory {
                self.current_path = entry.path.clone();
                self.reload();
            }
        }
    }

    /// Steps up one directory; stays put at the filesystem root.
    pub fn navigate_back(&mut self) {
        if let Some(parent) = self.current_path.parent() {
            self.current_path = parent.to_path_buf();
            self.reload();
        }
    }
}

/// Coarse file-type label derived from the extension, used for the metadata
/// column and to pick a preview mode.
pub fn detect_file_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "plist" => "Property List",
        "png" | "jpg" | "jpeg" | "gif" | "heic" | "car" => "Image",
        "txt" | "log" | "md" | "strings" => "Text File",
        "xml" => "XML File",
        "html" | "htm" => "HTML File",
        "json" => "JSON File",
        "c" | "h" | "m" | "swift" | "rs" | "py" | "js" | "sh" => "Source Code",
        "mp3" | "m4a" | "aac" | "wav" | "caf" | "aiff" | "aif" | "flac" => "Audio",
        "materialrecipe" | "visualstyleset" => "Material Recipe",
        _ => "Binary",
    }
}

pub fn is_text_previewable(path: &Path) -> bool {
    matches!(
        detect_file_type(path),
        "Text File" | "XML File" | "HTML File" | "JSON File" | "Source Code" | "Property List"
    )
}

/// Bounded text preview; anything that is not valid UTF-8 falls back to the
/// hex dump at the call site.
pub fn read_text_preview(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut buffer = vec![0u8; PREVIEW_MAX_BYTES];
    let read = file.read(&mut buffer)?;
    buffer.truncate(read);
    match String::from_utf8(buffer) {
        Ok(text) => Ok(text),
        Err(err) => {
            let valid = err.utf8_error().valid_up_to();
            let bytes = err.into_bytes();
            Ok(String::from_utf8_lossy(&bytes[..valid]).into_owned())
        }
    }
}

/// Classic offset / hex / ASCII dump of the first 4 KiB.
pub fn hex_dump(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut buffer = vec![0u8; PREVIEW_MAX_BYTES];
    let read = file.read(&mut buffer)?;
    buffer.truncate(read);

    let mut out = String::new();
    for (i, chunk) in buffer.chunks(16).enumerate() {
        let _ = write!(out, "{:08x}  ", i * 16);
        for j in 0..16 {
            match chunk.get(j) {
                Some(byte) => {
                    let _ = write!(out, "{:02x} ", byte);
                }
                None => out.push_str("   "),
            }
            if j == 7 {
                out.push(' ');
            }
        }
        out.push(' ');
        for byte in chunk {
            out.push(if byte.is_ascii_graphic() || *byte == b' ' {
                *byte as char
            } else {
                '.'
            });
        }
        out.push('\n');
    }
    Ok(out)
}

pub fn formatted_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", size, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

//! Node model handed to the UI layer

use crate::{Capacity, DirEntry};
use serde::{Deserialize, Serialize};

/// Coarse file classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Folder,
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Unknown,
}

impl FileType {
    pub const ALL: [FileType; 7] = [
        FileType::Folder,
        FileType::Image,
        FileType::Video,
        FileType::Audio,
        FileType::Document,
        FileType::Archive,
        FileType::Unknown,
    ];

    /// Classify a file by its extension. Encrypted files (`.enc`) are
    /// classified by the name they had before encryption.
    pub fn from_name(name: &str) -> Self {
        let name = name.strip_suffix(".enc").unwrap_or(name);
        let extension = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
            _ => return FileType::Unknown,
        };

        match extension.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp" | "heic" | "heif" | "svg" | "tiff"
            | "tif" | "ico" => FileType::Image,
            "mp4" | "mkv" | "mov" | "avi" | "webm" | "3gp" | "m4v" | "wmv" | "flv" => FileType::Video,
            "mp3" | "wav" | "flac" | "aac" | "ogg" | "m4a" | "opus" | "wma" | "amr" => FileType::Audio,
            "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "txt" | "md" | "rtf"
            | "odt" | "ods" | "csv" | "json" | "xml" | "html" | "epub" => FileType::Document,
            "zip" | "rar" | "7z" | "tar" | "gz" | "tgz" | "bz2" | "xz" | "apk" => FileType::Archive,
            _ => FileType::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Folder => "folder",
            FileType::Image => "image",
            FileType::Video => "video",
            FileType::Audio => "audio",
            FileType::Document => "document",
            FileType::Archive => "archive",
            FileType::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// A node in the virtual namespace. Built fresh on every listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub size: u64,
    /// Unix epoch, milliseconds
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Capacity>,
    #[serde(default)]
    pub is_protected: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_encrypted: bool,
    #[serde(default)]
    pub is_trash: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
}

impl VirtualNode {
    /// A synthetic folder node
    pub fn folder(id: impl Into<String>, parent_id: Option<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id,
            name: name.into(),
            file_type: FileType::Folder,
            size: 0,
            updated_at: 0,
            capacity: None,
            is_protected: false,
            is_hidden: false,
            is_encrypted: false,
            is_trash: false,
            original_path: None,
        }
    }

    /// Project a backend listing entry found under `parent_id` with real path `id`
    pub fn from_entry(id: String, parent_id: String, entry: &DirEntry) -> Self {
        let file_type = if entry.is_dir {
            FileType::Folder
        } else {
            FileType::from_name(&entry.name)
        };

        Self {
            id,
            parent_id: Some(parent_id),
            name: entry.name.clone(),
            file_type,
            size: entry.size,
            updated_at: entry.mtime,
            capacity: None,
            is_protected: false,
            is_hidden: crate::is_hidden_name(&entry.name),
            is_encrypted: !entry.is_dir && entry.name.ends_with(".enc"),
            is_trash: false,
            original_path: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.file_type == FileType::Folder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(FileType::from_name("IMG_0001.JPG"), FileType::Image);
        assert_eq!(FileType::from_name("clip.mp4"), FileType::Video);
        assert_eq!(FileType::from_name("song.flac"), FileType::Audio);
        assert_eq!(FileType::from_name("report.pdf"), FileType::Document);
        assert_eq!(FileType::from_name("backup.7z"), FileType::Archive);
        assert_eq!(FileType::from_name("Makefile"), FileType::Unknown);
        assert_eq!(FileType::from_name(".bashrc"), FileType::Unknown);
    }

    #[test]
    fn test_encrypted_keeps_inner_type() {
        assert_eq!(FileType::from_name("secret.txt.enc"), FileType::Document);
    }

    #[test]
    fn test_parse_round_trips_names() {
        for t in FileType::ALL {
            assert_eq!(FileType::parse(t.as_str()), Some(t));
        }
        assert_eq!(FileType::parse("photos"), None);
    }

    #[test]
    fn test_node_json_shape() {
        let node = VirtualNode::folder("DCIM", Some("root_internal".into()), "DCIM");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "folder");
        assert_eq!(json["parentId"], "root_internal");
        assert!(json.get("capacity").is_none());
    }
}

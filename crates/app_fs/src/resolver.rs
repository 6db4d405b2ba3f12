//! Path resolution between the virtual namespace and real relative paths
//!
//! The UI addresses everything with a single string id. Sentinel ids name
//! virtual pseudo-folders; every other id is a real path relative to the
//! storage root. Ids are parsed once into [`VirtualId`] so downstream code
//! never matches string prefixes.

use crate::{FileType, VirtualNode};

pub const ROOT_ID: &str = "root";
pub const INTERNAL_ROOT_ID: &str = "root_internal";
pub const TRASH_ID: &str = "trash";
pub const RECENT_ID: &str = "recent";
pub const FAVORITES_ID: &str = "favorites";
pub const CATEGORY_PREFIX: &str = "category_";

/// Configurable sentinel names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinels {
    /// Sentinel id of the vault
    pub vault_id: String,
    /// Real directory backing the vault
    pub vault_dir: String,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self {
            vault_id: "vault".to_string(),
            vault_dir: ".vault".to_string(),
        }
    }
}

/// A parsed node identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualId {
    /// Top of the namespace (drives)
    Root,
    /// Internal storage drive root (real path "")
    InternalRoot,
    Trash,
    Recent,
    Favorites,
    Category(FileType),
    Vault,
    /// Real path relative to the storage root
    Path(String),
}

/// What a listing of an id dispatches to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedListing {
    Drives,
    Trash,
    Recent,
    Favorites,
    Category(FileType),
    /// Real directory backing the vault
    Vault(String),
    /// Literal relative path handed to the backend
    Real(String),
}

impl VirtualId {
    pub fn parse(id: &str, sentinels: &Sentinels) -> Self {
        match id {
            ROOT_ID => return VirtualId::Root,
            INTERNAL_ROOT_ID | "" => return VirtualId::InternalRoot,
            TRASH_ID => return VirtualId::Trash,
            RECENT_ID => return VirtualId::Recent,
            FAVORITES_ID => return VirtualId::Favorites,
            _ => {}
        }

        if id == sentinels.vault_id {
            return VirtualId::Vault;
        }

        if let Some(file_type) = id.strip_prefix(CATEGORY_PREFIX).and_then(FileType::parse) {
            return VirtualId::Category(file_type);
        }

        let path = id.trim_matches('/');
        if path.is_empty() {
            VirtualId::InternalRoot
        } else {
            VirtualId::Path(path.to_string())
        }
    }

    /// The string form handed back to callers
    pub fn to_id(&self, sentinels: &Sentinels) -> String {
        match self {
            VirtualId::Root => ROOT_ID.to_string(),
            VirtualId::InternalRoot => INTERNAL_ROOT_ID.to_string(),
            VirtualId::Trash => TRASH_ID.to_string(),
            VirtualId::Recent => RECENT_ID.to_string(),
            VirtualId::Favorites => FAVORITES_ID.to_string(),
            VirtualId::Category(t) => format!("{}{}", CATEGORY_PREFIX, t.as_str()),
            VirtualId::Vault => sentinels.vault_id.clone(),
            VirtualId::Path(p) => p.clone(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, VirtualId::Path(_))
    }

    pub fn resolve_listing(&self, sentinels: &Sentinels) -> ResolvedListing {
        match self {
            VirtualId::Root => ResolvedListing::Drives,
            VirtualId::InternalRoot => ResolvedListing::Real(String::new()),
            VirtualId::Trash => ResolvedListing::Trash,
            VirtualId::Recent => ResolvedListing::Recent,
            VirtualId::Favorites => ResolvedListing::Favorites,
            VirtualId::Category(t) => ResolvedListing::Category(*t),
            VirtualId::Vault => ResolvedListing::Vault(sentinels.vault_dir.clone()),
            VirtualId::Path(p) => ResolvedListing::Real(p.clone()),
        }
    }

    /// Real relative path of this id, if it has one
    pub fn real_path(&self, sentinels: &Sentinels) -> Option<String> {
        match self {
            VirtualId::InternalRoot => Some(String::new()),
            VirtualId::Vault => Some(sentinels.vault_dir.clone()),
            VirtualId::Path(p) => Some(p.clone()),
            _ => None,
        }
    }

    /// Synthetic node for a sentinel id
    pub fn sentinel_node(&self, sentinels: &Sentinels) -> Option<VirtualNode> {
        let root = Some(ROOT_ID.to_string());
        let node = match self {
            VirtualId::Root | VirtualId::Path(_) => return None,
            VirtualId::InternalRoot => VirtualNode::folder(INTERNAL_ROOT_ID, root, "Internal Storage"),
            VirtualId::Trash => VirtualNode::folder(TRASH_ID, root, "Trash"),
            VirtualId::Recent => VirtualNode::folder(RECENT_ID, root, "Recent"),
            VirtualId::Favorites => VirtualNode::folder(FAVORITES_ID, root, "Favorites"),
            VirtualId::Category(t) => VirtualNode::folder(self.to_id(sentinels), root, category_label(*t)),
            VirtualId::Vault => {
                let mut node = VirtualNode::folder(sentinels.vault_id.clone(), root, "Vault");
                node.is_protected = true;
                node
            }
        };
        Some(node)
    }
}

fn category_label(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Folder => "Folders",
        FileType::Image => "Images",
        FileType::Video => "Videos",
        FileType::Audio => "Audio",
        FileType::Document => "Documents",
        FileType::Archive => "Archives",
        FileType::Unknown => "Other",
    }
}

/// Breadcrumb trail for an id.
///
/// A real path `A/B/C` yields the internal-storage root followed by one
/// folder node per prefix (`A`, `A/B`, `A/B/C`). Paths inside the vault
/// directory start from the vault node instead.
pub fn path_trail(id: &VirtualId, sentinels: &Sentinels) -> Vec<VirtualNode> {
    let path = match id {
        VirtualId::Root => return Vec::new(),
        VirtualId::Path(p) => p.as_str(),
        other => return other.sentinel_node(sentinels).into_iter().collect(),
    };

    let in_vault = path == sentinels.vault_dir
        || path.starts_with(&format!("{}/", sentinels.vault_dir));

    let mut trail = Vec::new();
    let (head, rest) = if in_vault {
        trail.extend(VirtualId::Vault.sentinel_node(sentinels));
        (sentinels.vault_dir.as_str(), path[sentinels.vault_dir.len()..].trim_start_matches('/'))
    } else {
        trail.extend(VirtualId::InternalRoot.sentinel_node(sentinels));
        ("", path)
    };

    let mut prefix = head.to_string();
    for segment in rest.split('/').filter(|s| !s.is_empty()) {
        let parent_id = if prefix.is_empty() {
            INTERNAL_ROOT_ID.to_string()
        } else if in_vault && prefix == sentinels.vault_dir {
            sentinels.vault_id.clone()
        } else {
            prefix.clone()
        };
        prefix = join_path(&prefix, segment);
        trail.push(VirtualNode::folder(prefix.clone(), Some(parent_id), segment));
    }

    trail
}

/// Id of the node addressing the real directory `path`.
/// Children listed from `path` carry this as their parent id.
pub fn dir_id(path: &str, sentinels: &Sentinels) -> String {
    if path.is_empty() {
        INTERNAL_ROOT_ID.to_string()
    } else if path == sentinels.vault_dir {
        sentinels.vault_id.clone()
    } else {
        path.to_string()
    }
}

/// Join a relative directory path and a child name
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

/// Parent of a relative path; `None` for top-level entries
pub fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

/// Last segment of a relative path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentinels() -> Sentinels {
        Sentinels::default()
    }

    #[test]
    fn test_parse_sentinels() {
        let s = sentinels();
        assert_eq!(VirtualId::parse("root", &s), VirtualId::Root);
        assert_eq!(VirtualId::parse("root_internal", &s), VirtualId::InternalRoot);
        assert_eq!(VirtualId::parse("trash", &s), VirtualId::Trash);
        assert_eq!(VirtualId::parse("vault", &s), VirtualId::Vault);
        assert_eq!(
            VirtualId::parse("category_image", &s),
            VirtualId::Category(FileType::Image)
        );
    }

    #[test]
    fn test_unknown_category_is_a_path() {
        let s = sentinels();
        assert_eq!(
            VirtualId::parse("category_photos", &s),
            VirtualId::Path("category_photos".into())
        );
    }

    #[test]
    fn test_parse_real_path() {
        let s = sentinels();
        assert_eq!(
            VirtualId::parse("/DCIM/IMG_01.jpg", &s),
            VirtualId::Path("DCIM/IMG_01.jpg".into())
        );
        assert_eq!(
            VirtualId::parse("DCIM", &s).resolve_listing(&s),
            ResolvedListing::Real("DCIM".into())
        );
    }

    #[test]
    fn test_trail_for_real_path() {
        let s = sentinels();
        let trail = path_trail(&VirtualId::Path("A/B/C".into()), &s);
        let ids: Vec<_> = trail.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["root_internal", "A", "A/B", "A/B/C"]);

        let parents: Vec<_> = trail.iter().map(|n| n.parent_id.as_deref()).collect();
        assert_eq!(
            parents,
            vec![Some("root"), Some("root_internal"), Some("A"), Some("A/B")]
        );
        assert_eq!(trail[3].name, "C");
    }

    #[test]
    fn test_trail_for_sentinels() {
        let s = sentinels();
        assert!(path_trail(&VirtualId::Root, &s).is_empty());

        let trash = path_trail(&VirtualId::Trash, &s);
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0].id, "trash");

        let category = path_trail(&VirtualId::Category(FileType::Video), &s);
        assert_eq!(category[0].id, "category_video");
        assert_eq!(category[0].name, "Videos");
    }

    #[test]
    fn test_trail_inside_vault() {
        let s = sentinels();
        let trail = path_trail(&VirtualId::Path(".vault/tax/2024".into()), &s);
        let ids: Vec<_> = trail.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["vault", ".vault/tax", ".vault/tax/2024"]);
        assert_eq!(trail[1].parent_id.as_deref(), Some("vault"));
        assert!(trail[0].is_protected);
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a/b", "c"), "a/b/c");
        assert_eq!(parent_path("a/b/c"), Some("a/b"));
        assert_eq!(parent_path("a"), None);
        assert_eq!(file_name("a/b/c.txt"), "c.txt");
        assert_eq!(file_name("c.txt"), "c.txt");
    }

    #[test]
    fn test_dir_id() {
        let s = sentinels();
        assert_eq!(dir_id("", &s), "root_internal");
        assert_eq!(dir_id(".vault", &s), "vault");
        assert_eq!(dir_id("DCIM/Camera", &s), "DCIM/Camera");
    }
}

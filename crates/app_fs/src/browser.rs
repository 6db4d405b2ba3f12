//! Directory listing order and filters

use crate::{DirEntry, VirtualNode};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort key for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortBy {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "size")]
    Size,
    #[serde(rename = "modified")]
    Modified,
    #[serde(rename = "type")]
    Type,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// Options for listing directory contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOptions {
    pub show_hidden: bool,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            show_hidden: false,
            sort_by: SortBy::Name,
            sort_order: SortOrder::Ascending,
        }
    }
}

impl ListOptions {
    /// Whether a raw entry survives the hidden filter
    pub fn admits(&self, entry: &DirEntry) -> bool {
        self.show_hidden || !is_hidden_name(&entry.name)
    }
}

/// Dot-files are hidden on every platform the façade targets
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// Sort nodes in place. Folders always come first.
pub fn sort_nodes(nodes: &mut [VirtualNode], sort_by: SortBy, order: SortOrder) {
    nodes.sort_by(|a, b| {
        if a.is_folder() != b.is_folder() {
            return if a.is_folder() { Ordering::Less } else { Ordering::Greater };
        }

        let by_name = || natural_sort_key(&a.name).cmp(&natural_sort_key(&b.name));
        let cmp = match sort_by {
            SortBy::Name => by_name(),
            SortBy::Size => a.size.cmp(&b.size).then_with(by_name),
            SortBy::Modified => a.updated_at.cmp(&b.updated_at).then_with(by_name),
            SortBy::Type => a.file_type.cmp(&b.file_type).then_with(by_name),
        };

        match order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });
}

/// Generate a natural sort key (handles numbers correctly)
/// "image2.jpg" < "image10.jpg"
fn natural_sort_key(s: &str) -> Vec<NaturalSortPart> {
    let mut parts = Vec::new();
    let mut digits = String::new();
    let mut text = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            if !text.is_empty() {
                parts.push(NaturalSortPart::Str(text.to_lowercase()));
                text.clear();
            }
            digits.push(c);
        } else {
            if !digits.is_empty() {
                parts.push(NaturalSortPart::num(&digits));
                digits.clear();
            }
            text.push(c);
        }
    }

    if !digits.is_empty() {
        parts.push(NaturalSortPart::num(&digits));
    }
    if !text.is_empty() {
        parts.push(NaturalSortPart::Str(text.to_lowercase()));
    }

    parts
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum NaturalSortPart {
    Num(u64),
    Str(String),
}

impl NaturalSortPart {
    // Runs too long for u64 saturate rather than being dropped
    fn num(digits: &str) -> Self {
        NaturalSortPart::Num(digits.parse().unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileType;

    fn file(name: &str, size: u64) -> VirtualNode {
        let mut node = VirtualNode::folder(name, None, name);
        node.file_type = FileType::from_name(name);
        node.size = size;
        node
    }

    #[test]
    fn test_natural_sort() {
        let mut names = vec!["image10.jpg", "image2.jpg", "image1.jpg", "image20.jpg"];
        names.sort_by(|a, b| natural_sort_key(a).cmp(&natural_sort_key(b)));
        assert_eq!(names, vec!["image1.jpg", "image2.jpg", "image10.jpg", "image20.jpg"]);
    }

    #[test]
    fn test_folders_first() {
        let mut nodes = vec![
            file("b.txt", 1),
            VirtualNode::folder("Zeta", None, "Zeta"),
            file("a.txt", 1),
        ];
        sort_nodes(&mut nodes, SortBy::Name, SortOrder::Ascending);
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_size_descending() {
        let mut nodes = vec![file("small.txt", 1), file("big.txt", 100), file("mid.txt", 10)];
        sort_nodes(&mut nodes, SortBy::Size, SortOrder::Descending);
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["big.txt", "mid.txt", "small.txt"]);
    }

    #[test]
    fn test_hidden_filter() {
        let entry = DirEntry { name: ".thumbnails".into(), is_dir: true, size: 0, mtime: 0 };
        assert!(!ListOptions::default().admits(&entry));
        let shown = ListOptions { show_hidden: true, ..Default::default() };
        assert!(shown.admits(&entry));
    }
}

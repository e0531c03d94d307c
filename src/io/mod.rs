//! Collaborator ports: markup transport, container storage, media probing.
//!
//! The model never touches files directly. Markup trees cross `MarkupIo`,
//! asset bytes cross `Container`, and media metadata comes from
//! `MediaProbe`. `DirContainer` is the plain uncompressed-directory
//! backend; archive containers and real markup text parsing are
//! implemented by embedders against these traits.
//!
//! Member paths are container-relative with forward slashes
//! ("LIBRARY/hero.xml", "bin/hit.dat").

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, XflError};
use crate::markup::Node;

/// Markup tree transport for document files inside a container.
pub trait MarkupIo {
    fn load_node(&self, path: &str) -> Result<Node>;
    fn save_node(&self, path: &str, node: &Node) -> Result<()>;
}

/// Byte storage for container members.
pub trait Container: Send + Sync {
    fn exists(&self, member: &str) -> bool;
    fn read(&self, member: &str) -> Result<Vec<u8>>;
    fn write(&self, member: &str, bytes: &[u8]) -> Result<()>;
    fn remove(&self, member: &str) -> Result<()>;
    fn rename(&self, from: &str, to: &str) -> Result<()>;
}

/// Metadata of a sound source, as reported by a probe.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SoundInfo {
    pub sample_rate: u32,
    pub sample_count: u64,
    pub duration_secs: f64,
}

/// Media metadata extraction for imports. Decoding is out of scope; an
/// embedder backs this with its codec stack.
pub trait MediaProbe {
    fn bitmap_size(&self, path: &Path) -> Result<(u32, u32)>;
    fn sound_info(&self, path: &Path) -> Result<SoundInfo>;
}

/// Probe that reports zeroed metadata; imports still classify and journal.
#[derive(Debug, Default)]
pub struct NullProbe;

impl MediaProbe for NullProbe {
    fn bitmap_size(&self, _path: &Path) -> Result<(u32, u32)> {
        Ok((0, 0))
    }

    fn sound_info(&self, _path: &Path) -> Result<SoundInfo> {
        Ok(SoundInfo::default())
    }
}

// ========== Directory backend ==========

/// Container backed by a plain directory (the uncompressed XFL layout).
#[derive(Debug, Clone)]
pub struct DirContainer {
    root: PathBuf,
}

impl DirContainer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, member: &str) -> PathBuf {
        let mut path = self.root.clone();
        for part in member.split('/') {
            path.push(part);
        }
        path
    }
}

impl Container for DirContainer {
    fn exists(&self, member: &str) -> bool {
        self.resolve(member).is_file()
    }

    fn read(&self, member: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.resolve(member))?)
    }

    fn write(&self, member: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(member);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn remove(&self, member: &str) -> Result<()> {
        std::fs::remove_file(self.resolve(member))?;
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let target = self.resolve(to);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(self.resolve(from), target)?;
        Ok(())
    }
}

// ========== In-memory markup store ==========

/// `MarkupIo` over an in-memory map; the transport used in tests and by
/// embedders that keep parsed trees around.
#[derive(Debug, Default)]
pub struct MemoryMarkup {
    nodes: Mutex<HashMap<String, Node>>,
}

impl MemoryMarkup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, node: Node) {
        self.nodes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.into(), node);
    }

    pub fn get(&self, path: &str) -> Option<Node> {
        self.nodes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .nodes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}

impl MarkupIo for MemoryMarkup {
    fn load_node(&self, path: &str) -> Result<Node> {
        self.get(path).ok_or_else(|| {
            XflError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no markup document at '{}'", path),
            ))
        })
    }

    fn save_node(&self, path: &str, node: &Node) -> Result<()> {
        self.insert(path, node.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_container_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let container = DirContainer::new(dir.path());

        assert!(!container.exists("LIBRARY/a.png"));
        container.write("LIBRARY/a.png", b"bytes").unwrap();
        assert!(container.exists("LIBRARY/a.png"));
        assert_eq!(container.read("LIBRARY/a.png").unwrap(), b"bytes");

        container.rename("LIBRARY/a.png", "LIBRARY/sub/b.png").unwrap();
        assert!(!container.exists("LIBRARY/a.png"));
        assert!(container.exists("LIBRARY/sub/b.png"));

        container.remove("LIBRARY/sub/b.png").unwrap();
        assert!(!container.exists("LIBRARY/sub/b.png"));
    }

    #[test]
    fn test_memory_markup_missing_is_io() {
        let io = MemoryMarkup::new();
        assert!(matches!(
            io.load_node("DOMDocument.xml"),
            Err(XflError::Io(_))
        ));
        io.save_node("DOMDocument.xml", &Node::new("DOMDocument")).unwrap();
        assert_eq!(io.load_node("DOMDocument.xml").unwrap().name, "DOMDocument");
    }
}

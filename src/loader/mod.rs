//! Character and animation asset loading.
//!
//! Character loads fail loudly with [`LoadError`]. Animation loads never
//! fail: anything unusable becomes the fallback wave clip.

pub mod animation;
pub mod character;
pub mod glb;

pub use animation::{clips_or_fallback, decode_animations, load_animation};
pub use character::{CharacterLoader, LoadedCharacter};

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::LoadError;

/// Read an asset file.
pub async fn read_asset(path: &Path) -> Result<Vec<u8>, LoadError> {
    tokio::fs::read(path).await.map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Display name of an asset: file name without its extension.
pub fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Generation number handed out when a load starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// Orders overlapping character loads: only the newest request may commit.
#[derive(Debug, Default)]
pub struct LoadSequencer {
    latest: AtomicU64,
}

impl LoadSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new load, superseding every earlier ticket.
    pub fn begin(&self) -> LoadTicket {
        LoadTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Invalidate every outstanding ticket, e.g. on teardown.
    pub fn cancel_all(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_extension() {
        assert_eq!(display_name(Path::new("models/Lyra.vrm")), "Lyra");
        assert_eq!(display_name(Path::new("VRMA_01.vrma")), "VRMA_01");
    }

    #[test]
    fn test_sequencer_keeps_only_newest() {
        let sequencer = LoadSequencer::new();
        let first = sequencer.begin();
        let second = sequencer.begin();
        assert!(first < second);
        assert!(!sequencer.is_current(first));
        assert!(sequencer.is_current(second));

        sequencer.cancel_all();
        assert!(!sequencer.is_current(second));
    }

    #[tokio::test]
    async fn test_read_missing_asset() {
        let err = read_asset(Path::new("does/not/exist.vrm")).await.unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}

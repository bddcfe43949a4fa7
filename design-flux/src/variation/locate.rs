//! Ordered lookup of the original screenshot used as the edit base

use std::path::PathBuf;

use design_flux_sdk::log_debug;

use crate::capture::Capture;
use crate::mapper::ComponentMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotCandidate {
    pub path: PathBuf,
    pub is_desktop: bool,
}

impl ScreenshotCandidate {
    pub fn desktop(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_desktop: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocatedScreenshot {
    pub capture: Capture,
    pub is_desktop: bool,
}

/// Candidates for a component map: the device-pair desktop capture if any,
/// then segment captures from the top of the page down
pub fn candidates_for(map: &ComponentMap) -> Vec<ScreenshotCandidate> {
    let mut candidates = Vec::new();
    if let Some(devices) = &map.device_analysis {
        candidates.push(ScreenshotCandidate::desktop(&devices.desktop_path));
    }
    candidates.extend(map.screenshot_paths().into_iter().map(ScreenshotCandidate::desktop));
    candidates
}

/// First candidate that exists and decodes
pub async fn locate(candidates: &[ScreenshotCandidate]) -> Option<LocatedScreenshot> {
    for candidate in candidates {
        let bytes = match tokio::fs::read(&candidate.path).await {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };
        match Capture::from_bytes(&candidate.path, bytes) {
            Ok(capture) => {
                return Some(LocatedScreenshot {
                    capture,
                    is_desktop: candidate.is_desktop,
                })
            }
            Err(err) => log_debug!("Skipping {}: {:#}", candidate.path.display(), err),
        }
    }
    None
}

//! Per-video bitrate catalog.
//!
//! # Responsibilities
//! - Cache the bitrates each video path advertises, keyed by path
//! - Parse a manifest body into its video-track bitrate list
//!
//! # Design Decisions
//! - Cache-on-miss, never invalidated: the origin's catalog is static for
//!   the life of the run
//! - Manifest document order is preserved, not sorted (see DESIGN.md)
//! - The catalog holds no sockets; fetching the manifest over a pair's
//!   origin connection is the relay's job

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

/// The media type of the adaptation set the catalog is built from.
pub const VIDEO_MIME_TYPE: &str = "video/mp4";

/// Error type for manifest parsing.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest body is not valid XML: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Bitrates advertised per video path, in manifest document order.
#[derive(Debug, Default)]
pub struct BitrateCatalog {
    videos: DashMap<String, Arc<Vec<u32>>>,
}

impl BitrateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached bitrate list for a path, if already populated.
    pub fn get(&self, path: &str) -> Option<Arc<Vec<u32>>> {
        self.videos.get(path).map(|rates| Arc::clone(&rates))
    }

    /// Record the bitrate list for a path. The first writer wins if two
    /// pairs populate the same path at once; both lists come from the same
    /// static manifest.
    pub fn insert(&self, path: String, rates: Vec<u32>) -> Arc<Vec<u32>> {
        let entry = self.videos.entry(path).or_insert_with(|| Arc::new(rates));
        Arc::clone(&entry)
    }
}

fn is_named(node: &roxmltree::Node<'_, '_>, name: &str) -> bool {
    // Local-name comparison: manifests carry the DASH default namespace.
    node.tag_name().name() == name
}

/// Collect every video-representation bandwidth from a manifest body.
///
/// Walks root `MPD` → first `Period` → each `AdaptationSet` with
/// `mimeType="video/mp4"` → each `Representation`'s `bandwidth` attribute,
/// preserving document order.
pub fn parse_manifest_bitrates(body: &str) -> Result<Vec<u32>, ManifestError> {
    let doc = roxmltree::Document::parse(body)?;
    let mut rates = Vec::new();

    let root = doc.root_element();
    if !is_named(&root, "MPD") {
        return Ok(rates);
    }
    let Some(period) = root.children().find(|n| is_named(n, "Period")) else {
        return Ok(rates);
    };
    for set in period.children().filter(|n| is_named(n, "AdaptationSet")) {
        if set.attribute("mimeType") != Some(VIDEO_MIME_TYPE) {
            continue;
        }
        for representation in set.children().filter(|n| is_named(n, "Representation")) {
            if let Some(bandwidth) = representation.attribute("bandwidth") {
                if let Ok(rate) = bandwidth.parse() {
                    rates.push(rate);
                }
            }
        }
    }
    Ok(rates)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static">
  <Period duration="PT634S">
    <AdaptationSet mimeType="audio/mp4" segmentAlignment="true">
      <Representation id="audio" bandwidth="128"/>
    </AdaptationSet>
    <AdaptationSet mimeType="video/mp4" segmentAlignment="true">
      <Representation id="v0" bandwidth="500"/>
      <Representation id="v1" bandwidth="1000"/>
      <Representation id="v2" bandwidth="2000"/>
      <Representation id="v3" bandwidth="4000"/>
    </AdaptationSet>
  </Period>
</MPD>"#;

    #[test]
    fn collects_video_bitrates_in_document_order() {
        let rates = parse_manifest_bitrates(MANIFEST).unwrap();
        assert_eq!(rates, vec![500, 1000, 2000, 4000]);
    }

    #[test]
    fn audio_adaptation_sets_are_ignored() {
        let rates = parse_manifest_bitrates(MANIFEST).unwrap();
        assert!(!rates.contains(&128));
    }

    #[test]
    fn manifest_without_video_tracks_yields_empty_catalog() {
        let body = r#"<MPD><Period>
            <AdaptationSet mimeType="audio/mp4">
              <Representation bandwidth="128"/>
            </AdaptationSet>
        </Period></MPD>"#;
        assert!(parse_manifest_bitrates(body).unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse_manifest_bitrates("<MPD><Period>").is_err());
    }

    #[test]
    fn catalog_returns_what_was_inserted() {
        let catalog = BitrateCatalog::new();
        assert!(catalog.get("/videos/bbb").is_none());
        catalog.insert("/videos/bbb".to_string(), vec![500, 1000]);
        assert_eq!(*catalog.get("/videos/bbb").unwrap(), vec![500, 1000]);
    }

    #[test]
    fn first_insert_wins() {
        let catalog = BitrateCatalog::new();
        catalog.insert("/videos/bbb".to_string(), vec![500]);
        catalog.insert("/videos/bbb".to_string(), vec![9999]);
        assert_eq!(*catalog.get("/videos/bbb").unwrap(), vec![500]);
    }
}

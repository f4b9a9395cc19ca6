//! Job manifest parsing.
//!
//! Each job folder carries one XML descriptor written by the render
//! manager. The fields the engine cares about live under three nested
//! sections: `JobInfo` (identity and timestamps), `JobFlags` (active /
//! complete), and `Output` (the rendered artifact path). Everything else
//! in the descriptor is ignored.

use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ManifestError;

/// Typed view of one job descriptor. Parsed once per job folder and not
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobManifest {
    pub active: Option<String>,
    pub complete: Option<String>,
    pub computer: Option<String>,
    pub name: Option<String>,
    pub submitted: Option<String>,
    pub description: Option<String>,
    pub last_updated: Option<String>,
    pub output_path: Option<String>,
}

impl JobManifest {
    /// Directory holding the render outputs, derived from the output
    /// artifact path. Previews are discovered here.
    pub fn output_directory(&self) -> Option<PathBuf> {
        let path = self.output_path.as_deref()?;
        let parent = Path::new(path).parent()?;
        if parent.as_os_str().is_empty() {
            return None;
        }
        Some(parent.to_path_buf())
    }
}

/// Read and parse the manifest at `path`.
pub fn read_manifest(path: &Path) -> Result<JobManifest, ManifestError> {
    let xml = std::fs::read_to_string(path).map_err(|e| ManifestError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_manifest(&xml).map_err(|e| ManifestError::ParseXml {
        path: path.to_path_buf(),
        source: e,
    })
}

fn parse_manifest(xml: &str) -> Result<JobManifest, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut manifest = JobManifest::default();
    // Element name stack; fields are matched on (parent, leaf) so that
    // Output/Name and JobInfo/Name stay distinct.
    let mut stack: Vec<Vec<u8>> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(e.local_name().as_ref().to_vec()),
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(e)) => {
                let value = e.unescape().unwrap_or_default().trim().to_string();
                if value.is_empty() {
                    continue;
                }
                let leaf = stack.last().map(Vec::as_slice).unwrap_or_default();
                let parent = stack
                    .len()
                    .checked_sub(2)
                    .and_then(|i| stack.get(i))
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                match (parent, leaf) {
                    (b"JobFlags", b"Active") => manifest.active = Some(value),
                    (b"JobFlags", b"Complete") => manifest.complete = Some(value),
                    (b"JobInfo", b"Computer") => manifest.computer = Some(value),
                    (b"JobInfo", b"Name") => manifest.name = Some(value),
                    (b"JobInfo", b"Submitted") => manifest.submitted = Some(value),
                    (b"JobInfo", b"Description") => manifest.description = Some(value),
                    (b"JobInfo", b"LastUpdated") => manifest.last_updated = Some(value),
                    (b"Output", b"Name") => manifest.output_path = Some(value),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e),
            _ => {}
        }
    }

    Ok(manifest)
}

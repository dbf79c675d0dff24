//! Off-thread loading of the actor model.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver},
    thread,
};

use serde::{de::IgnoredAny, Deserialize};
use skyride_engine::ActorAssetResult;
use skyride_system_pose::ActorModel;
use tracing::{debug, warn};

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const JSON_CHUNK: &[u8; 4] = b"JSON";

/// Top-level glTF fields the loader cares about.
#[derive(Debug, Deserialize)]
struct GltfDocument {
    asset: GltfAsset,
    #[serde(default)]
    animations: Vec<IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct GltfAsset {
    version: String,
}

/// Reads `path` on a worker thread and reports the outcome over a channel.
pub(crate) fn spawn(path: PathBuf) -> Receiver<ActorAssetResult> {
    let (sender, receiver) = mpsc::channel();
    let _ = thread::spawn(move || {
        let result = load(&path);
        if let Err(error) = &result {
            warn!(path = %path.display(), %error, "actor model failed to load");
        }
        let _ = sender.send(result);
    });
    receiver
}

fn load(path: &Path) -> ActorAssetResult {
    let bytes = fs::read(path).map_err(|error| format!("{}: {error}", path.display()))?;
    let name = path
        .file_stem()
        .map_or_else(|| "actor".to_owned(), |stem| stem.to_string_lossy().into_owned());
    let model = describe(name, &bytes)?;
    debug!(?model, "actor model decoded");
    Ok(model)
}

/// Validates a glTF document and counts its animation clips.
///
/// Binary `.glb` containers and plain JSON `.gltf` documents are accepted.
pub(crate) fn describe(name: String, bytes: &[u8]) -> ActorAssetResult {
    let json = if bytes.starts_with(GLB_MAGIC) {
        glb_json_chunk(bytes)?
    } else {
        bytes
    };
    let document: GltfDocument = serde_json::from_slice(json)
        .map_err(|error| format!("model is not a glTF document: {error}"))?;
    debug!(version = %document.asset.version, "glTF asset header");

    Ok(ActorModel::Loaded {
        name,
        byte_len: bytes.len(),
        clip_count: document.animations.len(),
    })
}

fn glb_json_chunk(bytes: &[u8]) -> Result<&[u8], String> {
    let chunk_start = GLB_HEADER_LEN + CHUNK_HEADER_LEN;
    if bytes.len() < chunk_start {
        return Err("binary model is truncated".to_owned());
    }
    let length_bytes = [
        bytes[GLB_HEADER_LEN],
        bytes[GLB_HEADER_LEN + 1],
        bytes[GLB_HEADER_LEN + 2],
        bytes[GLB_HEADER_LEN + 3],
    ];
    let chunk_len = u32::from_le_bytes(length_bytes) as usize;
    if &bytes[GLB_HEADER_LEN + 4..chunk_start] != JSON_CHUNK {
        return Err("binary model does not start with a JSON chunk".to_owned());
    }
    bytes
        .get(chunk_start..chunk_start + chunk_len)
        .ok_or_else(|| "binary model chunk overruns the file".to_owned())
}

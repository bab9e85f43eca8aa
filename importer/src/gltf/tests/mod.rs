use serde_json::Value;

use crate::gltf::{GltfImporter, ImportError, ResourceBundle};


/// Pack a JSON document and binary chunk into a GLB container.
fn glb(json: &Value, bin: &[u8]) -> Vec<u8> {
    let mut json_bytes = serde_json::to_vec(json).unwrap();
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let mut total = 12 + 8 + json_bytes.len();
    if !bin.is_empty() {
        total += 8 + bin.len();
    }
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json_bytes);
    if !bin.is_empty() {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
    }
    out
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

/// One right triangle in the XY plane.
const TRIANGLE: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

/// `POSITION` accessor JSON for [`TRIANGLE`] stored in `view`.
fn triangle_accessor(view: usize) -> Value {
    serde_json::json!({
        "bufferView": view,
        "componentType": 5126,
        "count": 3,
        "type": "VEC3",
        "min": [0.0, 0.0, 0.0],
        "max": [1.0, 1.0, 0.0]
    })
}

fn import_with(importer: &GltfImporter, bytes: &[u8]) -> Result<ResourceBundle, ImportError> {
    let _ = env_logger::builder().is_test(true).try_init();
    pollster::block_on(importer.import("test.glb", "", bytes))
}

fn import(bytes: &[u8]) -> Result<ResourceBundle, ImportError> {
    import_with(&GltfImporter::new(), bytes)
}

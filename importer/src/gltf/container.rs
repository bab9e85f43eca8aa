//! GLB container splitting and JSON document parsing.
//!
//! GLB layout (all integers little-endian):
//!
//! ```text
//! header: magic u32 = "glTF", version u32 = 2, length u32
//! chunk:  length u32, type u32, data[length]
//! ```
//!
//! The first chunk must be JSON, an optional second chunk must be BIN.

use super::document::Document;
use super::error::ImportError;

pub const GLB_MAGIC: u32 = 0x46546C67;
pub const GLB_VERSION: u32 = 2;
pub const CHUNK_JSON: u32 = 0x4E4F534A;
pub const CHUNK_BIN: u32 = 0x004E4942;

const HEADER_SIZE: usize = 12;
const CHUNK_HEADER_SIZE: usize = 8;
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// JSON text and optional embedded binary chunk of an asset.
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    pub json: &'a [u8],
    pub binary: Option<&'a [u8]>,
}

/// Split input bytes into JSON and binary parts.
///
/// Input is treated as GLB when the filename ends in `.glb` or the data
/// starts with the GLB magic; anything else is bare glTF JSON.
pub fn split<'a>(filename: &str, bytes: &'a [u8]) -> Result<Container<'a>, ImportError> {
    let by_name = filename.to_ascii_lowercase().ends_with(".glb");
    let by_magic = read_u32(bytes, 0) == Some(GLB_MAGIC);
    if by_name || by_magic {
        parse_glb(bytes)
    } else {
        Ok(Container {
            json: bytes,
            binary: None,
        })
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let b = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn parse_glb(bytes: &[u8]) -> Result<Container<'_>, ImportError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ImportError::Format(format!(
            "GLB header needs {HEADER_SIZE} bytes, got {}",
            bytes.len()
        )));
    }
    let magic = read_u32(bytes, 0).unwrap_or_default();
    if magic != GLB_MAGIC {
        return Err(ImportError::Format(format!(
            "invalid GLB magic 0x{magic:08X}, expected 0x{GLB_MAGIC:08X}"
        )));
    }
    let version = read_u32(bytes, 4).unwrap_or_default();
    if version != GLB_VERSION {
        return Err(ImportError::Format(format!(
            "unsupported GLB version {version}"
        )));
    }
    let length = read_u32(bytes, 8).unwrap_or_default() as usize;
    if length > bytes.len() {
        return Err(ImportError::Format(format!(
            "GLB declares {length} bytes but only {} are available",
            bytes.len()
        )));
    }
    if length < HEADER_SIZE {
        return Err(ImportError::Format(format!(
            "GLB declared length {length} is smaller than its header"
        )));
    }

    let mut chunks = Vec::with_capacity(2);
    let mut offset = HEADER_SIZE;
    while offset < length {
        let (Some(chunk_length), Some(chunk_type)) =
            (read_u32(bytes, offset), read_u32(bytes, offset + 4))
        else {
            return Err(ImportError::Format(format!(
                "truncated chunk header at byte {offset}"
            )));
        };
        let start = offset + CHUNK_HEADER_SIZE;
        let end = start + chunk_length as usize;
        if end > length {
            return Err(ImportError::Format(format!(
                "chunk at byte {offset} ({chunk_length} bytes) runs past the end of the container"
            )));
        }
        chunks.push((chunk_type, &bytes[start..end]));
        offset = end;
    }

    match chunks.as_slice() {
        [(CHUNK_JSON, json)] => Ok(Container {
            json: *json,
            binary: None,
        }),
        [(CHUNK_JSON, json), (CHUNK_BIN, bin)] => Ok(Container {
            json: *json,
            binary: Some(*bin),
        }),
        [] => Err(ImportError::Format("GLB contains no chunks".into())),
        [(first, _), ..] if *first != CHUNK_JSON => Err(ImportError::Format(format!(
            "first GLB chunk must be JSON, found type 0x{first:08X}"
        ))),
        [_, (second, _)] => Err(ImportError::Format(format!(
            "second GLB chunk must be BIN, found type 0x{second:08X}"
        ))),
        _ => Err(ImportError::Format(format!(
            "GLB must contain 1 or 2 chunks, found {}",
            chunks.len()
        ))),
    }
}

/// Parse the JSON chunk and check the document version.
///
/// A leading UTF-8 byte order mark is skipped.
pub fn parse_document(json: &[u8]) -> Result<Document, ImportError> {
    let json = json.strip_prefix(UTF8_BOM).unwrap_or(json);
    let document: Document = serde_json::from_slice(json)?;
    check_version(&document.asset.version)?;
    Ok(document)
}

fn check_version(version: &str) -> Result<(), ImportError> {
    if version.is_empty() {
        log::warn!("glTF asset has no version, assuming 2.0");
        return Ok(());
    }
    let mut parts = version.split('.');
    let major = parts.next().and_then(|p| p.parse::<u32>().ok());
    match major {
        Some(major) if major >= 2 => Ok(()),
        Some(_) => Err(ImportError::Format(format!(
            "glTF version {version} is not supported, 2.0 or later required"
        ))),
        None => Err(ImportError::Format(format!(
            "unparseable glTF version '{version}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gltf::ErrorKind;
    use rstest::rstest;

    fn glb(version: u32, chunks: &[(u32, &[u8])], length_override: Option<u32>) -> Vec<u8> {
        let mut body = Vec::new();
        for (ty, data) in chunks {
            body.extend_from_slice(&(data.len() as u32).to_le_bytes());
            body.extend_from_slice(&ty.to_le_bytes());
            body.extend_from_slice(data);
        }
        let length = length_override.unwrap_or((HEADER_SIZE + body.len()) as u32);
        let mut out = Vec::new();
        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&version.to_le_bytes());
        out.extend_from_slice(&length.to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    const JSON: &[u8] = br#"{"asset":{"version":"2.0"}}"#;

    #[test]
    fn splits_json_and_bin() {
        let bytes = glb(2, &[(CHUNK_JSON, JSON), (CHUNK_BIN, &[1, 2, 3, 4])], None);
        let container = split("", &bytes).unwrap();
        assert_eq!(container.json, JSON);
        assert_eq!(container.binary, Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn json_only_glb() {
        let bytes = glb(2, &[(CHUNK_JSON, JSON)], None);
        let container = split("model.GLB", &bytes).unwrap();
        assert!(container.binary.is_none());
    }

    #[test]
    fn bare_json_passthrough() {
        let container = split("model.gltf", JSON).unwrap();
        assert_eq!(container.json, JSON);
        assert!(container.binary.is_none());
    }

    #[rstest]
    #[case::bad_magic({
        let mut b = glb(2, &[(CHUNK_JSON, JSON)], None);
        b[0] = b'x';
        b
    })]
    #[case::version_one(glb(1, &[(CHUNK_JSON, JSON)], None))]
    #[case::length_past_end(glb(2, &[(CHUNK_JSON, JSON)], Some(4096)))]
    #[case::truncated_header(vec![0x67, 0x6C, 0x54, 0x46, 2, 0])]
    #[case::bin_first(glb(2, &[(CHUNK_BIN, &[0; 4]), (CHUNK_JSON, JSON)], None))]
    #[case::two_json(glb(2, &[(CHUNK_JSON, JSON), (CHUNK_JSON, JSON)], None))]
    #[case::three_chunks(glb(2, &[(CHUNK_JSON, JSON), (CHUNK_BIN, &[0; 4]), (CHUNK_BIN, &[0; 4])], None))]
    #[case::no_chunks(glb(2, &[], None))]
    fn rejects_malformed_glb(#[case] bytes: Vec<u8>) {
        let err = split("asset.glb", &bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn chunk_running_past_declared_length() {
        let mut bytes = glb(2, &[(CHUNK_JSON, JSON)], None);
        // Claim a longer JSON chunk than the container holds.
        bytes[12] = 0xFF;
        let err = split("", &bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn parses_document_with_bom() {
        let mut json = UTF8_BOM.to_vec();
        json.extend_from_slice(r#"{"asset":{"version":"2.0","generator":"Ünïcode"}}"#.as_bytes());
        let doc = parse_document(&json).unwrap();
        assert_eq!(doc.asset.generator.as_deref(), Some("Ünïcode"));
    }

    #[rstest]
    #[case("2.0", true)]
    #[case("2.1", true)]
    #[case("3.0", true)]
    #[case("1.0", false)]
    #[case("abc", false)]
    fn version_check(#[case] version: &str, #[case] ok: bool) {
        let json = format!(r#"{{"asset":{{"version":"{version}"}}}}"#);
        assert_eq!(parse_document(json.as_bytes()).is_ok(), ok);
    }

    #[test]
    fn invalid_json_is_format_error() {
        let err = parse_document(b"{not json").unwrap_err();
        assert!(matches!(err, ImportError::Json(_)));
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}

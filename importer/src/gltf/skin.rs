//! Skin building with bind-pose de-duplication.

use std::collections::HashMap;
use std::sync::Arc;

use crate::math::IDENTITY_MAT4;
use crate::scene::{Node, SkinDescriptor};

use super::accessor::AccessorReader;
use super::document;
use super::error::ImportError;

/// Skins built so far, keyed by [`SkinDescriptor::signature`].
pub type SkinCache = HashMap<String, Arc<SkinDescriptor>>;

/// Build one skin, reusing an earlier skin with the same bone list.
///
/// Bone names come from the already built `nodes`, so they reflect sibling
/// renaming.
pub(crate) fn build_skin(
    index: usize,
    skin: &document::Skin,
    nodes: &[Node],
    reader: &AccessorReader<'_>,
    cache: &mut SkinCache,
) -> Result<Arc<SkinDescriptor>, ImportError> {
    let bone_names = skin
        .joints
        .iter()
        .map(|&joint| {
            nodes.get(joint).map(|n| n.name.clone()).ok_or_else(|| {
                ImportError::Format(format!("skin {index} references missing joint node {joint}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let signature = SkinDescriptor::signature(&bone_names);
    if let Some(existing) = cache.get(&signature) {
        log::debug!("skin {index} shares its bind pose with an earlier skin");
        return Ok(Arc::clone(existing));
    }

    let inverse_bind_matrices = match skin.inverse_bind_matrices {
        Some(accessor) => {
            let data = reader.read_f32(accessor)?;
            if data.len() < bone_names.len() * 16 {
                return Err(ImportError::Decode(format!(
                    "skin {index} has {} joints but only {} inverse bind matrices",
                    bone_names.len(),
                    data.len() / 16
                )));
            }
            data.chunks_exact(16)
                .take(bone_names.len())
                .map(|m| {
                    let mut matrix = [0.0; 16];
                    matrix.copy_from_slice(m);
                    matrix
                })
                .collect()
        }
        None => vec![IDENTITY_MAT4; bone_names.len()],
    };

    let skin = Arc::new(SkinDescriptor {
        bone_names,
        inverse_bind_matrices,
    });
    cache.insert(signature, Arc::clone(&skin));
    Ok(skin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(names: &[&str]) -> Vec<Node> {
        names.iter().map(|n| Node::new(*n)).collect()
    }

    #[test]
    fn identical_bone_lists_share_one_skin() {
        let nodes = nodes(&["hip", "knee", "foot"]);
        let reader = AccessorReader::new(&[], &[]);
        let mut cache = SkinCache::new();
        let a = document::Skin { joints: vec![0, 1, 2], ..Default::default() };
        let b = document::Skin { joints: vec![0, 1, 2], ..Default::default() };
        let c = document::Skin { joints: vec![2, 1, 0], ..Default::default() };

        let sa = build_skin(0, &a, &nodes, &reader, &mut cache).unwrap();
        let sb = build_skin(1, &b, &nodes, &reader, &mut cache).unwrap();
        let sc = build_skin(2, &c, &nodes, &reader, &mut cache).unwrap();
        assert!(Arc::ptr_eq(&sa, &sb));
        assert!(!Arc::ptr_eq(&sa, &sc));
        assert_eq!(sa.inverse_bind_matrices, vec![IDENTITY_MAT4; 3]);
        assert_eq!(sc.bone_names, ["foot", "knee", "hip"]);
    }

    #[test]
    fn missing_joint_is_error() {
        let skin = document::Skin { joints: vec![5], ..Default::default() };
        let reader = AccessorReader::new(&[], &[]);
        assert!(build_skin(0, &skin, &nodes(&["a"]), &reader, &mut SkinCache::new()).is_err());
    }
}

//! Node and scene graph building.

use std::collections::HashMap;

use crate::math::decompose_matrix;
use crate::scene::{Node, NodeId, NodeTransform};

use super::document;
use super::error::ImportError;
use super::options::Hooks;

/// Build one unlinked node: name, transform and attachments.
pub(crate) fn build_node(
    index: usize,
    node: &document::Node,
    hooks: &Hooks<document::Node, Node>,
) -> Result<Node, ImportError> {
    hooks.run(node, || {
        let name = node.name.clone().unwrap_or_else(|| format!("node_{index}"));
        let mut out = Node::new(name).with_transform(node_transform(node));
        out.mesh = node.mesh;
        out.skin = node.skin;
        Ok(out)
    })
}

/// Local transform. TRS fields override whatever the matrix provides.
fn node_transform(node: &document::Node) -> NodeTransform {
    let mut transform = NodeTransform::IDENTITY;
    if let Some(matrix) = &node.matrix {
        let (translation, rotation, scale) = decompose_matrix(matrix);
        transform = transform
            .with_translation(translation)
            .with_rotation(rotation)
            .with_scale(scale);
    }
    if let Some(rotation) = node.rotation {
        transform = transform.with_rotation(rotation);
    }
    if let Some(translation) = node.translation {
        transform = transform.with_translation(translation);
    }
    if let Some(scale) = node.scale {
        transform = transform.with_scale(scale);
    }
    transform
}

fn is_ancestor(nodes: &[Node], candidate: usize, of: usize) -> bool {
    let mut current = Some(NodeId(of));
    while let Some(NodeId(id)) = current {
        if id == candidate {
            return true;
        }
        current = nodes[id].parent;
    }
    false
}

/// Wire parent/child links in document order.
///
/// A child already claimed by an earlier parent stays where it is, so the
/// result is always a forest. Sibling name clashes get a numeric suffix.
pub(crate) fn link_nodes(document: &document::Document, nodes: &mut [Node]) -> Result<(), ImportError> {
    for (parent, gltf_node) in document.nodes.iter().enumerate() {
        let mut names: HashMap<String, u32> = HashMap::new();
        for &child in &gltf_node.children {
            if child >= nodes.len() {
                return Err(ImportError::Format(format!(
                    "node {parent} references missing child {child}"
                )));
            }
            if nodes[child].parent.is_some() || is_ancestor(nodes, child, parent) {
                log::debug!("node {child} already has a parent, not re-parenting under {parent}");
                continue;
            }

            let name = nodes[child].name.clone();
            match names.get_mut(&name) {
                Some(counter) => {
                    nodes[child].name = format!("{name}{counter}");
                    *counter += 1;
                }
                None => {
                    names.insert(name, 1);
                }
            }

            nodes[child].parent = Some(NodeId(parent));
            nodes[parent].children.push(NodeId(child));
        }
    }
    Ok(())
}

/// Resolve scene roots, appending synthetic root nodes where needed.
///
/// A lone scene with a single root node uses that node directly.
pub(crate) fn build_scenes(
    document: &document::Document,
    nodes: &mut Vec<Node>,
) -> Result<Vec<NodeId>, ImportError> {
    let node_count = document.nodes.len();
    for (index, scene) in document.scenes.iter().enumerate() {
        if let Some(&missing) = scene.nodes.iter().find(|&&n| n >= node_count) {
            return Err(ImportError::Format(format!(
                "scene {index} references missing node {missing}"
            )));
        }
    }

    if let [scene] = document.scenes.as_slice()
        && let [root] = scene.nodes.as_slice()
    {
        return Ok(vec![NodeId(*root)]);
    }

    let mut roots = Vec::with_capacity(document.scenes.len());
    for (index, scene) in document.scenes.iter().enumerate() {
        let root = NodeId(nodes.len());
        let name = scene.name.clone().unwrap_or_else(|| format!("scene_{index}"));
        nodes.push(Node::new(name));
        for &child in &scene.nodes {
            if nodes[child].parent.is_some() {
                log::debug!("node {child} is already attached, skipping it in scene {index}");
                continue;
            }
            nodes[child].parent = Some(root);
            nodes[root.0].children.push(NodeId(child));
        }
        roots.push(root);
    }
    Ok(roots)
}

/// Names from the scene root down to `node`, inclusive.
pub(crate) fn entity_path(nodes: &[Node], node: NodeId) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = Some(node);
    while let Some(NodeId(id)) = current {
        path.push(nodes[id].name.clone());
        current = nodes[id].parent;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(json: &str) -> document::Document {
        serde_json::from_str(json).unwrap()
    }

    fn build_all(doc: &document::Document) -> Vec<Node> {
        doc.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| build_node(i, n, &Hooks::default()).unwrap())
            .collect()
    }

    #[test]
    fn trs_overrides_matrix() {
        let doc = document(
            r#"{"asset":{"version":"2.0"},"nodes":[{
                "matrix":[1,0,0,0, 0,1,0,0, 0,0,1,0, 5,6,7,1],
                "translation":[1,2,3]},
                {"matrix":[2,0,0,0, 0,2,0,0, 0,0,2,0, 5,6,7,1]}]}"#,
        );
        let nodes = build_all(&doc);
        assert_eq!(nodes[0].name, "node_0");
        assert_eq!(nodes[0].transform.translation, [1.0, 2.0, 3.0]);
        assert_eq!(nodes[1].transform.translation, [5.0, 6.0, 7.0]);
        assert_eq!(nodes[1].transform.scale, [2.0, 2.0, 2.0]);
    }

    #[test]
    fn first_parent_wins_and_siblings_are_renamed() {
        let doc = document(
            r#"{"asset":{"version":"2.0"},"nodes":[
                {"name":"root","children":[1,2,3]},
                {"name":"arm"},{"name":"arm"},{"name":"arm"},
                {"name":"other","children":[1]}]}"#,
        );
        let mut nodes = build_all(&doc);
        link_nodes(&doc, &mut nodes).unwrap();
        let names: Vec<&str> = nodes[0].children.iter().map(|c| nodes[c.0].name.as_str()).collect();
        assert_eq!(names, ["arm", "arm1", "arm2"]);
        assert_eq!(nodes[1].parent, Some(NodeId(0)));
        assert!(nodes[4].children.is_empty());
    }

    #[test]
    fn cycles_are_not_created() {
        let doc = document(
            r#"{"asset":{"version":"2.0"},"nodes":[{"children":[1]},{"children":[0]}]}"#,
        );
        let mut nodes = build_all(&doc);
        link_nodes(&doc, &mut nodes).unwrap();
        assert_eq!(nodes[0].parent, None);
        assert_eq!(nodes[1].parent, Some(NodeId(0)));
    }

    #[test]
    fn single_root_scene_is_returned_directly() {
        let doc = document(
            r#"{"asset":{"version":"2.0"},"scenes":[{"nodes":[0]}],"nodes":[{"children":[1]},{}]}"#,
        );
        let mut nodes = build_all(&doc);
        link_nodes(&doc, &mut nodes).unwrap();
        let scenes = build_scenes(&doc, &mut nodes).unwrap();
        assert_eq!(scenes, [NodeId(0)]);
        assert_eq!(nodes.len(), 2);
        assert_eq!(entity_path(&nodes, NodeId(1)), ["node_0", "node_1"]);
    }

    #[test]
    fn multi_root_scene_gets_named_wrapper() {
        let doc = document(
            r#"{"asset":{"version":"2.0"},"scenes":[{"name":"Level","nodes":[0,1]}],"nodes":[{},{}]}"#,
        );
        let mut nodes = build_all(&doc);
        let scenes = build_scenes(&doc, &mut nodes).unwrap();
        assert_eq!(scenes, [NodeId(2)]);
        assert_eq!(nodes[2].name, "Level");
        assert_eq!(nodes[2].children, [NodeId(0), NodeId(1)]);
        assert_eq!(entity_path(&nodes, NodeId(1)), ["Level", "node_1"]);
    }

    #[test]
    fn scene_with_missing_node_is_format_error() {
        let doc = document(r#"{"asset":{"version":"2.0"},"scenes":[{"nodes":[3]}]}"#);
        assert!(build_scenes(&doc, &mut Vec::new()).is_err());
    }
}

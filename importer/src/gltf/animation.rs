//! Animation track building.
//!
//! Sampler inputs and outputs are pooled per accessor, so samplers sharing
//! an accessor share one [`AnimData`]. Morph weight outputs interleave one
//! value per target per key; they are split into one synthetic pool per
//! target, appended after the accessor pools.

use std::collections::{BTreeSet, HashMap};

use crate::scene::{
    AnimCurve, AnimCurvePath, AnimData, AnimationTrack, Interpolation, Node, NodeId,
};

use super::accessor::AccessorReader;
use super::document;
use super::error::ImportError;
use super::node::entity_path;
use super::options::Hooks;

/// Output pool reference used while curves are being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum OutputKey {
    /// Index into the accessor-backed pools.
    Accessor(usize),
    /// Index into the de-interleaved morph weight pools.
    Synthetic(usize),
}

struct PendingCurve {
    path: AnimCurvePath,
    input: usize,
    output: OutputKey,
    interpolation: Interpolation,
}

/// Pools keyed by source accessor, in first-use order.
#[derive(Default)]
struct Pools {
    index: HashMap<usize, usize>,
    data: Vec<AnimData>,
}

impl Pools {
    fn get_or_read(&mut self, accessor: usize, reader: &AccessorReader<'_>) -> Result<usize, ImportError> {
        if let Some(&pool) = self.index.get(&accessor) {
            return Ok(pool);
        }
        let (_, components) = reader.layout(accessor)?;
        let pool = self.data.len();
        self.data.push(AnimData {
            components: components as u32,
            data: reader.read_f32(accessor)?,
        });
        self.index.insert(accessor, pool);
        Ok(pool)
    }
}

pub(crate) fn build_animation(
    index: usize,
    animation: &document::Animation,
    document: &document::Document,
    nodes: &[Node],
    reader: &AccessorReader<'_>,
    hooks: &Hooks<document::Animation, AnimationTrack>,
) -> Result<AnimationTrack, ImportError> {
    hooks.run(animation, || {
        let mut inputs = Pools::default();
        let mut outputs = Pools::default();
        let mut synthetic: Vec<AnimData> = Vec::new();
        let mut curves: Vec<PendingCurve> = Vec::new();

        for (channel_index, channel) in animation.channels.iter().enumerate() {
            let sampler = animation.samplers.get(channel.sampler).ok_or_else(|| {
                ImportError::Format(format!(
                    "animation {index} channel {channel_index} references missing sampler {}",
                    channel.sampler
                ))
            })?;
            let Some(node) = channel.target.node else {
                log::trace!("animation {index} channel {channel_index} has no target node");
                continue;
            };
            // Synthetic scene roots live past the document nodes and are not targetable.
            let Some(target_node) = document.nodes.get(node) else {
                return Err(ImportError::Format(format!(
                    "animation {index} targets missing node {node}"
                )));
            };
            let interpolation = sampler
                .interpolation
                .as_deref()
                .map(Interpolation::from_gltf)
                .unwrap_or_default();
            let input = inputs.get_or_read(sampler.input, reader)?;
            let target_path = entity_path(nodes, NodeId(node));

            let property = match channel.target.path.as_str() {
                "translation" => "localPosition",
                "rotation" => "localRotation",
                "scale" => "localScale",
                "weights" => {
                    let key_count = inputs.data[input].key_count();
                    let weights = reader.read_f32(sampler.output)?;
                    let mesh = target_node
                        .mesh
                        .and_then(|m| document.meshes.get(m));
                    let series = split_weights(&weights, key_count, interpolation);
                    for (target, data) in series.into_iter().enumerate() {
                        let name = mesh.map_or_else(|| target.to_string(), |m| m.target_name(target));
                        curves.push(PendingCurve {
                            path: AnimCurvePath {
                                entity_path: target_path.clone(),
                                property_path: format!("weight.{name}"),
                            },
                            input,
                            output: OutputKey::Synthetic(synthetic.len()),
                            interpolation,
                        });
                        synthetic.push(AnimData { components: 1, data });
                    }
                    continue;
                }
                other => {
                    log::warn!("animation {index}: unsupported channel path '{other}'");
                    continue;
                }
            };

            let output = outputs.get_or_read(sampler.output, reader)?;
            curves.push(PendingCurve {
                path: AnimCurvePath {
                    entity_path: target_path,
                    property_path: property.to_owned(),
                },
                input,
                output: OutputKey::Accessor(output),
                interpolation,
            });
        }

        let rotation_pools: BTreeSet<usize> = curves
            .iter()
            .filter(|c| {
                c.path.property_path == "localRotation"
                    && c.interpolation != Interpolation::CubicSpline
            })
            .filter_map(|c| match c.output {
                OutputKey::Accessor(pool) => Some(pool),
                OutputKey::Synthetic(_) => None,
            })
            .collect();
        for pool in rotation_pools {
            fix_quaternion_continuity(&mut outputs.data[pool]);
        }

        let accessor_pools = outputs.data.len();
        let curves = curves
            .into_iter()
            .map(|c| AnimCurve {
                paths: vec![c.path],
                input: c.input,
                output: match c.output {
                    OutputKey::Accessor(pool) => pool,
                    OutputKey::Synthetic(pool) => accessor_pools + pool,
                },
                interpolation: c.interpolation,
            })
            .collect();
        let mut output_data = outputs.data;
        output_data.extend(synthetic);

        let duration = inputs
            .data
            .iter()
            .filter_map(|pool| pool.data.last().copied())
            .fold(0.0, f32::max);

        Ok(AnimationTrack {
            name: animation
                .name
                .clone()
                .unwrap_or_else(|| format!("animation_{index}")),
            duration,
            inputs: inputs.data,
            outputs: output_data,
            curves,
        })
    })
}

/// Split interleaved morph weights into one series per target.
///
/// Cubic spline keys keep their `in-tangent, value, out-tangent` triple per
/// key in each series.
fn split_weights(data: &[f32], key_count: usize, interpolation: Interpolation) -> Vec<Vec<f32>> {
    let values_per_key = if interpolation == Interpolation::CubicSpline { 3 } else { 1 };
    if key_count == 0 {
        return Vec::new();
    }
    let target_count = data.len() / (key_count * values_per_key);
    if target_count == 0 {
        return Vec::new();
    }
    let stride = target_count * values_per_key;
    (0..target_count)
        .map(|target| {
            data.chunks_exact(stride)
                .flat_map(|key| (0..values_per_key).map(move |part| key[part * target_count + target]))
                .collect()
        })
        .collect()
}

/// Negate quaternions that sit in the opposite hemisphere from their
/// predecessor, so interpolation takes the short path.
pub fn fix_quaternion_continuity(pool: &mut AnimData) {
    if pool.components != 4 {
        return;
    }
    let mut keys = pool.data.chunks_exact_mut(4);
    let Some(first) = keys.next() else {
        return;
    };
    let mut previous = [first[0], first[1], first[2], first[3]];
    for key in keys {
        let dot = previous.iter().zip(key.iter()).map(|(a, b)| a * b).sum::<f32>();
        if dot < 0.0 {
            key.iter_mut().for_each(|v| *v = -*v);
        }
        previous = [key[0], key[1], key[2], key[3]];
    }
}

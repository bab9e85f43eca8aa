//! Import configuration and per-entity hooks.
//!
//! Every hook is optional and purely additive: with no hooks installed the
//! importer produces the default result. For each entity kind the importer
//! calls, in order:
//!
//! 1. `preprocess(input)`
//! 2. `process(input)` / `process_async(input)`; a `Some` result replaces the
//!    default implementation for that entity
//! 3. `postprocess(input, &mut output)`

use std::future::Future;
use std::pin::Pin;

use crate::material::{ImageDescriptor, MaterialDescriptor, TextureDescriptor};
use crate::scene::{AnimationTrack, CameraDescriptor, LightDescriptor, Node};

use super::buffer::BufferSlice;
use super::document::{self, Document};
use super::error::ImportError;
use super::types::ResourceBundle;

/// A boxed, `Send` future produced by an async hook.
pub type HookFuture<O> = Pin<Box<dyn Future<Output = Result<O, ImportError>> + Send>>;

type Pre<I> = Box<dyn Fn(&I) + Send + Sync>;
type Post<I, O> = Box<dyn Fn(&I, &mut O) + Send + Sync>;

/// Hooks for entities built synchronously.
pub struct Hooks<I, O> {
    pub preprocess: Option<Pre<I>>,
    pub process: Option<Box<dyn Fn(&I) -> Option<O> + Send + Sync>>,
    pub postprocess: Option<Post<I, O>>,
}

impl<I, O> Default for Hooks<I, O> {
    fn default() -> Self {
        Self {
            preprocess: None,
            process: None,
            postprocess: None,
        }
    }
}

impl<I, O> Hooks<I, O> {
    /// Set the preprocess hook.
    #[must_use]
    pub fn with_preprocess(mut self, f: impl Fn(&I) + Send + Sync + 'static) -> Self {
        self.preprocess = Some(Box::new(f));
        self
    }

    /// Set the replacement hook.
    #[must_use]
    pub fn with_process(mut self, f: impl Fn(&I) -> Option<O> + Send + Sync + 'static) -> Self {
        self.process = Some(Box::new(f));
        self
    }

    /// Set the postprocess hook.
    #[must_use]
    pub fn with_postprocess(mut self, f: impl Fn(&I, &mut O) + Send + Sync + 'static) -> Self {
        self.postprocess = Some(Box::new(f));
        self
    }

    /// Run the full hook sequence around a default builder.
    pub(crate) fn run(
        &self,
        input: &I,
        build: impl FnOnce() -> Result<O, ImportError>,
    ) -> Result<O, ImportError> {
        if let Some(pre) = &self.preprocess {
            pre(input);
        }
        let mut output = match self.process.as_ref().and_then(|process| process(input)) {
            Some(replacement) => replacement,
            None => build()?,
        };
        if let Some(post) = &self.postprocess {
            post(input, &mut output);
        }
        Ok(output)
    }
}

/// Hooks for entities resolved asynchronously (buffers, images, textures).
pub struct AsyncHooks<I, O> {
    pub preprocess: Option<Pre<I>>,
    pub process_async: Option<Box<dyn Fn(&I) -> Option<HookFuture<O>> + Send + Sync>>,
    pub postprocess: Option<Post<I, O>>,
}

impl<I, O> Default for AsyncHooks<I, O> {
    fn default() -> Self {
        Self {
            preprocess: None,
            process_async: None,
            postprocess: None,
        }
    }
}

impl<I, O> AsyncHooks<I, O> {
    /// Set the preprocess hook.
    #[must_use]
    pub fn with_preprocess(mut self, f: impl Fn(&I) + Send + Sync + 'static) -> Self {
        self.preprocess = Some(Box::new(f));
        self
    }

    /// Set the async replacement hook.
    #[must_use]
    pub fn with_process_async(
        mut self,
        f: impl Fn(&I) -> Option<HookFuture<O>> + Send + Sync + 'static,
    ) -> Self {
        self.process_async = Some(Box::new(f));
        self
    }

    /// Set the postprocess hook.
    #[must_use]
    pub fn with_postprocess(mut self, f: impl Fn(&I, &mut O) + Send + Sync + 'static) -> Self {
        self.postprocess = Some(Box::new(f));
        self
    }

    /// Run the full hook sequence around a default async builder.
    pub(crate) async fn run<F>(&self, input: &I, build: F) -> Result<O, ImportError>
    where
        F: Future<Output = Result<O, ImportError>>,
    {
        if let Some(pre) = &self.preprocess {
            pre(input);
        }
        let replacement = self.process_async.as_ref().and_then(|process| process(input));
        let mut output = match replacement {
            Some(future) => future.await?,
            None => build.await?,
        };
        if let Some(post) = &self.postprocess {
            post(input, &mut output);
        }
        Ok(output)
    }
}

/// Document-wide hooks.
#[derive(Default)]
pub struct GlobalHooks {
    /// Called after the document is parsed, before any entity is built.
    pub preprocess: Option<Box<dyn Fn(&Document) + Send + Sync>>,
    /// Called with the finished bundle before it is returned.
    pub postprocess: Option<Box<dyn Fn(&Document, &mut ResourceBundle) + Send + Sync>>,
}

/// All hooks, grouped by entity kind.
#[derive(Default)]
pub struct ImportHooks {
    pub global: GlobalHooks,
    pub buffer: AsyncHooks<document::Buffer, std::sync::Arc<[u8]>>,
    pub buffer_view: Hooks<document::BufferView, BufferSlice>,
    pub image: AsyncHooks<document::Image, ImageDescriptor>,
    pub texture: AsyncHooks<document::Texture, TextureDescriptor>,
    pub material: Hooks<document::Material, MaterialDescriptor>,
    pub node: Hooks<document::Node, Node>,
    pub camera: Hooks<document::Camera, CameraDescriptor>,
    pub light: Hooks<document::Light, LightDescriptor>,
    pub animation: Hooks<document::Animation, AnimationTrack>,
}

/// Index formats the target device can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCaps {
    /// 8-bit index buffers are supported.
    pub u8_indices: bool,
    /// 32-bit index buffers are supported.
    pub u32_indices: bool,
}

impl Default for DeviceCaps {
    fn default() -> Self {
        Self {
            u8_indices: true,
            u32_indices: true,
        }
    }
}

impl DeviceCaps {
    /// WebGPU-class device: no 8-bit indices.
    pub fn webgpu() -> Self {
        Self {
            u8_indices: false,
            u32_indices: true,
        }
    }
}

/// Settings for one import.
pub struct ImportOptions {
    /// Entity hooks.
    pub hooks: ImportHooks,
    /// `asset.generator` prefixes of exporters that write V flipped.
    pub flip_v_generators: Vec<String>,
    /// Decode `KHR_draco_mesh_compression` primitives. When disabled, or
    /// when no decoder pool is supplied, those primitives use their plain
    /// accessors if they have any.
    pub decode_draco: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            hooks: ImportHooks::default(),
            flip_v_generators: vec!["PlayCanvas".to_owned()],
            decode_draco: true,
        }
    }
}

impl ImportOptions {
    /// Replace the hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: ImportHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the list of V-flipping generators.
    #[must_use]
    pub fn with_flip_v_generators(mut self, generators: Vec<String>) -> Self {
        self.flip_v_generators = generators;
        self
    }

    /// Enable or disable Draco decoding.
    #[must_use]
    pub fn with_decode_draco(mut self, decode: bool) -> Self {
        self.decode_draco = decode;
        self
    }

    /// Whether a document from this generator needs its V coordinates flipped.
    pub fn flips_v(&self, generator: Option<&str>) -> bool {
        generator.is_some_and(|g| {
            self.flip_v_generators
                .iter()
                .any(|prefix| g.starts_with(prefix.as_str()))
        })
    }
}

//! Scene manifests
//!
//! A scene file lists game objects and the resources each one needs:
//!
//! ```text
//! # comments and blank lines are skipped
//! GO crate
//! model models/crate.obj
//! texture textures/crate_overlay.png
//! GO sky
//! skybox sky/px.png sky/nx.png sky/py.png sky/ny.png sky/pz.png sky/nz.png
//! recipe recipes/bread.txt
//! ```
//!
//! Resource records attach to the most recent `GO`. Paths are relative to
//! the asset root.

use crate::cache::Handle;
use crate::error::{AssetError, Result};
use crate::gpu::{GpuDevice, MockGpu};
use crate::loader::split_record;
use crate::manager::{AssetManager, LoadMode};
use crate::resources::{CubeMap, Model, Recipe, Texture, CUBE_FACES};
use std::path::{Path, PathBuf};

/// One manifest line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneRecord {
    Object(String),
    Model(String),
    Texture(String),
    Skybox(Vec<String>),
    Recipe(String),
}

/// Parse a scene manifest
pub fn parse_manifest(origin: &str, text: &str) -> Result<Vec<SceneRecord>> {
    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let Some((keyword, rest)) = split_record(line) else {
            continue;
        };
        let parse_error = |reason: String| AssetError::Parse {
            path: origin.to_string(),
            line: index + 1,
            reason,
        };
        if rest.is_empty() {
            return Err(parse_error(format!("'{}' needs an argument", keyword)));
        }

        let record = match keyword {
            "GO" => SceneRecord::Object(rest.to_string()),
            "model" => SceneRecord::Model(rest.to_string()),
            "texture" => SceneRecord::Texture(rest.to_string()),
            "recipe" => SceneRecord::Recipe(rest.to_string()),
            "skybox" => {
                let faces: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
                if faces.len() != CUBE_FACES {
                    return Err(parse_error(format!(
                        "skybox needs {} faces, got {}",
                        CUBE_FACES,
                        faces.len()
                    )));
                }
                SceneRecord::Skybox(faces)
            }
            other => return Err(parse_error(format!("unknown record '{}'", other))),
        };
        records.push(record);
    }
    Ok(records)
}

/// A named object and the resources it holds
#[derive(Debug)]
pub struct SceneObject<G: GpuDevice = MockGpu> {
    pub name: String,
    pub models: Vec<Handle<Model<G>>>,
    pub textures: Vec<Handle<Texture<G>>>,
    pub recipes: Vec<Handle<Recipe>>,
    pub skybox: Option<Handle<CubeMap<G>>>,
}

impl<G: GpuDevice> SceneObject<G> {
    fn new(name: String) -> Self {
        Self {
            name,
            models: Vec::new(),
            textures: Vec::new(),
            recipes: Vec::new(),
            skybox: None,
        }
    }

    /// Whether every resource of this object has finished loading
    pub fn is_ready(&self) -> bool {
        self.models.iter().all(|m| m.is_ready())
            && self.textures.iter().all(|t| t.is_ready())
            && self.recipes.iter().all(|r| r.is_ready())
            && self.skybox.as_ref().map_or(true, |s| s.is_ready())
    }
}

/// The loaded scene
#[derive(Debug)]
pub struct Scene<G: GpuDevice = MockGpu> {
    path: Option<PathBuf>,
    objects: Vec<SceneObject<G>>,
}

impl<G: GpuDevice> Default for Scene<G> {
    fn default() -> Self {
        Self {
            path: None,
            objects: Vec::new(),
        }
    }
}

impl<G: GpuDevice> Scene<G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a manifest and start loading everything it lists
    ///
    /// Objects are appended to the current ones. Returns once every load has
    /// been issued; in multi mode the resources keep loading on the pool.
    pub fn load<P: AsRef<Path>>(
        &mut self,
        manager: &AssetManager<G>,
        path: P,
        mode: LoadMode,
    ) -> Result<()> {
        let resolved = manager.resolve(path);
        log::info!("[Scene] Loading {} ({})", resolved.display(), mode);
        let text = std::fs::read_to_string(&resolved).map_err(|e| AssetError::io(&resolved, e))?;
        let records = parse_manifest(&resolved.display().to_string(), &text)?;

        for record in records {
            if let SceneRecord::Object(name) = record {
                let name = self.unique_name(&name);
                self.objects.push(SceneObject::new(name));
                manager.stats().add_objects(1);
                continue;
            }

            let Some(object) = self.objects.last_mut() else {
                log::warn!("[Scene] {:?} before any GO, skipped", record);
                continue;
            };
            match record {
                SceneRecord::Model(path) => object.models.push(manager.load_model(path, mode)),
                SceneRecord::Texture(path) => object.textures.push(manager.load_texture(path, mode)),
                SceneRecord::Recipe(path) => object.recipes.push(manager.load_recipe(path, mode)),
                SceneRecord::Skybox(faces) => match manager.load_cube_map(faces.as_slice(), mode) {
                    Ok(cube) => object.skybox = Some(cube),
                    Err(e) => log::error!("[Scene] Skybox of {} skipped: {}", object.name, e),
                },
                SceneRecord::Object(_) => {}
            }
        }

        self.path = Some(resolved);
        Ok(())
    }

    /// Drop every object, then evict what nothing else holds
    ///
    /// Returns the number of evicted cache entries.
    pub fn clear(&mut self, manager: &AssetManager<G>) -> usize {
        self.objects.clear();
        manager.clear_resources()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn objects(&self) -> &[SceneObject<G>] {
        &self.objects
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject<G>> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn is_ready(&self) -> bool {
        self.objects.iter().all(SceneObject::is_ready)
    }

    /// `name`, or `name(n)` with the first free `n`
    fn unique_name(&self, name: &str) -> String {
        let taken = |candidate: &str| self.objects.iter().any(|o| o.name == candidate);
        if !taken(name) {
            return name.to_string();
        }
        (1..)
            .map(|n| format!("{}({})", name, n))
            .find(|candidate| !taken(candidate.as_str()))
            .unwrap_or_else(|| name.to_string())
    }
}

//! Resource manager: every cache, plus the routing of load and upload work
//!
//! `AssetManager` is a cheap handle over shared state. Clones are handed to
//! pool tasks; the GPU device inside is only reachable on the thread that
//! created the manager.

use crate::benchmark::SceneStats;
use crate::cache::metrics::AssetMetricsHandle;
use crate::cache::{Handle, ResourceCache, ResourceEntry, ResourceKey};
use crate::config::{EngineConfig, ShaderProgramConfig};
use crate::deferred::DeferredQueue;
use crate::error::{AssetError, Result};
use crate::gpu::{GpuContext, GpuDevice, MockGpu};
use crate::loader::{mtl, obj};
use crate::resources::{
    CubeMap, Font, Material, MaterialLibrary, Mesh, Model, Recipe, Shader, ShaderProgram,
    Texture, TextureData, TextureLoader,
};
use crate::runtime::TaskSpawner;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// Where a load runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadMode {
    /// On the calling thread, uploading inline when that thread owns the GPU
    Mono,
    /// On a pool task, uploading through the deferred queue
    Multi,
}

impl LoadMode {
    pub fn is_multi(self) -> bool {
        self == LoadMode::Multi
    }
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.is_multi() { "multi" } else { "mono" })
    }
}

/// Resources created by [`AssetManager::init`] that are never evicted
#[derive(Debug)]
pub struct DefaultResources<G: GpuDevice> {
    pub white: Handle<Texture<G>>,
    pub black: Handle<Texture<G>>,
    pub no_diffuse: Handle<Texture<G>>,
    pub material: Handle<Material<G>>,
    /// Programs named in [`EngineConfig::shader_programs`], in order
    pub programs: Vec<Handle<ShaderProgram>>,
}

struct ManagerInner<G: GpuDevice> {
    asset_root: PathBuf,
    program_configs: Vec<ShaderProgramConfig>,
    spawner: Arc<dyn TaskSpawner>,
    gpu: GpuContext<G>,
    deferred: Arc<DeferredQueue<G>>,
    stats: Arc<SceneStats>,
    benchmark_active: AtomicBool,
    defaults: OnceLock<DefaultResources<G>>,

    models: ResourceCache<Model<G>>,
    meshes: ResourceCache<Mesh<G>>,
    materials: ResourceCache<Material<G>>,
    material_libraries: ResourceCache<MaterialLibrary>,
    textures: ResourceCache<Texture<G>>,
    cube_maps: ResourceCache<CubeMap<G>>,
    shaders: ResourceCache<Shader>,
    shader_programs: ResourceCache<ShaderProgram>,
    fonts: ResourceCache<Font>,
    recipes: ResourceCache<Recipe>,
}

/// Owns one cache per resource kind
///
/// # Example
/// ```ignore
/// let manager = AssetManager::new(MockGpu::new(), pool.clone(), &config);
/// let model = manager.load_model("models/crate.obj", LoadMode::Multi);
/// while !model.is_ready() {
///     manager.check_requests();
/// }
/// ```
pub struct AssetManager<G: GpuDevice = MockGpu> {
    inner: Arc<ManagerInner<G>>,
}

impl<G: GpuDevice> Clone for AssetManager<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: GpuDevice> std::fmt::Debug for AssetManager<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetManager")
            .field("asset_root", &self.inner.asset_root)
            .field("spawner", &self.inner.spawner.runtime_name())
            .field("backend", &self.inner.gpu.device().map(|g| g.backend_name()).ok())
            .field("pending_requests", &self.inner.deferred.len())
            .finish()
    }
}

impl<G: GpuDevice> AssetManager<G> {
    /// Create a manager whose GPU context is owned by the calling thread
    pub fn new(gpu: G, spawner: Arc<dyn TaskSpawner>, config: &EngineConfig) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                asset_root: config.asset_root.clone(),
                program_configs: config.shader_programs.clone(),
                spawner,
                gpu: GpuContext::new(gpu),
                deferred: Arc::new(DeferredQueue::new(config.max_requests_per_tick)),
                stats: Arc::new(SceneStats::default()),
                benchmark_active: AtomicBool::new(false),
                defaults: OnceLock::new(),
                models: ResourceCache::new("model"),
                meshes: ResourceCache::new("mesh"),
                materials: ResourceCache::new("material"),
                material_libraries: ResourceCache::new("material library"),
                textures: ResourceCache::new("texture"),
                cube_maps: ResourceCache::new("cube map"),
                shaders: ResourceCache::new("shader"),
                shader_programs: ResourceCache::new("shader program"),
                fonts: ResourceCache::new("font"),
                recipes: ResourceCache::new("recipe"),
            }),
        }
    }

    /// Load the configured shader programs, then create the default
    /// textures and material
    ///
    /// Must run on the owning thread. A second call is rejected.
    pub fn init(&self) -> Result<()> {
        if self.inner.defaults.get().is_some() {
            log::warn!("[AssetManager] init called twice, ignoring");
            return Err(AssetError::AlreadyInitialized("AssetManager"));
        }

        let programs = self
            .inner
            .program_configs
            .iter()
            .map(|program| {
                self.load_shader_program(
                    &program.name,
                    &program.vertex,
                    &program.fragment,
                    program.geometry.as_deref(),
                    LoadMode::Mono,
                )
            })
            .collect();

        let white = self.load_texture_from_pixels("whiteTex", 1, 1, &[1.0, 1.0, 1.0, 1.0]);
        let black = self.load_texture_from_pixels("blackTex", 1, 1, &[0.0, 0.0, 0.0, 1.0]);
        let no_diffuse = self.load_texture_from_pixels("noDiffuseTex", 1, 1, &[1.0, 0.0, 1.0, 1.0]);

        let material = self.load_material("defaultMat");
        let mut default_material = Material::new("defaultMat");
        default_material.diffuse_map = Some(no_diffuse.clone());
        default_material.specular_map = Some(black.clone());
        if material.populate(default_material) {
            material.mark_ready();
        }

        let defaults = DefaultResources {
            white,
            black,
            no_diffuse,
            material,
            programs,
        };
        if self.inner.defaults.set(defaults).is_err() {
            return Err(AssetError::AlreadyInitialized("AssetManager"));
        }
        log::info!("[AssetManager] Default resources loaded");
        Ok(())
    }

    pub fn defaults(&self) -> Option<&DefaultResources<G>> {
        self.inner.defaults.get()
    }

    /// Absolute path for a resource name relative to the asset root
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.inner.asset_root.join(path)
        }
    }

    // ---- Loading ----------------------------------------------------------

    /// Load an OBJ model and everything it references
    pub fn load_model<P: AsRef<Path>>(&self, path: P, mode: LoadMode) -> Handle<Model<G>> {
        let resolved = self.resolve(path);
        let key = ResourceKey::from_path(&resolved);
        self.load_entry(&self.inner.models, key, mode, move |manager, entry| {
            obj::load_obj(manager, entry, &resolved, mode)
        })
    }

    /// Load a `.mtl` library, populating every material it defines
    pub fn load_material_library<P: AsRef<Path>>(
        &self,
        path: P,
        mode: LoadMode,
    ) -> Handle<MaterialLibrary> {
        let resolved = self.resolve(path);
        let key = ResourceKey::from_path(&resolved);
        self.load_entry(&self.inner.material_libraries, key, mode, move |manager, entry| {
            mtl::load_mtl(manager, entry, &resolved, mode)
        })
    }

    /// Get or create the material called `name`
    ///
    /// Materials are populated by the library that defines them; a name no
    /// library defines stays a placeholder.
    pub fn load_material(&self, name: &str) -> Handle<Material<G>> {
        self.inner.materials.get_or_insert(ResourceKey::new(name)).0
    }

    /// Load an image file as a texture
    pub fn load_texture<P: AsRef<Path>>(&self, path: P, mode: LoadMode) -> Handle<Texture<G>> {
        let resolved = self.resolve(path);
        let key = ResourceKey::from_path(&resolved);
        self.load_entry(&self.inner.textures, key, mode, move |manager, entry| {
            match TextureLoader::new().load_file(&resolved) {
                Ok(data) => {
                    entry.populate(Texture::new(data));
                    manager.upload_texture(Arc::clone(entry), mode);
                }
                Err(e) => manager.report_failure(manager.textures().metrics(), entry, &e),
            }
        })
    }

    /// Create a texture from normalized RGBA floats
    ///
    /// An empty or wrongly sized buffer is logged and the entry never
    /// becomes ready.
    pub fn load_texture_from_pixels(
        &self,
        name: &str,
        width: u32,
        height: u32,
        data: &[f32],
    ) -> Handle<Texture<G>> {
        let key = ResourceKey::from_path(&self.resolve(name));
        let (entry, created) = self.inner.textures.get_or_insert(key);
        if !created {
            return entry;
        }

        match TextureData::from_f32(width, height, data) {
            Ok(data) => {
                entry.populate(Texture::new(data));
                self.upload_texture(Arc::clone(&entry), LoadMode::Mono);
            }
            Err(e) => self.report_failure(self.textures().metrics(), &entry, &e),
        }
        entry
    }

    /// Load the six faces of a cube map
    ///
    /// Keyed by the directory holding the last face.
    pub fn load_cube_map<P: AsRef<Path>>(
        &self,
        paths: &[P],
        mode: LoadMode,
    ) -> Result<Handle<CubeMap<G>>> {
        if paths.len() != crate::resources::CUBE_FACES {
            log::error!("[AssetManager] Cube map needs 6 faces, got {}", paths.len());
            return Err(AssetError::InvalidCubeMap(paths.len()));
        }

        let resolved: Vec<PathBuf> = paths.iter().map(|p| self.resolve(p)).collect();
        let directory = resolved
            .last()
            .and_then(|p| p.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let key = ResourceKey::from_path(&directory);

        Ok(self.load_entry(&self.inner.cube_maps, key, mode, move |manager, entry| {
            match CubeMap::decode(resolved.as_slice()) {
                Ok(cube) => {
                    entry.populate(cube);
                    manager.upload_cube_map(Arc::clone(entry), mode);
                }
                Err(e) => manager.report_failure(manager.cube_maps().metrics(), entry, &e),
            }
        }))
    }

    /// Load a shader source; the stage comes from the file extension
    pub fn load_shader<P: AsRef<Path>>(&self, path: P, mode: LoadMode) -> Handle<Shader> {
        self.load_file_resource(AssetManager::shaders, path.as_ref(), mode, Shader::read)
    }

    /// Load a program from its stage files
    pub fn load_shader_program(
        &self,
        name: &str,
        vertex: &Path,
        fragment: &Path,
        geometry: Option<&Path>,
        mode: LoadMode,
    ) -> Handle<ShaderProgram> {
        let (vertex, fragment) = (vertex.to_path_buf(), fragment.to_path_buf());
        let geometry = geometry.map(Path::to_path_buf);
        self.load_entry(
            &self.inner.shader_programs,
            ResourceKey::new(name),
            mode,
            move |manager, entry| {
                // Stages are read inline: this job already runs where the
                // program was asked to load.
                let program = ShaderProgram {
                    name: entry.key().to_string(),
                    vertex: manager.load_shader(&vertex, LoadMode::Mono),
                    fragment: manager.load_shader(&fragment, LoadMode::Mono),
                    geometry: geometry.map(|g| manager.load_shader(g, LoadMode::Mono)),
                };
                if !program.stages_ready() {
                    log::warn!("[AssetManager] Shader program {} has stages that did not load", entry.key());
                }
                entry.populate(program);
                entry.mark_ready();
            },
        )
    }

    pub fn load_font<P: AsRef<Path>>(&self, path: P, mode: LoadMode) -> Handle<Font> {
        self.load_file_resource(AssetManager::fonts, path.as_ref(), mode, Font::read)
    }

    pub fn load_recipe<P: AsRef<Path>>(&self, path: P, mode: LoadMode) -> Handle<Recipe> {
        self.load_file_resource(AssetManager::recipes, path.as_ref(), mode, Recipe::read)
    }

    // ---- Lookups ----------------------------------------------------------

    pub fn get_mesh_by_name(&self, name: &str) -> Result<Handle<Mesh<G>>> {
        self.inner.meshes.get_by_name(&ResourceKey::new(name))
    }

    pub fn get_material_by_name(&self, name: &str) -> Result<Handle<Material<G>>> {
        self.inner.materials.get_by_name(&ResourceKey::new(name))
    }

    pub fn get_model<P: AsRef<Path>>(&self, path: P) -> Result<Handle<Model<G>>> {
        self.inner
            .models
            .get_by_name(&ResourceKey::from_path(&self.resolve(path)))
    }

    pub fn get_texture<P: AsRef<Path>>(&self, path: P) -> Result<Handle<Texture<G>>> {
        self.inner
            .textures
            .get_by_name(&ResourceKey::from_path(&self.resolve(path)))
    }

    pub fn models(&self) -> &ResourceCache<Model<G>> {
        &self.inner.models
    }

    pub fn meshes(&self) -> &ResourceCache<Mesh<G>> {
        &self.inner.meshes
    }

    pub fn materials(&self) -> &ResourceCache<Material<G>> {
        &self.inner.materials
    }

    pub fn material_libraries(&self) -> &ResourceCache<MaterialLibrary> {
        &self.inner.material_libraries
    }

    pub fn textures(&self) -> &ResourceCache<Texture<G>> {
        &self.inner.textures
    }

    pub fn cube_maps(&self) -> &ResourceCache<CubeMap<G>> {
        &self.inner.cube_maps
    }

    pub fn shaders(&self) -> &ResourceCache<Shader> {
        &self.inner.shaders
    }

    pub fn shader_programs(&self) -> &ResourceCache<ShaderProgram> {
        &self.inner.shader_programs
    }

    pub fn fonts(&self) -> &ResourceCache<Font> {
        &self.inner.fonts
    }

    pub fn recipes(&self) -> &ResourceCache<Recipe> {
        &self.inner.recipes
    }

    // ---- Owner thread -----------------------------------------------------

    /// Run up to the per-tick cap of deferred requests
    ///
    /// Only the owning thread may drain the queue; anywhere else this logs
    /// and runs nothing.
    pub fn check_requests(&self) -> usize {
        match self.inner.gpu.device() {
            Ok(gpu) => self.inner.deferred.check_requests(gpu),
            Err(e) => {
                log::error!("[AssetManager] check_requests refused: {}", e);
                0
            }
        }
    }

    /// Queue a request for the owning thread
    pub fn add_request<F>(&self, request: F)
    where
        F: FnOnce(&G) + Send + 'static,
    {
        self.inner.deferred.add_request(request);
    }

    pub fn pending_requests(&self) -> usize {
        self.inner.deferred.len()
    }

    /// No task in flight and nothing waiting for the owning thread
    pub fn is_idle(&self) -> bool {
        !self.inner.spawner.running() && self.inner.deferred.is_empty()
    }

    pub fn spawner(&self) -> &Arc<dyn TaskSpawner> {
        &self.inner.spawner
    }

    pub fn gpu(&self) -> &GpuContext<G> {
        &self.inner.gpu
    }

    pub fn stats(&self) -> &SceneStats {
        &self.inner.stats
    }

    pub fn set_benchmark_active(&self, active: bool) {
        self.inner.benchmark_active.store(active, Ordering::SeqCst);
    }

    pub fn benchmark_active(&self) -> bool {
        self.inner.benchmark_active.load(Ordering::SeqCst)
    }

    /// Evict every model, mesh, material, library, cube map and texture no
    /// one else holds, releasing their GPU side
    ///
    /// Models go first so the sub-resources they held are evicted in the
    /// same pass. Returns the number of evicted entries.
    pub fn clear_resources(&self) -> usize {
        // Dropping the evicted models releases their hold on meshes and
        // materials before those tables are swept.
        let model_count = self.inner.models.sweep().len();

        let meshes = self.inner.meshes.sweep();
        let materials = self.inner.materials.sweep().len();
        let libraries = self.inner.material_libraries.sweep().len();
        let cube_maps = self.inner.cube_maps.sweep();
        let textures = self.inner.textures.sweep();

        let evicted =
            model_count + meshes.len() + materials + libraries + cube_maps.len() + textures.len();
        if !meshes.is_empty() || !cube_maps.is_empty() || !textures.is_empty() {
            self.on_owner(move |gpu| {
                meshes.iter().filter_map(|m| m.get()).for_each(|m| m.release(gpu));
                cube_maps.iter().filter_map(|c| c.get()).for_each(|c| c.release(gpu));
                textures.iter().filter_map(|t| t.get()).for_each(|t| t.release(gpu));
            });
        }

        log::info!("[AssetManager] Cleared {} unused resources", evicted);
        evicted
    }

    // ---- Internals --------------------------------------------------------

    /// Get or create the entry for `key`; only the creator runs `job`
    fn load_entry<T, F>(
        &self,
        cache: &ResourceCache<T>,
        key: ResourceKey,
        mode: LoadMode,
        job: F,
    ) -> Handle<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&AssetManager<G>, &Handle<T>) + Send + 'static,
    {
        let (entry, created) = cache.get_or_insert(key);
        if !created {
            log::debug!("[AssetManager] {} {} already loaded", cache.kind(), entry.key());
            return entry;
        }

        match mode {
            LoadMode::Mono => job(self, &entry),
            LoadMode::Multi => {
                let manager = self.clone();
                let task_entry = Arc::clone(&entry);
                self.inner
                    .spawner
                    .spawn(Box::new(move || job(&manager, &task_entry)));
            }
        }
        entry
    }

    /// Load a resource that has no GPU side
    fn load_file_resource<T>(
        &self,
        cache: fn(&AssetManager<G>) -> &ResourceCache<T>,
        path: &Path,
        mode: LoadMode,
        read: fn(&Path) -> Result<T>,
    ) -> Handle<T>
    where
        T: Send + Sync + 'static,
    {
        let resolved = self.resolve(path);
        let key = ResourceKey::from_path(&resolved);
        self.load_entry(cache(self), key, mode, move |manager, entry| match read(&resolved) {
            Ok(value) => {
                entry.populate(value);
                entry.mark_ready();
            }
            Err(e) => manager.report_failure(cache(manager).metrics(), entry, &e),
        })
    }

    /// Run GPU work now if this thread may, otherwise queue it
    ///
    /// Mono loads upload inline on the owning thread unless a benchmark is
    /// running, so that measured load times exclude GPU stalls.
    pub(crate) fn run_on_owner<F>(&self, mode: LoadMode, request: F)
    where
        F: FnOnce(&G) + Send + 'static,
    {
        if mode == LoadMode::Mono && !self.benchmark_active() {
            self.on_owner(request);
        } else {
            self.inner.deferred.add_request(request);
        }
    }

    /// The deferred queue, without keeping it alive
    ///
    /// For requests that queue a follow-up of themselves.
    pub(crate) fn deferred_queue(&self) -> Weak<DeferredQueue<G>> {
        Arc::downgrade(&self.inner.deferred)
    }

    fn on_owner<F>(&self, request: F)
    where
        F: FnOnce(&G) + Send + 'static,
    {
        match self.inner.gpu.device() {
            Ok(gpu) => request(gpu),
            Err(_) => self.inner.deferred.add_request(request),
        }
    }

    pub(crate) fn upload_mesh(&self, entry: Handle<Mesh<G>>, mode: LoadMode) {
        let stats = Arc::clone(&self.inner.stats);
        let metrics = self.inner.meshes.metrics().clone();
        self.run_on_owner(mode, move |gpu| {
            let Some(mesh) = entry.get() else { return };
            match mesh.upload(gpu) {
                Ok(()) => {
                    entry.mark_ready();
                    stats.add_triangles(mesh.triangle_count());
                }
                Err(e) => report_upload_failure(&metrics, &entry, &e),
            }
        });
    }

    fn upload_texture(&self, entry: Handle<Texture<G>>, mode: LoadMode) {
        let stats = Arc::clone(&self.inner.stats);
        let metrics = self.inner.textures.metrics().clone();
        self.run_on_owner(mode, move |gpu| {
            let Some(texture) = entry.get() else { return };
            match texture.upload(gpu) {
                Ok(()) => {
                    entry.mark_ready();
                    stats.add_textures(1);
                }
                Err(e) => report_upload_failure(&metrics, &entry, &e),
            }
        });
    }

    fn upload_cube_map(&self, entry: Handle<CubeMap<G>>, mode: LoadMode) {
        let stats = Arc::clone(&self.inner.stats);
        let metrics = self.inner.cube_maps.metrics().clone();
        self.run_on_owner(mode, move |gpu| {
            let Some(cube) = entry.get() else { return };
            match cube.upload(gpu) {
                Ok(()) => {
                    entry.mark_ready();
                    stats.add_textures(crate::resources::CUBE_FACES);
                }
                Err(e) => report_upload_failure(&metrics, &entry, &e),
            }
        });
    }

    pub(crate) fn report_failure<T>(
        &self,
        metrics: &AssetMetricsHandle,
        entry: &ResourceEntry<T>,
        error: &AssetError,
    ) {
        entry.mark_failed();
        metrics.record_load_failure();
        log::error!("[AssetManager] Failed to load {}: {}", entry.key(), error);
    }
}

fn report_upload_failure<T>(
    metrics: &AssetMetricsHandle,
    entry: &ResourceEntry<T>,
    error: &AssetError,
) {
    entry.mark_failed();
    metrics.record_load_failure();
    log::error!("[AssetManager] Upload of {} skipped: {}", entry.key(), error);
}

//! OBJ geometry loading
//!
//! Faces are fan-triangulated from their first corner. Two corner encodings
//! are accepted: `v/vt/vn`, and `v//vn` which uses texture coordinate 1.
//! Indices are 1-based and shared by every object in the file.

use super::{parse_vec3, split_record};
use crate::cache::metrics::AssetMetricsHandle;
use crate::cache::{Handle, ResourceKey};
use crate::deferred::DeferredQueue;
use crate::error::AssetError;
use crate::gpu::GpuDevice;
use crate::manager::{AssetManager, LoadMode};
use crate::resources::{Corner, MaterialLibrary, Mesh, MeshData, Model, SubModel};
use glam::Vec3;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Instant;

/// Material used by sub-meshes before any `usemtl`
pub const DEFAULT_MATERIAL: &str = "default";

/// A finished sub-mesh
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMesh {
    pub name: String,
    pub material: String,
    pub data: MeshData,
}

/// Receives parser output as soon as it is available
pub trait ObjSink {
    /// A `mtllib` record
    fn material_library(&mut self, file_name: &str);

    /// A sub-mesh finished at an object boundary or the end of the file
    fn mesh(&mut self, mesh: ParsedMesh);
}

/// Corner triples of an N-corner polygon fanned from corner 0
pub fn fan_indices(corner_count: usize) -> Vec<[usize; 3]> {
    (2..corner_count).map(|i| [0, i - 1, i]).collect()
}

/// Parse the corners of an `f` record and triangulate them
///
/// Returns three corners per triangle.
pub fn parse_face(rest: &str) -> Result<Vec<Corner>, String> {
    let corners = rest
        .split_whitespace()
        .map(parse_corner)
        .collect::<Result<Vec<_>, _>>()?;
    if corners.len() < 3 {
        return Err(format!(
            "a face needs at least 3 corners, got {}",
            corners.len()
        ));
    }

    Ok(fan_indices(corners.len())
        .into_iter()
        .flat_map(|triangle| triangle.map(|i| corners[i]))
        .collect())
}

fn parse_corner(token: &str) -> Result<Corner, String> {
    let (position, tex_coord, normal) = match token.split_once("//") {
        Some((position, normal)) => (position, "1", normal),
        None => {
            let mut parts = token.split('/');
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(v), Some(vt), Some(vn), None) => (v, vt, vn),
                _ => return Err(format!("unsupported face corner '{}'", token)),
            }
        }
    };

    Ok(Corner {
        position: parse_index(position)?,
        tex_coord: parse_index(tex_coord)?,
        normal: parse_index(normal)?,
    })
}

fn parse_index(text: &str) -> Result<usize, String> {
    text.parse::<usize>()
        .ok()
        .and_then(|i| i.checked_sub(1))
        .ok_or_else(|| format!("invalid index '{}'", text))
}

/// Line-by-line OBJ parser
#[derive(Debug)]
pub struct ObjParser {
    origin: String,
    fallback_name: String,
    positions: Vec<Vec3>,
    tex_coords: Vec<Vec3>,
    normals: Vec<Vec3>,
    name: String,
    material: String,
    corners: Vec<Corner>,
    objects: usize,
}

impl ObjParser {
    /// `origin` names the file in logs; `fallback_name` names unnamed objects
    pub fn new(origin: impl Into<String>, fallback_name: impl Into<String>) -> Self {
        let fallback_name = fallback_name.into();
        Self {
            origin: origin.into(),
            name: fallback_name.clone(),
            fallback_name,
            positions: Vec::new(),
            tex_coords: Vec::new(),
            normals: Vec::new(),
            material: DEFAULT_MATERIAL.to_string(),
            corners: Vec::new(),
            objects: 0,
        }
    }

    pub fn feed_line<S: ObjSink>(&mut self, line_no: usize, line: &str, sink: &mut S) {
        let Some((keyword, rest)) = split_record(line) else {
            return;
        };

        match keyword {
            "o" | "g" => {
                self.flush(sink);
                self.objects += 1;
                self.name = if rest.is_empty() {
                    format!("{}_{}", self.fallback_name, self.objects)
                } else {
                    rest.to_string()
                };
            }
            "v" => {
                let value = self.vector(line_no, rest);
                self.positions.push(value);
            }
            "vt" => {
                let value = self.vector(line_no, rest);
                self.tex_coords.push(value);
            }
            "vn" => {
                let value = self.vector(line_no, rest);
                self.normals.push(value);
            }
            "f" => match parse_face(rest) {
                Ok(corners) => self.corners.extend(corners),
                Err(reason) => {
                    log::warn!("[ObjLoader] {}:{} face skipped: {}", self.origin, line_no, reason)
                }
            },
            "usemtl" => {
                self.material = if rest.is_empty() {
                    DEFAULT_MATERIAL.to_string()
                } else {
                    rest.to_string()
                };
            }
            "mtllib" => rest
                .split_whitespace()
                .for_each(|file| sink.material_library(file)),
            "s" => {}
            other => log::debug!("[ObjLoader] {}:{} ignoring '{}'", self.origin, line_no, other),
        }
    }

    /// Emit the last sub-mesh
    pub fn finish<S: ObjSink>(mut self, sink: &mut S) {
        self.flush(sink);
    }

    /// Build the pending sub-mesh, if it has any faces
    fn flush<S: ObjSink>(&mut self, sink: &mut S) {
        if self.corners.is_empty() {
            return;
        }
        let corners = std::mem::take(&mut self.corners);

        match MeshData::interleave(&self.positions, &self.tex_coords, &self.normals, &corners) {
            Ok(data) => sink.mesh(ParsedMesh {
                name: self.name.clone(),
                material: self.material.clone(),
                data,
            }),
            Err(e) => log::warn!(
                "[ObjLoader] {} mesh {} skipped: {}",
                self.origin,
                self.name,
                e
            ),
        }
    }

    // A malformed vector still takes its slot so later indices stay aligned.
    fn vector(&self, line_no: usize, rest: &str) -> Vec3 {
        parse_vec3(rest).unwrap_or_else(|reason| {
            log::warn!("[ObjLoader] {}:{} {}", self.origin, line_no, reason);
            Vec3::ZERO
        })
    }
}

/// Turns parsed sub-meshes into cache entries for one model
struct ModelSink<'a, G: GpuDevice> {
    manager: &'a AssetManager<G>,
    directory: PathBuf,
    mode: LoadMode,
    sub_models: Vec<SubModel<G>>,
    libraries: Vec<Handle<MaterialLibrary>>,
}

impl<G: GpuDevice> ObjSink for ModelSink<'_, G> {
    fn material_library(&mut self, file_name: &str) {
        let library = self
            .manager
            .load_material_library(self.directory.join(file_name), self.mode);
        self.libraries.push(library);
    }

    fn mesh(&mut self, parsed: ParsedMesh) {
        let (mesh, created) = self
            .manager
            .meshes()
            .get_or_insert(ResourceKey::new(&parsed.name));
        if created {
            mesh.populate(Mesh::new(parsed.name, parsed.data));
            self.manager.upload_mesh(Arc::clone(&mesh), self.mode);
        } else {
            log::warn!("[ObjLoader] Mesh {} already exists, reusing it", mesh.key());
        }

        let material = self.manager.load_material(&parsed.material);
        self.sub_models.push(SubModel { mesh, material });
    }
}

/// Owner-thread step that marks a model ready once every sub-mesh is uploaded
///
/// A sub-mesh shared with another model may still have its upload queued
/// behind this request, so the check goes back on the queue until it lands.
/// A failed sub-mesh leaves the model unready for good.
fn finish_model<G: GpuDevice>(
    model: Handle<Model<G>>,
    metrics: AssetMetricsHandle,
    queue: Weak<DeferredQueue<G>>,
) {
    let Some(data) = model.get() else { return };

    if let Some(mesh) = data.failed_mesh() {
        log::error!(
            "[ObjLoader] {} will never be ready: mesh {} failed",
            model.key(),
            mesh.key()
        );
        model.mark_failed();
        metrics.record_load_failure();
        return;
    }

    if data.meshes_ready() {
        model.mark_ready();
        return;
    }

    if let Some(deferred) = queue.upgrade() {
        deferred.add_request(move |_| finish_model(model, metrics, queue));
    }
}

/// Load job for one model entry
///
/// Mesh uploads and the final ready step take the same route, so with
/// deferred uploads the model is checked only after its own meshes went up.
pub(crate) fn load_obj<G: GpuDevice>(
    manager: &AssetManager<G>,
    model: &Handle<Model<G>>,
    path: &Path,
    mode: LoadMode,
) {
    let start = Instant::now();
    manager.stats().add_models(1);

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            manager.report_failure(manager.models().metrics(), model, &AssetError::io(path, e));
            return;
        }
    };

    let fallback = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string());
    let mut parser = ObjParser::new(path.display().to_string(), fallback);
    let mut sink = ModelSink {
        manager,
        directory: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        mode,
        sub_models: Vec::new(),
        libraries: Vec::new(),
    };
    for (index, line) in text.lines().enumerate() {
        parser.feed_line(index + 1, line, &mut sink);
    }
    parser.finish(&mut sink);

    model.populate(Model {
        path: path.display().to_string(),
        sub_models: sink.sub_models,
        libraries: sink.libraries,
    });
    let ready = Arc::clone(model);
    let metrics = manager.models().metrics().clone();
    let queue = manager.deferred_queue();
    manager.run_on_owner(mode, move |_| finish_model(ready, metrics, queue));

    let elapsed = start.elapsed();
    manager
        .models()
        .metrics()
        .record_load_time(model.key().to_string(), elapsed);
    log::info!("[ObjLoader] {} loaded in {:.3} s", path.display(), elapsed.as_secs_f32());
}

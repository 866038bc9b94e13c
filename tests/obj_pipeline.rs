//! Integration tests for OBJ / MTL loading in both modes

mod common;

use asset_relay::{AssetManager, EngineConfig, InlineSpawner, LoadMode, MockGpu, WorkerPool};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn inline_manager(root: &Path) -> AssetManager {
    let config = EngineConfig::default().with_asset_root(root);
    AssetManager::new(MockGpu::new(), Arc::new(InlineSpawner::new()), &config)
}

fn assert_box_loaded(manager: &AssetManager) {
    let model = manager.get_model("box.obj").unwrap();
    let model_data = model.get().unwrap();
    assert_eq!(model_data.sub_models.len(), 2);
    assert_eq!(model_data.triangle_count(), 3);
    assert!(model_data.meshes_ready());

    let front = manager.get_mesh_by_name("front").unwrap();
    let front = front.get().unwrap();
    assert_eq!(front.triangle_count(), 2);
    assert_eq!(front.data().stride(), 9);
    assert_eq!(front.data().vertices.len(), 6 * 9);

    let red = manager.get_material_by_name("red").unwrap();
    assert!(red.is_ready());
    let red = red.get().unwrap();
    assert_eq!(red.diffuse, glam::Vec3::new(1.0, 0.0, 0.0));
    assert!(red.diffuse_map.as_ref().unwrap().is_ready());

    let blue = manager.get_material_by_name("blue").unwrap();
    assert!(blue.get().unwrap().diffuse_map.is_none());

    let counts = manager.stats().snapshot();
    assert_eq!(counts.models, 1);
    assert_eq!(counts.triangles, 3);
    assert_eq!(counts.textures, 1);
}

#[test]
fn test_mono_load_is_ready_on_return() {
    common::init_logger();
    let dir = tempfile::tempdir().unwrap();
    common::write_box_scene(dir.path());
    let manager = inline_manager(dir.path());

    let model = manager.load_model("box.obj", LoadMode::Mono);
    assert!(model.is_ready());
    assert_eq!(manager.pending_requests(), 0);
    assert_box_loaded(&manager);
    assert!(manager.models().metrics().load_time(model.key().as_str()).is_some());
}

#[test]
fn test_multi_load_becomes_ready_after_ticks() {
    common::init_logger();
    let dir = tempfile::tempdir().unwrap();
    common::write_box_scene(dir.path());

    let pool = Arc::new(WorkerPool::new(4));
    pool.init().unwrap();
    let config = EngineConfig::default().with_asset_root(dir.path());
    let manager = AssetManager::new(MockGpu::new(), pool.clone(), &config);

    let model = manager.load_model("box.obj", LoadMode::Multi);
    // Uploads wait for this thread, so it cannot be ready yet
    assert!(!model.is_ready());

    let ready = common::poll_until(
        Duration::from_secs(10),
        || {
            manager.check_requests();
        },
        || model.is_ready() && manager.is_idle(),
    );
    assert!(ready);
    assert_box_loaded(&manager);
    pool.end();
}

#[test]
fn test_mono_during_benchmark_defers_uploads() {
    let dir = tempfile::tempdir().unwrap();
    common::write_box_scene(dir.path());
    let manager = inline_manager(dir.path());
    manager.set_benchmark_active(true);

    let model = manager.load_model("box.obj", LoadMode::Mono);
    assert!(model.is_populated());
    assert!(!model.is_ready());
    // two meshes, one texture, then the model itself
    assert_eq!(manager.pending_requests(), 4);

    while manager.check_requests() > 0 {}
    assert!(model.is_ready());
    assert_box_loaded(&manager);
}

#[test]
fn test_shared_library_parsed_once() {
    let dir = tempfile::tempdir().unwrap();
    common::write_box_scene(dir.path());
    std::fs::write(
        dir.path().join("other.obj"),
        "mtllib box.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\no side\nusemtl blue\nf 1//1 2//1 3//1\n",
    )
    .unwrap();
    let manager = inline_manager(dir.path());

    let first = manager.load_model("box.obj", LoadMode::Mono);
    let second = manager.load_model("other.obj", LoadMode::Mono);
    assert!(first.is_ready() && second.is_ready());

    assert_eq!(manager.material_libraries().len(), 1);
    assert_eq!(manager.material_libraries().metrics().cache_misses(), 1);
    assert_eq!(manager.material_libraries().metrics().cache_hits(), 1);

    let blue_first = &first.get().unwrap().sub_models[1].material;
    let blue_second = &second.get().unwrap().sub_models[0].material;
    assert!(Arc::ptr_eq(blue_first, blue_second));
}

#[test]
fn test_mesh_name_collision_keeps_first() {
    let dir = tempfile::tempdir().unwrap();
    common::write_box_scene(dir.path());
    std::fs::write(
        dir.path().join("clash.obj"),
        "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\no front\nf 1//1 2//1 3//1\n",
    )
    .unwrap();
    let manager = inline_manager(dir.path());

    let original = manager.load_model("box.obj", LoadMode::Mono);
    let clash = manager.load_model("clash.obj", LoadMode::Mono);

    let front = &original.get().unwrap().sub_models[0].mesh;
    let reused = &clash.get().unwrap().sub_models[0].mesh;
    assert!(Arc::ptr_eq(front, reused));
    assert_eq!(reused.get().unwrap().triangle_count(), 2);
    // Faces before any usemtl use the default material name
    assert_eq!(clash.get().unwrap().sub_models[0].material.key().as_str(), "default");
}

#[test]
fn test_missing_model_never_ready() {
    let dir = tempfile::tempdir().unwrap();
    let manager = inline_manager(dir.path());

    let model = manager.load_model("nothing.obj", LoadMode::Mono);
    assert!(!model.is_populated());
    assert_eq!(manager.models().metrics().load_failures(), 1);
    // The entry stays, so a second load does not retry
    let again = manager.load_model("nothing.obj", LoadMode::Mono);
    assert!(Arc::ptr_eq(&model, &again));
    assert_eq!(manager.models().metrics().load_failures(), 1);
}

#[test]
fn test_model_waits_for_mesh_shared_with_another_model() {
    let dir = tempfile::tempdir().unwrap();
    let shared = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\no shared\nf 1//1 2//1 3//1\n";
    std::fs::write(dir.path().join("a.obj"), shared).unwrap();
    std::fs::write(dir.path().join("b.obj"), shared).unwrap();
    let manager = inline_manager(dir.path());

    // a.obj creates the mesh and queues its upload
    let first = manager.load_model("a.obj", LoadMode::Multi);
    // b.obj reuses it; a mono load would otherwise turn ready on return
    let second = manager.load_model("b.obj", LoadMode::Mono);
    let mesh = manager.get_mesh_by_name("shared").unwrap();
    assert!(Arc::ptr_eq(&second.get().unwrap().sub_models[0].mesh, &mesh));

    assert!(!mesh.is_ready());
    assert!(!first.is_ready());
    assert!(!second.is_ready());

    while manager.check_requests() > 0 {
        assert!(mesh.is_ready() || !second.is_ready());
    }
    assert!(mesh.is_ready());
    assert!(first.is_ready());
    assert!(second.is_ready());
    assert!(manager.is_idle());
}

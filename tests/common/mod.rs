//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::path::Path;
use std::time::{Duration, Instant};

pub const BOX_OBJ: &str = "\
# two objects sharing one vertex list
mtllib box.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
o front
usemtl red
f 1/1/1 2/2/1 3/3/1 4/4/1
o back
usemtl blue
f 4/4/1 3/3/1 2/2/1
";

pub const BOX_MTL: &str = "\
newmtl red
Kd 1 0 0
map_Kd red.png

newmtl blue
Kd 0 0 1
";

pub const SCENE: &str = "\
GO box
model box.obj
GO marker
texture marker.png
";

/// Write a small RGBA png
pub fn write_png(path: &Path, rgba: [u8; 4]) {
    image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba))
        .save(path)
        .unwrap();
}

/// box.obj, box.mtl, red.png, marker.png and scene.scn
pub fn write_box_scene(dir: &Path) {
    std::fs::write(dir.join("box.obj"), BOX_OBJ).unwrap();
    std::fs::write(dir.join("box.mtl"), BOX_MTL).unwrap();
    std::fs::write(dir.join("scene.scn"), SCENE).unwrap();
    write_png(&dir.join("red.png"), [255, 0, 0, 255]);
    write_png(&dir.join("marker.png"), [0, 255, 0, 255]);
}

/// Call `tick` until `done` holds or the timeout expires
pub fn poll_until(timeout: Duration, mut tick: impl FnMut(), mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        tick();
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

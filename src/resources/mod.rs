//! Resource kinds held by the caches

pub mod cube_map;
pub mod font;
pub mod material;
pub mod mesh;
pub mod model;
pub mod recipe;
pub mod shader;
pub mod texture;

pub use cube_map::{CubeMap, CUBE_FACES};
pub use font::Font;
pub use material::{Material, MaterialLibrary};
pub use mesh::{Corner, Mesh, MeshData};
pub use model::{Model, SubModel};
pub use recipe::Recipe;
pub use shader::{Shader, ShaderProgram, ShaderStage};
pub use texture::{Texture, TextureData, TextureLoader};

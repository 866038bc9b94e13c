//! Scene counters fed by the load pipeline

use std::sync::atomic::{AtomicUsize, Ordering};

/// Live counters, updated from workers and the owning thread
#[derive(Debug, Default)]
pub struct SceneStats {
    objects: AtomicUsize,
    models: AtomicUsize,
    triangles: AtomicUsize,
    textures: AtomicUsize,
}

/// A point-in-time copy of [`SceneStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneCounts {
    pub objects: usize,
    pub models: usize,
    pub triangles: usize,
    pub textures: usize,
}

impl SceneStats {
    pub fn add_objects(&self, count: usize) {
        self.objects.fetch_add(count, Ordering::Relaxed);
    }

    /// Counted once per model cache miss
    pub fn add_models(&self, count: usize) {
        self.models.fetch_add(count, Ordering::Relaxed);
    }

    /// Counted when a mesh upload succeeds
    pub fn add_triangles(&self, count: usize) {
        self.triangles.fetch_add(count, Ordering::Relaxed);
    }

    /// Counted when a texture upload succeeds; a cube map adds six
    pub fn add_textures(&self, count: usize) {
        self.textures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.objects.store(0, Ordering::Relaxed);
        self.models.store(0, Ordering::Relaxed);
        self.triangles.store(0, Ordering::Relaxed);
        self.textures.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SceneCounts {
        SceneCounts {
            objects: self.objects.load(Ordering::Relaxed),
            models: self.models.load(Ordering::Relaxed),
            triangles: self.triangles.load(Ordering::Relaxed),
            textures: self.textures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_reset() {
        let stats = SceneStats::default();
        stats.add_objects(2);
        stats.add_models(1);
        stats.add_triangles(12);
        stats.add_textures(6);

        assert_eq!(
            stats.snapshot(),
            SceneCounts {
                objects: 2,
                models: 1,
                triangles: 12,
                textures: 6
            }
        );

        stats.reset();
        assert_eq!(stats.snapshot(), SceneCounts::default());
    }
}

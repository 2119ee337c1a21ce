/// Static terrain heightmap lookup.
///
/// Pure function of (x, z): `None` outside loaded bounds, never an error.
/// Loading the underlying data is out of scope; the instance only consumes
/// the lookup.
pub trait Terrain: Send + Sync {
    fn height(&self, x: f32, z: f32) -> Option<f32>;
}

/// Constant height inside a square of `half_extent` around the origin,
/// unloaded outside.
#[derive(Debug, Clone, Copy)]
pub struct FlatTerrain {
    pub height: f32,
    pub half_extent: f32,
}

impl Terrain for FlatTerrain {
    fn height(&self, x: f32, z: f32) -> Option<f32> {
        if x.abs() <= self.half_extent && z.abs() <= self.half_extent {
            Some(self.height)
        } else {
            None
        }
    }
}

/// No terrain loaded anywhere. Relocations keep their requested height.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTerrain;

impl Terrain for NullTerrain {
    fn height(&self, _x: f32, _z: f32) -> Option<f32> {
        None
    }
}

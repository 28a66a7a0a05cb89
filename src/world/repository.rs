use crate::core::world::WorldSnapshot;

/// Source of the world the limiter polices.
pub trait WorldRepository {
    fn load_snapshot(&self) -> Result<WorldSnapshot, Box<dyn std::error::Error>>;
    fn save_snapshot(&mut self, snapshot: &WorldSnapshot) -> Result<(), Box<dyn std::error::Error>>;
}

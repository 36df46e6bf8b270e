use crc32fast::Hasher;

/// Hash a seed string into a short hex prefix
pub fn seed_hash(seed: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(seed.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential id generator for component instances
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String, // CRC32 of the session seed
    count: u32,   // Sequential counter
}

impl IdGenerator {
    pub fn new(seed: &str) -> Self {
        Self {
            seed: seed_hash(seed),
            count: 0,
        }
    }

    /// Generate the next id for a component of `component_type`
    pub fn component_id(&mut self, component_type: &str) -> String {
        self.count += 1;
        format!("{}-{}-{}", component_type, self.seed, self.count)
    }

    /// Next id for `component_type` that `taken` does not claim
    pub fn unused_component_id(&mut self, component_type: &str, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = self.component_id(component_type);
            if !taken(&id) {
                return id;
            }
        }
    }

    /// Get the hashed seed
    pub fn seed(&self) -> &str {
        &self.seed
    }
}

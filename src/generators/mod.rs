pub mod golang;

use serde::Serialize;
use std::collections::HashMap;

use crate::config::GenerationConfig;
use crate::error::Result;
use crate::naming::IdentifierAllocator;
use crate::pipeline::GenerationPlan;

pub use golang::GolangGenerator;

/// One emitted source file, named without its extension (`types`,
/// `client_pets`, `oauth2_petstore_auth`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub name: String,
    pub content: String,
}

impl Artifact {
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.name)
    }
}

/// Generator trait - renders a resolved generation plan as target language code
pub trait Generator: Send + Sync {
    /// Unique name of the generator (e.g., "golang")
    fn name(&self) -> &str;

    /// File extension for generated output (e.g., "go")
    fn file_extension(&self) -> &str;

    /// Block the identifiers the emitted code declares itself. Called before
    /// any schema, operation or scheme is named.
    fn reserve_identifiers(&self, allocator: &mut IdentifierAllocator);

    /// Render every artifact of the plan
    fn render(&self, plan: &GenerationPlan<'_>, config: &GenerationConfig) -> Result<Vec<Artifact>>;

    /// Validate generator-specific configuration
    fn validate_config(&self, _config: &GenerationConfig) -> Result<()> {
        Ok(())
    }
}

/// Generator registry for managing available code generators
pub struct GeneratorRegistry {
    generators: HashMap<String, Box<dyn Generator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            generators: HashMap::new(),
        };

        // Register built-in generators
        registry.register(Box::new(GolangGenerator));

        registry
    }

    pub fn register(&mut self, generator: Box<dyn Generator>) {
        self.generators.insert(generator.name().to_string(), generator);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Generator> {
        self.generators.get(name).map(|g| g.as_ref())
    }

    pub fn available_generators(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.generators.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

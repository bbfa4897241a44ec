use crate::config::GenerationConfig;
use crate::diagnostics::Diagnostics;
use crate::naming::IdentifierAllocator;

/// Mutable state of exactly one generation pass.
///
/// Created at the start of [`generate`](crate::pipeline::generate) and dropped
/// at the end; nothing in here outlives the pass, so independent passes can
/// run on separate threads without sharing anything.
#[derive(Debug)]
pub struct GenerationContext<'a> {
    pub config: &'a GenerationConfig,
    pub allocator: IdentifierAllocator,
    pub diagnostics: Diagnostics,
}

impl<'a> GenerationContext<'a> {
    pub fn new(config: &'a GenerationConfig) -> Self {
        Self {
            config,
            allocator: IdentifierAllocator::new(),
            diagnostics: Diagnostics::new(),
        }
    }
}

use crate::error::{ChunkerError, Result};
use crate::fallback;
use crate::language::Language;
use crate::splitter;
use crate::types::Chunk;

/// Chunker tuning knobs.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Chunks larger than this are split along syntactic, then line
    /// boundaries.
    pub max_chunk_chars: usize,

    /// Gap fragments separated by more than this many blank lines become
    /// separate chunks.
    pub gap_max_blank_lines: usize,

    /// Target chunk height for the line-based fallback splitter.
    pub fallback_chunk_lines: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 6144,
            gap_max_blank_lines: 2,
            fallback_chunk_lines: 60,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_chars == 0 {
            return Err(ChunkerError::invalid_config("max_chunk_chars must be > 0"));
        }
        if self.fallback_chunk_lines == 0 {
            return Err(ChunkerError::invalid_config(
                "fallback_chunk_lines must be > 0",
            ));
        }
        Ok(())
    }
}

/// Main chunker interface: dispatches files to the syntax-tree splitter or
/// the line-based fallback by language.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a new chunker with configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Chunk a file's content, detecting the language from the path.
    ///
    /// Never fails: parse errors fall back to the line splitter, keeping the
    /// detected language tag. An empty file yields zero chunks.
    pub fn chunk_file(&self, relative_path: &str, content: &str, file_hash: &str) -> Vec<Chunk> {
        let language = Language::from_path(relative_path);
        self.chunk_with_language(relative_path, content, file_hash, language)
    }

    /// Chunk with an explicit language.
    pub fn chunk_with_language(
        &self,
        relative_path: &str,
        content: &str,
        file_hash: &str,
        language: Language,
    ) -> Vec<Chunk> {
        if content.is_empty() {
            return Vec::new();
        }

        if language.supports_syntax() {
            match splitter::split_syntax(
                relative_path,
                content,
                file_hash,
                language,
                self.config.max_chunk_chars,
                self.config.gap_max_blank_lines,
            ) {
                Ok(chunks) => return chunks,
                Err(e) => {
                    log::warn!(
                        "syntax splitting failed for {relative_path}: {e}; using line fallback"
                    );
                }
            }
        }

        fallback::split_fallback(
            relative_path,
            content,
            file_hash,
            language.as_str(),
            self.config.fallback_chunk_lines,
        )
    }

    /// Get configuration
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }
}

use regex::Regex;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBlock {
    /// The title line that opened the block; `None` for text before the first title.
    pub title: Option<String>,
    pub lines: Vec<String>,
}

/// Splits a packed-text export into chapters.
///
/// A line matching `title_pattern` opens a block; every following line up to
/// the next title line is its body. The convention is specific to the export
/// format of one family of sites, so the pattern is part of the domain layout.
#[derive(Debug, Clone)]
pub struct PackedTextSplitter {
    title_pattern: Regex,
}

impl PackedTextSplitter {
    pub fn new(title_pattern: &str) -> Result<Self, ConfigError> {
        let title_pattern =
            Regex::new(title_pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: title_pattern.to_owned(),
                source,
            })?;
        Ok(Self { title_pattern })
    }

    pub fn split(&self, text: &str) -> Vec<PackedBlock> {
        let mut blocks = Vec::new();
        let mut current = PackedBlock {
            title: None,
            lines: Vec::new(),
        };

        for line in text.lines() {
            if self.title_pattern.is_match(line) {
                push_block(&mut blocks, current);
                current = PackedBlock {
                    title: Some(line.trim().to_owned()),
                    lines: Vec::new(),
                };
                continue;
            }
            current.lines.push(line.to_owned());
        }
        push_block(&mut blocks, current);

        blocks
    }
}

fn push_block(blocks: &mut Vec<PackedBlock>, block: PackedBlock) {
    let has_text = block.lines.iter().any(|line| !line.trim().is_empty());
    if block.title.is_some() || has_text {
        blocks.push(block);
    }
}

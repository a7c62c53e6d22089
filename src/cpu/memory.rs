//! Word machine memory subsystem.
//!
//! Memory is a sparse, effectively unbounded store of signed words keyed by
//! non-negative integer address. Addresses that were never written read back
//! as zero without creating a cell.

use crate::cpu::Word;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Sparse word memory.
///
/// Only written cells are stored; the address space itself has no upper
/// bound. Negative addresses are outside the address space entirely and
/// every access to one is a hard fault.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Memory {
    cells: BTreeMap<Word, Word>,
}

impl Memory {
    /// Create a new, fully unset memory.
    pub fn new() -> Self {
        Self {
            cells: BTreeMap::new(),
        }
    }

    /// Create a memory pre-loaded with a program image at address 0.
    pub fn from_image(image: &[Word]) -> Self {
        let mut mem = Self::new();
        mem.load_image(image);
        mem
    }

    /// Read the word at an address.
    ///
    /// Returns 0 for any address that was never written; the cell is not
    /// created. Whether an address is set can be observed with
    /// [`Memory::is_set`].
    pub fn read(&self, addr: Word) -> Result<Word, MemoryError> {
        if addr < 0 {
            return Err(MemoryError::NegativeAddress(addr));
        }
        Ok(self.cells.get(&addr).copied().unwrap_or(0))
    }

    /// Write a word to an address, creating the cell if absent.
    pub fn write(&mut self, addr: Word, value: Word) -> Result<(), MemoryError> {
        if addr < 0 {
            return Err(MemoryError::NegativeAddress(addr));
        }
        self.cells.insert(addr, value);
        Ok(())
    }

    /// Whether the address holds a written cell.
    pub fn is_set(&self, addr: Word) -> bool {
        self.cells.contains_key(&addr)
    }

    /// Number of written cells.
    pub fn set_cells(&self) -> usize {
        self.cells.len()
    }

    /// Copy a program image into addresses `0..image.len()`.
    pub fn load_image(&mut self, image: &[Word]) {
        for (addr, &word) in image.iter().enumerate() {
            self.cells.insert(addr as Word, word);
        }
    }

    /// Snapshot of all written cells in address order.
    pub fn dump(&self) -> Vec<(Word, Word)> {
        self.cells.iter().map(|(&addr, &word)| (addr, word)).collect()
    }

    /// Forget every written cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only summarize; the map can be arbitrarily large
        f.debug_struct("Memory")
            .field("set_cells", &self.cells.len())
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// The address space has no negative region.
    #[error("negative address {0} is outside the address space")]
    NegativeAddress(Word),
}

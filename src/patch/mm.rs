//! The memory manager: decides where bytes that no longer fit in place will
//! live, by planning one additional loadable region spliced in right after
//! the mapped portion of the file.

use log::debug;

use crate::elf::program_header::{PF_R, PF_W, PT_LOAD, PT_NULL, ProgramHeader};
use crate::error::{Error, Result};

/// Granularity of the kernel loader's mappings; the extension is always a
/// multiple of this and every handed-out region keeps
/// `vaddr ≡ offset (mod PAGE_SIZE)`
pub const PAGE_SIZE: u64 = 0x1000;

/// Every allocation starts 8-aligned, enough for any dynamic structure
/// placed in the region
const ALLOC_ALIGN: u64 = 8;

#[inline]
fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}

/// A file/VMA extent handed out by [`MemoryManager::malloc`]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Region {
    pub offset: u64,
    pub vaddr: u64,
    pub size: u64,
}

/// How the new loadable region is realized in the program-header table
#[derive(Debug, Copy, Clone, PartialEq)]
enum Placement {
    /// Claim this unused `PT_NULL` slot as a fresh `PT_LOAD`
    Slot(usize),
    /// Grow this trailing `PT_LOAD` over the inserted bytes
    Grow(usize),
}

#[derive(Debug)]
pub struct MemoryManager {
    /// End file offset of the mapped image (the last `PT_LOAD`); bytes at or
    /// past this point shift when the file is extended
    threshold: Option<u64>,
    base_vaddr: u64,
    cursor: u64,
    placement: Option<Placement>,
    allocs: Vec<Region>,
}

impl MemoryManager {
    pub fn new(phdrs: &[ProgramHeader]) -> MemoryManager {
        let threshold = phdrs
            .iter()
            .filter(|phdr| phdr.p_type == PT_LOAD)
            .last()
            .map(|phdr| phdr.p_offset + phdr.p_filesz);
        MemoryManager {
            threshold,
            base_vaddr: 0,
            cursor: 0,
            placement: None,
            allocs: Vec::new(),
        }
    }

    /// Reserves `size` bytes inside the planned extension and returns where
    /// they will live. The caller writes the bytes through an inline patch
    /// keyed on the returned offset.
    pub fn malloc(&mut self, size: u64, phdrs: &[ProgramHeader]) -> Result<Region> {
        let threshold = self.threshold.ok_or_else(|| {
            Error::Malformed("cannot place new bytes: image has no PT_LOAD segment".into())
        })?;
        if self.placement.is_none() {
            self.plan(threshold, phdrs)?;
        }
        self.cursor = align_up(threshold + self.cursor, ALLOC_ALIGN) - threshold;
        let region = Region {
            offset: threshold + self.cursor,
            vaddr: self.base_vaddr + self.cursor,
            size,
        };
        self.cursor += size;
        self.allocs.push(region);
        debug!(
            "reserved {} bytes at offset 0x{:x}, vaddr 0x{:x}",
            size, region.offset, region.vaddr
        );
        Ok(region)
    }

    /// Picks how the extension will appear in the program-header table.
    /// Claiming a spare slot comes first since it leaves every existing load
    /// untouched; growing the trailing load is the fallback.
    fn plan(&mut self, threshold: u64, phdrs: &[ProgramHeader]) -> Result<()> {
        let top = phdrs
            .iter()
            .filter(|phdr| phdr.p_type == PT_LOAD)
            .map(|phdr| phdr.p_vaddr + phdr.p_memsz)
            .max()
            .unwrap_or(0);
        if let Some(i) = phdrs.iter().position(|phdr| phdr.p_type == PT_NULL) {
            self.base_vaddr = align_up(top, PAGE_SIZE) + threshold % PAGE_SIZE;
            self.placement = Some(Placement::Slot(i));
            debug!(
                "claiming spare program header slot {} for a new PT_LOAD at vaddr 0x{:x}",
                i, self.base_vaddr
            );
            return Ok(());
        }
        if let Some(i) = phdrs.iter().rposition(|phdr| phdr.p_type == PT_LOAD) {
            let phdr = &phdrs[i];
            // growing is only sound when the load ends exactly where the new
            // bytes begin, maps no zero-fill tail, and tops the address space
            if phdr.p_offset + phdr.p_filesz == threshold
                && phdr.p_filesz == phdr.p_memsz
                && phdr.p_vaddr + phdr.p_memsz == top
                && (phdr.p_vaddr + phdr.p_filesz) % PAGE_SIZE == threshold % PAGE_SIZE
            {
                self.base_vaddr = phdr.p_vaddr + phdr.p_filesz;
                self.placement = Some(Placement::Grow(i));
                debug!("growing trailing PT_LOAD {} over the new bytes", i);
                return Ok(());
            }
        }
        Err(Error::Malformed(
            "cannot place a new PT_LOAD: no unused program header slot and the trailing PT_LOAD cannot be grown"
                .into(),
        ))
    }

    /// Whether any allocation occurred
    pub fn extended(&self) -> bool {
        !self.allocs.is_empty()
    }

    /// Total bytes spliced into the file, rounded up to a page multiple
    pub fn extend_size(&self) -> u64 {
        align_up(self.cursor, PAGE_SIZE)
    }

    /// End file offset of the mapped image, when the input has any `PT_LOAD`
    pub fn threshold(&self) -> Option<u64> {
        self.threshold
    }

    /// Translates a pre-extension file offset to its post-extension location
    pub fn extended_offset(&self, offset: u64) -> u64 {
        match self.threshold {
            Some(threshold) if self.extended() && offset >= threshold => {
                offset + self.extend_size()
            }
            _ => offset,
        }
    }

    /// The satisfied allocations, in allocation order
    pub fn allocs(&self) -> &[Region] {
        &self.allocs
    }

    /// Realizes the planned loadable region in the program-header table
    pub fn dispatch(&self, phdrs: &mut [ProgramHeader], touched: &mut [bool]) -> Result<()> {
        if !self.extended() {
            return Ok(());
        }
        let extend = self.extend_size();
        match (self.placement, self.threshold) {
            (Some(Placement::Slot(i)), Some(threshold)) => {
                phdrs[i] = ProgramHeader {
                    p_type: PT_LOAD,
                    p_flags: PF_R | PF_W,
                    p_offset: threshold,
                    p_vaddr: self.base_vaddr,
                    p_paddr: self.base_vaddr,
                    p_filesz: extend,
                    p_memsz: extend,
                    p_align: PAGE_SIZE,
                };
                touched[i] = true;
            }
            (Some(Placement::Grow(i)), Some(_)) => {
                phdrs[i].p_filesz += extend;
                phdrs[i].p_memsz += extend;
                touched[i] = true;
            }
            _ => {
                return Err(Error::Malformed(
                    "extension planned without a realizable PT_LOAD".into(),
                ));
            }
        }
        Ok(())
    }
}

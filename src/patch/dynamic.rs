//! The dynamic-segment editor: mutates existing `DT_SONAME` and
//! `DT_RUNPATH`/`DT_RPATH` values, lazily appends the search-path tag when
//! the input lacks one, and relocates the whole `PT_DYNAMIC` payload when it
//! grew.

use log::{debug, warn};
use scroll::Pwrite;
use scroll::ctx::SizeWith;

use crate::elf::dynamic::{self, Dyn, tag_to_str};
use crate::elf::program_header::PT_DYNAMIC;
use crate::elf::section_header::SHT_DYNAMIC;
use crate::error::Result;
use crate::patch::Saver;

impl Saver<'_> {
    pub(crate) fn patch_soname(&mut self, name: &str) -> Result<()> {
        if !self.has_dynamic {
            warn!("Entry PT_DYNAMIC not found, cannot set DT_SONAME");
            return Ok(());
        }
        let Some(pos) = self
            .dyns
            .iter()
            .position(|d| d.d_tag == dynamic::DT_SONAME)
        else {
            warn!("Entry DT_SONAME not found, not a shared library?");
            return Ok(());
        };
        self.dynstr.request(name, pos, &mut self.dyns);
        self.dyn_dirty = true;
        self.changed = true;
        Ok(())
    }

    /// Sets the library search path stored under `tag` (`DT_RUNPATH`, or
    /// `DT_RPATH` when the facade was switched over), creating the entry
    /// ahead of the terminating `DT_NULL` when the input has none
    pub(crate) fn patch_library_path(&mut self, path: &str, tag: u64) -> Result<()> {
        if !self.has_dynamic {
            warn!("Entry PT_DYNAMIC not found, cannot set {}", tag_to_str(tag));
            return Ok(());
        }
        let pos = match self.dyns.iter().position(|d| d.d_tag == tag) {
            Some(pos) => pos,
            None => {
                let null = self
                    .dyns
                    .iter()
                    .position(|d| d.d_tag == dynamic::DT_NULL)
                    .unwrap_or(self.dyns.len());
                self.dyns.insert(null, Dyn { d_tag: tag, d_val: 0 });
                self.appended_dyns += 1;
                debug!("appending a {} entry to the dynamic array", tag_to_str(tag));
                null
            }
        };
        self.dynstr.request(path, pos, &mut self.dyns);
        self.dyn_dirty = true;
        self.changed = true;
        Ok(())
    }

    /// Serializes the dynamic array once every tag value is final: over its
    /// original location when the entry count is unchanged, or into a fresh
    /// allocation (with `PT_DYNAMIC` and `.dynamic` retargeted) when it grew
    pub(crate) fn materialize_dynamic(&mut self) -> Result<()> {
        if !self.dyn_dirty {
            return Ok(());
        }
        let Some(pd) = self
            .phdrs
            .iter()
            .position(|phdr| phdr.p_type == PT_DYNAMIC)
        else {
            return Ok(());
        };
        let ctx = self.elf.ctx;
        let len = self.dyns.len() * Dyn::size_with(&ctx);
        let mut buf = vec![0u8; len];
        let offset = &mut 0;
        for dyn_ in &self.dyns {
            buf.gwrite_with(*dyn_, offset, ctx)?;
        }
        if self.appended_dyns > 0 {
            let region = self.mm.malloc(len as u64, &self.phdrs)?;
            let phdr = &mut self.phdrs[pd];
            phdr.p_offset = region.offset;
            phdr.p_vaddr = region.vaddr;
            phdr.p_paddr = region.vaddr;
            phdr.p_filesz = len as u64;
            phdr.p_memsz = len as u64;
            self.phdr_touched[pd] = true;
            if let Some(si) = self
                .shdrs
                .iter()
                .position(|shdr| shdr.sh_type == SHT_DYNAMIC)
            {
                let shdr = &mut self.shdrs[si];
                shdr.sh_offset = region.offset;
                shdr.sh_addr = region.vaddr;
                shdr.sh_size = len as u64;
                self.shdr_touched[si] = true;
            }
            self.inline.insert(region.offset, buf);
            debug!(
                "PT_DYNAMIC relocated to offset 0x{:x} with {} entries",
                region.offset,
                self.dyns.len()
            );
        } else {
            self.patches.insert(self.phdrs[pd].p_offset, buf);
        }
        Ok(())
    }
}

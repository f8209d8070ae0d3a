//! The interpreter editor: replaces `PT_INTERP` contents in place when the
//! new path fits, or through a memory-manager allocation when it does not,
//! keeping the program header and the `.interp` section header in step.

use log::{debug, warn};

use crate::elf::program_header::PT_INTERP;
use crate::error::{Error, Result};
use crate::patch::Saver;

impl Saver<'_> {
    pub(crate) fn patch_interpreter(&mut self, new: &str) -> Result<()> {
        let Some(pi) = self
            .phdrs
            .iter()
            .position(|phdr| phdr.p_type == PT_INTERP)
        else {
            warn!("Entry PT_INTERP not found, not a dynamic executable?");
            return Ok(());
        };
        let phdr = self.phdrs[pi];
        let start = phdr.p_offset as usize;
        let old = self
            .elf
            .data()
            .get(start..start + phdr.p_filesz as usize)
            .ok_or_else(|| {
                Error::Malformed(format!("PT_INTERP at 0x{:x} is out of bounds", phdr.p_offset))
            })?;
        let mut bytes = Vec::with_capacity(new.len() + 1);
        bytes.extend_from_slice(new.as_bytes());
        bytes.push(0);
        if bytes == old {
            return Ok(());
        }
        self.changed = true;
        let size = bytes.len() as u64;
        let section = self.elf.section_by_name(".interp");
        if bytes.len() <= old.len() {
            // fits where the old path lived; blank the residue
            bytes.resize(old.len(), 0);
            self.patches.insert(phdr.p_offset, bytes);
            self.phdrs[pi].p_filesz = size;
            self.phdrs[pi].p_memsz = size;
            self.phdr_touched[pi] = true;
            if let Some(si) = section {
                self.shdrs[si].sh_size = size;
                self.shdr_touched[si] = true;
            }
            debug!("PT_INTERP rewritten in place at offset 0x{:x}", phdr.p_offset);
        } else {
            let region = self.mm.malloc(size, &self.phdrs)?;
            self.inline.insert(region.offset, bytes);
            let phdr = &mut self.phdrs[pi];
            phdr.p_offset = region.offset;
            phdr.p_vaddr = region.vaddr;
            phdr.p_paddr = region.vaddr;
            phdr.p_filesz = size;
            phdr.p_memsz = size;
            self.phdr_touched[pi] = true;
            if let Some(si) = section {
                let shdr = &mut self.shdrs[si];
                shdr.sh_offset = region.offset;
                shdr.sh_addr = region.vaddr;
                shdr.sh_size = size;
                self.shdr_touched[si] = true;
            }
            debug!("PT_INTERP relocated to offset 0x{:x}", region.offset);
        }
        Ok(())
    }
}

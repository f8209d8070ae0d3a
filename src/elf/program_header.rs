//! Program headers describe the segments the kernel and the dynamic loader
//! map or consult at execution time.

use core::ops::Range;

use scroll::ctx::{self, TryFromCtx, TryIntoCtx};
use scroll::{Pread, Pwrite};

use crate::container::Ctx;

/// Program header table entry unused
pub const PT_NULL: u32 = 0;
/// Loadable program segment
pub const PT_LOAD: u32 = 1;
/// Dynamic linking information
pub const PT_DYNAMIC: u32 = 2;
/// Program interpreter
pub const PT_INTERP: u32 = 3;
/// Auxiliary information
pub const PT_NOTE: u32 = 4;
/// Reserved
pub const PT_SHLIB: u32 = 5;
/// Entry for header table itself
pub const PT_PHDR: u32 = 6;
/// Thread-local storage segment
pub const PT_TLS: u32 = 7;
/// GCC .eh_frame_hdr segment
pub const PT_GNU_EH_FRAME: u32 = 0x6474e550;
/// Indicates stack executability
pub const PT_GNU_STACK: u32 = 0x6474e551;
/// Read-only after relocation
pub const PT_GNU_RELRO: u32 = 0x6474e552;

/// Segment is executable
pub const PF_X: u32 = 1 << 0;
/// Segment is writable
pub const PF_W: u32 = 1 << 1;
/// Segment is readable
pub const PF_R: u32 = 1 << 2;

pub const SIZEOF_PHDR32: usize = 32;
pub const SIZEOF_PHDR64: usize = 56;

pub fn pt_to_str(pt: u32) -> &'static str {
    match pt {
        PT_NULL => "PT_NULL",
        PT_LOAD => "PT_LOAD",
        PT_DYNAMIC => "PT_DYNAMIC",
        PT_INTERP => "PT_INTERP",
        PT_NOTE => "PT_NOTE",
        PT_SHLIB => "PT_SHLIB",
        PT_PHDR => "PT_PHDR",
        PT_TLS => "PT_TLS",
        PT_GNU_EH_FRAME => "PT_GNU_EH_FRAME",
        PT_GNU_STACK => "PT_GNU_STACK",
        PT_GNU_RELRO => "PT_GNU_RELRO",
        _ => "UNKNOWN_PT",
    }
}

/// A unified program header, fields widened to the 64-bit representation
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_paddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

impl ProgramHeader {
    /// The file bytes this segment occupies
    pub fn file_range(&self) -> Range<u64> {
        self.p_offset..self.p_offset.saturating_add(self.p_filesz)
    }

    /// The virtual memory this segment occupies
    pub fn vm_range(&self) -> Range<u64> {
        self.p_vaddr..self.p_vaddr.saturating_add(self.p_memsz)
    }
}

impl ctx::SizeWith<Ctx> for ProgramHeader {
    fn size_with(ctx: &Ctx) -> usize {
        if ctx.is_big() { SIZEOF_PHDR64 } else { SIZEOF_PHDR32 }
    }
}

// The 32-bit entry interleaves p_flags differently, hence the two shapes.
impl<'a> TryFromCtx<'a, Ctx> for ProgramHeader {
    type Error = scroll::Error;
    fn try_from_ctx(src: &'a [u8], Ctx { container, le }: Ctx) -> Result<(Self, usize), Self::Error> {
        let offset = &mut 0;
        let mut phdr = ProgramHeader::default();
        phdr.p_type = src.gread_with::<u32>(offset, le)?;
        if container.is_big() {
            phdr.p_flags = src.gread_with::<u32>(offset, le)?;
            phdr.p_offset = src.gread_with::<u64>(offset, le)?;
            phdr.p_vaddr = src.gread_with::<u64>(offset, le)?;
            phdr.p_paddr = src.gread_with::<u64>(offset, le)?;
            phdr.p_filesz = src.gread_with::<u64>(offset, le)?;
            phdr.p_memsz = src.gread_with::<u64>(offset, le)?;
            phdr.p_align = src.gread_with::<u64>(offset, le)?;
        } else {
            phdr.p_offset = u64::from(src.gread_with::<u32>(offset, le)?);
            phdr.p_vaddr = u64::from(src.gread_with::<u32>(offset, le)?);
            phdr.p_paddr = u64::from(src.gread_with::<u32>(offset, le)?);
            phdr.p_filesz = u64::from(src.gread_with::<u32>(offset, le)?);
            phdr.p_memsz = u64::from(src.gread_with::<u32>(offset, le)?);
            phdr.p_flags = src.gread_with::<u32>(offset, le)?;
            phdr.p_align = u64::from(src.gread_with::<u32>(offset, le)?);
        }
        Ok((phdr, *offset))
    }
}

impl TryIntoCtx<Ctx> for ProgramHeader {
    type Error = scroll::Error;
    fn try_into_ctx(self, dst: &mut [u8], Ctx { container, le }: Ctx) -> Result<usize, Self::Error> {
        let offset = &mut 0;
        dst.gwrite_with::<u32>(self.p_type, offset, le)?;
        if container.is_big() {
            dst.gwrite_with::<u32>(self.p_flags, offset, le)?;
            dst.gwrite_with::<u64>(self.p_offset, offset, le)?;
            dst.gwrite_with::<u64>(self.p_vaddr, offset, le)?;
            dst.gwrite_with::<u64>(self.p_paddr, offset, le)?;
            dst.gwrite_with::<u64>(self.p_filesz, offset, le)?;
            dst.gwrite_with::<u64>(self.p_memsz, offset, le)?;
            dst.gwrite_with::<u64>(self.p_align, offset, le)?;
        } else {
            dst.gwrite_with::<u32>(self.p_offset as u32, offset, le)?;
            dst.gwrite_with::<u32>(self.p_vaddr as u32, offset, le)?;
            dst.gwrite_with::<u32>(self.p_paddr as u32, offset, le)?;
            dst.gwrite_with::<u32>(self.p_filesz as u32, offset, le)?;
            dst.gwrite_with::<u32>(self.p_memsz as u32, offset, le)?;
            dst.gwrite_with::<u32>(self.p_flags, offset, le)?;
            dst.gwrite_with::<u32>(self.p_align as u32, offset, le)?;
        }
        Ok(*offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Container, Ctx};
    use scroll::Endian;

    #[test]
    fn roundtrips_both_classes() {
        let phdr = ProgramHeader {
            p_type: PT_LOAD,
            p_flags: PF_R | PF_X,
            p_offset: 0x1000,
            p_vaddr: 0x401000,
            p_paddr: 0x401000,
            p_filesz: 0x2345,
            p_memsz: 0x2345,
            p_align: 0x1000,
        };
        for (ctx, size) in [
            (Ctx::new(Container::Big, Endian::Little), SIZEOF_PHDR64),
            (Ctx::new(Container::Little, Endian::Little), SIZEOF_PHDR32),
        ] {
            let mut bytes = [0u8; SIZEOF_PHDR64];
            assert_eq!(bytes.pwrite_with(phdr, 0, ctx).unwrap(), size);
            assert_eq!(bytes.pread_with::<ProgramHeader>(0, ctx).unwrap(), phdr);
        }
    }
}

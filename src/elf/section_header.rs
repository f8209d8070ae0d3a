//! Section headers carry the linker's view of the file; the patcher keeps
//! them consistent with the segments it moves so section-aware tools stay
//! usable on the output.

use scroll::ctx::{self, TryFromCtx, TryIntoCtx};
use scroll::{Pread, Pwrite};

use crate::container::Ctx;

/// Section header table entry unused
pub const SHT_NULL: u32 = 0;
/// Program data
pub const SHT_PROGBITS: u32 = 1;
/// Symbol table
pub const SHT_SYMTAB: u32 = 2;
/// String table
pub const SHT_STRTAB: u32 = 3;
/// Relocation entries with addends
pub const SHT_RELA: u32 = 4;
/// Symbol hash table
pub const SHT_HASH: u32 = 5;
/// Dynamic linking information
pub const SHT_DYNAMIC: u32 = 6;
/// Notes
pub const SHT_NOTE: u32 = 7;
/// Program space with no data (bss)
pub const SHT_NOBITS: u32 = 8;
/// Relocation entries, no addends
pub const SHT_REL: u32 = 9;
/// Dynamic linker symbol table
pub const SHT_DYNSYM: u32 = 11;

pub const SIZEOF_SHDR32: usize = 40;
pub const SIZEOF_SHDR64: usize = 64;

/// A unified section header, fields widened to the 64-bit representation
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SectionHeader {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u64,
    pub sh_entsize: u64,
}

impl ctx::SizeWith<Ctx> for SectionHeader {
    fn size_with(ctx: &Ctx) -> usize {
        if ctx.is_big() { SIZEOF_SHDR64 } else { SIZEOF_SHDR32 }
    }
}

impl<'a> TryFromCtx<'a, Ctx> for SectionHeader {
    type Error = scroll::Error;
    fn try_from_ctx(src: &'a [u8], Ctx { container, le }: Ctx) -> Result<(Self, usize), Self::Error> {
        let offset = &mut 0;
        let mut shdr = SectionHeader::default();
        shdr.sh_name = src.gread_with::<u32>(offset, le)?;
        shdr.sh_type = src.gread_with::<u32>(offset, le)?;
        if container.is_big() {
            shdr.sh_flags = src.gread_with::<u64>(offset, le)?;
            shdr.sh_addr = src.gread_with::<u64>(offset, le)?;
            shdr.sh_offset = src.gread_with::<u64>(offset, le)?;
            shdr.sh_size = src.gread_with::<u64>(offset, le)?;
            shdr.sh_link = src.gread_with::<u32>(offset, le)?;
            shdr.sh_info = src.gread_with::<u32>(offset, le)?;
            shdr.sh_addralign = src.gread_with::<u64>(offset, le)?;
            shdr.sh_entsize = src.gread_with::<u64>(offset, le)?;
        } else {
            shdr.sh_flags = u64::from(src.gread_with::<u32>(offset, le)?);
            shdr.sh_addr = u64::from(src.gread_with::<u32>(offset, le)?);
            shdr.sh_offset = u64::from(src.gread_with::<u32>(offset, le)?);
            shdr.sh_size = u64::from(src.gread_with::<u32>(offset, le)?);
            shdr.sh_link = src.gread_with::<u32>(offset, le)?;
            shdr.sh_info = src.gread_with::<u32>(offset, le)?;
            shdr.sh_addralign = u64::from(src.gread_with::<u32>(offset, le)?);
            shdr.sh_entsize = u64::from(src.gread_with::<u32>(offset, le)?);
        }
        Ok((shdr, *offset))
    }
}

impl TryIntoCtx<Ctx> for SectionHeader {
    type Error = scroll::Error;
    fn try_into_ctx(self, dst: &mut [u8], Ctx { container, le }: Ctx) -> Result<usize, Self::Error> {
        let offset = &mut 0;
        dst.gwrite_with::<u32>(self.sh_name, offset, le)?;
        dst.gwrite_with::<u32>(self.sh_type, offset, le)?;
        if container.is_big() {
            dst.gwrite_with::<u64>(self.sh_flags, offset, le)?;
            dst.gwrite_with::<u64>(self.sh_addr, offset, le)?;
            dst.gwrite_with::<u64>(self.sh_offset, offset, le)?;
            dst.gwrite_with::<u64>(self.sh_size, offset, le)?;
            dst.gwrite_with::<u32>(self.sh_link, offset, le)?;
            dst.gwrite_with::<u32>(self.sh_info, offset, le)?;
            dst.gwrite_with::<u64>(self.sh_addralign, offset, le)?;
            dst.gwrite_with::<u64>(self.sh_entsize, offset, le)?;
        } else {
            dst.gwrite_with::<u32>(self.sh_flags as u32, offset, le)?;
            dst.gwrite_with::<u32>(self.sh_addr as u32, offset, le)?;
            dst.gwrite_with::<u32>(self.sh_offset as u32, offset, le)?;
            dst.gwrite_with::<u32>(self.sh_size as u32, offset, le)?;
            dst.gwrite_with::<u32>(self.sh_link, offset, le)?;
            dst.gwrite_with::<u32>(self.sh_info, offset, le)?;
            dst.gwrite_with::<u32>(self.sh_addralign as u32, offset, le)?;
            dst.gwrite_with::<u32>(self.sh_entsize as u32, offset, le)?;
        }
        Ok(*offset)
    }
}

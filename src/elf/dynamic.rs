//! The dynamic array and its tags.

use core::fmt;

use scroll::ctx::{self, TryFromCtx, TryIntoCtx};
use scroll::{Pread, Pwrite};

use crate::container::Ctx;
use crate::elf::program_header::ProgramHeader;
use crate::error;

// d_tag is pointer sized on the wire; u64 holds both classes so call sites
// can pattern match without casts.
pub const DT_NULL: u64 = 0;
pub const DT_NEEDED: u64 = 1;
pub const DT_PLTRELSZ: u64 = 2;
pub const DT_PLTGOT: u64 = 3;
pub const DT_HASH: u64 = 4;
pub const DT_STRTAB: u64 = 5;
pub const DT_SYMTAB: u64 = 6;
pub const DT_RELA: u64 = 7;
pub const DT_RELASZ: u64 = 8;
pub const DT_RELAENT: u64 = 9;
pub const DT_STRSZ: u64 = 10;
pub const DT_SYMENT: u64 = 11;
pub const DT_INIT: u64 = 12;
pub const DT_FINI: u64 = 13;
pub const DT_SONAME: u64 = 14;
pub const DT_RPATH: u64 = 15;
pub const DT_SYMBOLIC: u64 = 16;
pub const DT_REL: u64 = 17;
pub const DT_RELSZ: u64 = 18;
pub const DT_RELENT: u64 = 19;
pub const DT_PLTREL: u64 = 20;
pub const DT_DEBUG: u64 = 21;
pub const DT_TEXTREL: u64 = 22;
pub const DT_JMPREL: u64 = 23;
pub const DT_BIND_NOW: u64 = 24;
pub const DT_INIT_ARRAY: u64 = 25;
pub const DT_FINI_ARRAY: u64 = 26;
pub const DT_INIT_ARRAYSZ: u64 = 27;
pub const DT_FINI_ARRAYSZ: u64 = 28;
pub const DT_RUNPATH: u64 = 29;
pub const DT_FLAGS: u64 = 30;
pub const DT_GNU_HASH: u64 = 0x6ffffef5;
pub const DT_VERSYM: u64 = 0x6ffffff0;
pub const DT_RELACOUNT: u64 = 0x6ffffff9;
pub const DT_FLAGS_1: u64 = 0x6ffffffb;
pub const DT_VERDEF: u64 = 0x6ffffffc;
pub const DT_VERDEFNUM: u64 = 0x6ffffffd;
pub const DT_VERNEED: u64 = 0x6ffffffe;
pub const DT_VERNEEDNUM: u64 = 0x6fffffff;

pub const SIZEOF_DYN32: usize = 8;
pub const SIZEOF_DYN64: usize = 16;

/// Converts a tag to its string representation
#[inline]
pub fn tag_to_str(tag: u64) -> &'static str {
    match tag {
        DT_NULL => "DT_NULL",
        DT_NEEDED => "DT_NEEDED",
        DT_PLTRELSZ => "DT_PLTRELSZ",
        DT_PLTGOT => "DT_PLTGOT",
        DT_HASH => "DT_HASH",
        DT_STRTAB => "DT_STRTAB",
        DT_SYMTAB => "DT_SYMTAB",
        DT_RELA => "DT_RELA",
        DT_RELASZ => "DT_RELASZ",
        DT_RELAENT => "DT_RELAENT",
        DT_STRSZ => "DT_STRSZ",
        DT_SYMENT => "DT_SYMENT",
        DT_INIT => "DT_INIT",
        DT_FINI => "DT_FINI",
        DT_SONAME => "DT_SONAME",
        DT_RPATH => "DT_RPATH",
        DT_SYMBOLIC => "DT_SYMBOLIC",
        DT_REL => "DT_REL",
        DT_RELSZ => "DT_RELSZ",
        DT_RELENT => "DT_RELENT",
        DT_PLTREL => "DT_PLTREL",
        DT_DEBUG => "DT_DEBUG",
        DT_TEXTREL => "DT_TEXTREL",
        DT_JMPREL => "DT_JMPREL",
        DT_BIND_NOW => "DT_BIND_NOW",
        DT_INIT_ARRAY => "DT_INIT_ARRAY",
        DT_FINI_ARRAY => "DT_FINI_ARRAY",
        DT_INIT_ARRAYSZ => "DT_INIT_ARRAYSZ",
        DT_FINI_ARRAYSZ => "DT_FINI_ARRAYSZ",
        DT_RUNPATH => "DT_RUNPATH",
        DT_FLAGS => "DT_FLAGS",
        DT_GNU_HASH => "DT_GNU_HASH",
        DT_VERSYM => "DT_VERSYM",
        DT_RELACOUNT => "DT_RELACOUNT",
        DT_FLAGS_1 => "DT_FLAGS_1",
        DT_VERDEF => "DT_VERDEF",
        DT_VERDEFNUM => "DT_VERDEFNUM",
        DT_VERNEED => "DT_VERNEED",
        DT_VERNEEDNUM => "DT_VERNEEDNUM",
        _ => "UNKNOWN_TAG",
    }
}

/// An entry in the dynamic array
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Default)]
pub struct Dyn {
    pub d_tag: u64,
    pub d_val: u64,
}

impl fmt::Debug for Dyn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "d_tag: {} d_val: 0x{:x}", tag_to_str(self.d_tag), self.d_val)
    }
}

impl ctx::SizeWith<Ctx> for Dyn {
    fn size_with(ctx: &Ctx) -> usize {
        if ctx.is_big() { SIZEOF_DYN64 } else { SIZEOF_DYN32 }
    }
}

impl<'a> TryFromCtx<'a, Ctx> for Dyn {
    type Error = scroll::Error;
    fn try_from_ctx(src: &'a [u8], Ctx { container, le }: Ctx) -> Result<(Self, usize), Self::Error> {
        let offset = &mut 0;
        let dyn_ = if container.is_big() {
            Dyn {
                d_tag: src.gread_with::<u64>(offset, le)?,
                d_val: src.gread_with::<u64>(offset, le)?,
            }
        } else {
            Dyn {
                d_tag: u64::from(src.gread_with::<u32>(offset, le)?),
                d_val: u64::from(src.gread_with::<u32>(offset, le)?),
            }
        };
        Ok((dyn_, *offset))
    }
}

impl TryIntoCtx<Ctx> for Dyn {
    type Error = scroll::Error;
    fn try_into_ctx(self, dst: &mut [u8], Ctx { container, le }: Ctx) -> Result<usize, Self::Error> {
        let offset = &mut 0;
        if container.is_big() {
            dst.gwrite_with::<u64>(self.d_tag, offset, le)?;
            dst.gwrite_with::<u64>(self.d_val, offset, le)?;
        } else {
            dst.gwrite_with::<u32>(self.d_tag as u32, offset, le)?;
            dst.gwrite_with::<u32>(self.d_val as u32, offset, le)?;
        }
        Ok(*offset)
    }
}

/// Parses the dynamic array out of a `PT_DYNAMIC` segment, up to and
/// including the terminating `DT_NULL`
pub fn parse(data: &[u8], phdr: &ProgramHeader, ctx: Ctx) -> error::Result<Vec<Dyn>> {
    use scroll::ctx::SizeWith;
    let sizeof_dyn = Dyn::size_with(&ctx);
    let count = phdr.p_filesz as usize / sizeof_dyn;
    let offset = &mut (phdr.p_offset as usize);
    let mut dyns = Vec::with_capacity(count);
    for _ in 0..count {
        let dyn_ = data.gread_with::<Dyn>(offset, ctx)?;
        let tag = dyn_.d_tag;
        dyns.push(dyn_);
        if tag == DT_NULL {
            break;
        }
    }
    Ok(dyns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Container, Ctx};
    use scroll::Endian;

    #[test]
    fn parse_stops_after_null() {
        let ctx = Ctx::new(Container::Big, Endian::Little);
        let mut data = vec![0u8; 5 * SIZEOF_DYN64];
        let dyns = [
            Dyn { d_tag: DT_NEEDED, d_val: 1 },
            Dyn { d_tag: DT_STRTAB, d_val: 0x400540 },
            Dyn { d_tag: DT_NULL, d_val: 0 },
            // garbage past DT_NULL must not be returned
            Dyn { d_tag: DT_NEEDED, d_val: 0xdead },
        ];
        let offset = &mut 0;
        for dyn_ in dyns {
            data.gwrite_with(dyn_, offset, ctx).unwrap();
        }
        let phdr = ProgramHeader {
            p_type: crate::elf::program_header::PT_DYNAMIC,
            p_filesz: data.len() as u64,
            p_memsz: data.len() as u64,
            ..Default::default()
        };
        let parsed = parse(&data, &phdr, ctx).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[2].d_tag, DT_NULL);
    }
}

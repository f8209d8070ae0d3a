//! The ELF header, and the identification constants needed to bootstrap
//! parsing before the container width and endianness are known.

use scroll::ctx::{self, TryFromCtx, TryIntoCtx};
use scroll::{Endian, Pread, Pwrite};

use crate::container::{Container, Ctx};
use crate::error::{self, Error};

pub const SIZEOF_IDENT: usize = 16;
pub const SIZEOF_EHDR32: usize = 52;
pub const SIZEOF_EHDR64: usize = 64;

/// The ELF magic
pub const ELFMAG: &[u8; 4] = b"\x7fELF";
pub const SELFMAG: usize = 4;

/// File class byte index
pub const EI_CLASS: usize = 4;
/// Invalid class
pub const ELFCLASSNONE: u8 = 0;
/// 32-bit objects
pub const ELFCLASS32: u8 = 1;
/// 64-bit objects
pub const ELFCLASS64: u8 = 2;

/// Data encoding byte index
pub const EI_DATA: usize = 5;
/// Invalid data encoding
pub const ELFDATANONE: u8 = 0;
/// 2's complement, little endian
pub const ELFDATA2LSB: u8 = 1;
/// 2's complement, big endian
pub const ELFDATA2MSB: u8 = 2;

/// No file type
pub const ET_NONE: u16 = 0;
/// Relocatable file
pub const ET_REL: u16 = 1;
/// Executable file
pub const ET_EXEC: u16 = 2;
/// Shared object file
pub const ET_DYN: u16 = 3;
/// Core file
pub const ET_CORE: u16 = 4;

#[inline]
pub fn et_to_str(et: u16) -> &'static str {
    match et {
        ET_NONE => "NONE",
        ET_REL => "REL",
        ET_EXEC => "EXEC",
        ET_DYN => "DYN",
        ET_CORE => "CORE",
        _ => "UNKNOWN_ET",
    }
}

/// A unified ELF header, fields widened to the 64-bit representation
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Header {
    pub e_ident: [u8; SIZEOF_IDENT],
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u64,
    pub e_phoff: u64,
    pub e_shoff: u64,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

impl Header {
    /// Derives the parsing context from `e_ident`, verifying the magic,
    /// class, and data encoding, then reads the full header with it
    pub fn parse(bytes: &[u8]) -> error::Result<(Header, Ctx)> {
        if bytes.len() < SIZEOF_IDENT {
            return Err(Error::Malformed(format!(
                "ELF identification truncated: {} bytes",
                bytes.len()
            )));
        }
        if &bytes[..SELFMAG] != ELFMAG {
            let magic: u64 = bytes.pread_with(0, scroll::LE)?;
            return Err(Error::BadMagic(magic));
        }
        let container = match bytes[EI_CLASS] {
            ELFCLASS32 => Container::Little,
            ELFCLASS64 => Container::Big,
            class => {
                return Err(Error::Malformed(format!("Invalid ELF class 0x{:x}", class)));
            }
        };
        let le = match bytes[EI_DATA] {
            ELFDATA2LSB => Endian::Little,
            ELFDATA2MSB => Endian::Big,
            encoding => {
                return Err(Error::Malformed(format!(
                    "Invalid ELF data encoding 0x{:x}",
                    encoding
                )));
            }
        };
        let ctx = Ctx::new(container, le);
        let header = bytes.pread_with::<Header>(0, ctx)?;
        Ok((header, ctx))
    }
}

impl ctx::SizeWith<Ctx> for Header {
    fn size_with(ctx: &Ctx) -> usize {
        if ctx.is_big() { SIZEOF_EHDR64 } else { SIZEOF_EHDR32 }
    }
}

impl<'a> TryFromCtx<'a, Ctx> for Header {
    type Error = scroll::Error;
    fn try_from_ctx(src: &'a [u8], Ctx { container, le }: Ctx) -> Result<(Self, usize), Self::Error> {
        let offset = &mut 0;
        let mut e_ident = [0u8; SIZEOF_IDENT];
        src.gread_inout(offset, &mut e_ident)?;
        let e_type = src.gread_with::<u16>(offset, le)?;
        let e_machine = src.gread_with::<u16>(offset, le)?;
        let e_version = src.gread_with::<u32>(offset, le)?;
        let (e_entry, e_phoff, e_shoff) = if container.is_big() {
            (
                src.gread_with::<u64>(offset, le)?,
                src.gread_with::<u64>(offset, le)?,
                src.gread_with::<u64>(offset, le)?,
            )
        } else {
            (
                u64::from(src.gread_with::<u32>(offset, le)?),
                u64::from(src.gread_with::<u32>(offset, le)?),
                u64::from(src.gread_with::<u32>(offset, le)?),
            )
        };
        let e_flags = src.gread_with::<u32>(offset, le)?;
        let e_ehsize = src.gread_with::<u16>(offset, le)?;
        let e_phentsize = src.gread_with::<u16>(offset, le)?;
        let e_phnum = src.gread_with::<u16>(offset, le)?;
        let e_shentsize = src.gread_with::<u16>(offset, le)?;
        let e_shnum = src.gread_with::<u16>(offset, le)?;
        let e_shstrndx = src.gread_with::<u16>(offset, le)?;
        Ok((
            Header {
                e_ident,
                e_type,
                e_machine,
                e_version,
                e_entry,
                e_phoff,
                e_shoff,
                e_flags,
                e_ehsize,
                e_phentsize,
                e_phnum,
                e_shentsize,
                e_shnum,
                e_shstrndx,
            },
            *offset,
        ))
    }
}

impl TryIntoCtx<Ctx> for Header {
    type Error = scroll::Error;
    fn try_into_ctx(self, dst: &mut [u8], Ctx { container, le }: Ctx) -> Result<usize, Self::Error> {
        let offset = &mut 0;
        for byte in &self.e_ident {
            dst.gwrite_with::<u8>(*byte, offset, le)?;
        }
        dst.gwrite_with::<u16>(self.e_type, offset, le)?;
        dst.gwrite_with::<u16>(self.e_machine, offset, le)?;
        dst.gwrite_with::<u32>(self.e_version, offset, le)?;
        if container.is_big() {
            dst.gwrite_with::<u64>(self.e_entry, offset, le)?;
            dst.gwrite_with::<u64>(self.e_phoff, offset, le)?;
            dst.gwrite_with::<u64>(self.e_shoff, offset, le)?;
        } else {
            dst.gwrite_with::<u32>(self.e_entry as u32, offset, le)?;
            dst.gwrite_with::<u32>(self.e_phoff as u32, offset, le)?;
            dst.gwrite_with::<u32>(self.e_shoff as u32, offset, le)?;
        }
        dst.gwrite_with::<u32>(self.e_flags, offset, le)?;
        dst.gwrite_with::<u16>(self.e_ehsize, offset, le)?;
        dst.gwrite_with::<u16>(self.e_phentsize, offset, le)?;
        dst.gwrite_with::<u16>(self.e_phnum, offset, le)?;
        dst.gwrite_with::<u16>(self.e_shentsize, offset, le)?;
        dst.gwrite_with::<u16>(self.e_shnum, offset, le)?;
        dst.gwrite_with::<u16>(self.e_shstrndx, offset, le)?;
        Ok(*offset)
    }
}

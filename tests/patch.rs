//! End-to-end patching scenarios over synthesized ELF images.
//!
//! The fixtures are built in memory with the crate's own serializers rather
//! than compiled on the host, so the suite needs no toolchain and no system
//! patchelf to run.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use scroll::{Endian, Pwrite};

use elfpatch::Patcher;
use elfpatch::container::{Container, Ctx};
use elfpatch::elf::dynamic::{
    DT_NEEDED, DT_NULL, DT_RPATH, DT_RUNPATH, DT_SONAME, DT_STRSZ, DT_STRTAB,
};
use elfpatch::elf::header::{
    ELFCLASS32, ELFCLASS64, ELFDATA2LSB, ELFMAG, ET_DYN, ET_EXEC, SELFMAG, SIZEOF_EHDR32,
    SIZEOF_EHDR64,
};
use elfpatch::elf::program_header::{
    PF_R, PF_W, PF_X, PT_DYNAMIC, PT_INTERP, PT_LOAD, SIZEOF_PHDR32, SIZEOF_PHDR64,
};
use elfpatch::elf::section_header::{SHT_DYNAMIC, SHT_PROGBITS, SHT_STRTAB};
use elfpatch::elf::{Dyn, Elf, Header, ProgramHeader, SectionHeader};

const PAGE: u64 = 0x1000;
const INTERP: &str = "/lib64/ld-linux-x86-64.so.2";

fn temp_path(name: &str) -> PathBuf {
    env::temp_dir().join(format!("elfpatch_{}_{}", process::id(), name))
}

fn push_str(table: &mut Vec<u8>, s: &str) -> u64 {
    let index = table.len() as u64;
    table.extend_from_slice(s.as_bytes());
    table.push(0);
    index
}

/// Knobs for the synthesized ELF64 executable
#[derive(Default)]
struct Image {
    /// Install a DT_SONAME of "libtest.so.1"
    soname: bool,
    /// Install this search path under the given tag
    runpath: Option<(u64, &'static str)>,
    /// Leave one PT_NULL program header slot spare
    spare_slot: bool,
    /// Give the RW load a zero-fill tail (memsz > filesz)
    bss_tail: bool,
}

/// Builds a minimal dynamic ELF64LE executable:
/// two loads (R-X then RW), PT_INTERP, PT_DYNAMIC, `.interp`/`.dynamic`/
/// `.dynstr`/`.shstrtab` sections, and the section headers trailing the
/// mapped image.
fn build_exe64(image: &Image) -> Vec<u8> {
    let ctx = Ctx::new(Container::Big, Endian::Little);

    let mut dynstr = vec![0u8];
    let selinux = push_str(&mut dynstr, "libselinux.so.1");
    let libc = push_str(&mut dynstr, "libc.so.6");
    let mut dyns = vec![
        Dyn { d_tag: DT_NEEDED, d_val: selinux },
        Dyn { d_tag: DT_NEEDED, d_val: libc },
    ];
    if image.soname {
        let soname = push_str(&mut dynstr, "libtest.so.1");
        dyns.push(Dyn { d_tag: DT_SONAME, d_val: soname });
    }
    if let Some((tag, path)) = image.runpath {
        let path = push_str(&mut dynstr, path);
        dyns.push(Dyn { d_tag: tag, d_val: path });
    }
    dyns.push(Dyn { d_tag: DT_STRTAB, d_val: 0x401540 });
    dyns.push(Dyn { d_tag: DT_STRSZ, d_val: dynstr.len() as u64 });
    dyns.push(Dyn { d_tag: DT_NULL, d_val: 0 });
    let dyn_size = (dyns.len() * 16) as u64;
    assert!(0x480 + dyn_size <= 0x540 && 0x540 + dynstr.len() as u64 <= 0x600);

    let interp_size = INTERP.len() as u64 + 1;
    let mut phdrs = vec![
        ProgramHeader {
            p_type: PT_INTERP,
            p_flags: PF_R,
            p_offset: 0x200,
            p_vaddr: 0x400200,
            p_paddr: 0x400200,
            p_filesz: interp_size,
            p_memsz: interp_size,
            p_align: 1,
        },
        ProgramHeader {
            p_type: PT_LOAD,
            p_flags: PF_R | PF_X,
            p_offset: 0,
            p_vaddr: 0x400000,
            p_paddr: 0x400000,
            p_filesz: 0x400,
            p_memsz: 0x400,
            p_align: PAGE,
        },
        ProgramHeader {
            p_type: PT_LOAD,
            p_flags: PF_R | PF_W,
            p_offset: 0x400,
            p_vaddr: 0x401400,
            p_paddr: 0x401400,
            p_filesz: 0x200,
            p_memsz: if image.bss_tail { 0x280 } else { 0x200 },
            p_align: PAGE,
        },
        ProgramHeader {
            p_type: PT_DYNAMIC,
            p_flags: PF_R | PF_W,
            p_offset: 0x480,
            p_vaddr: 0x401480,
            p_paddr: 0x401480,
            p_filesz: dyn_size,
            p_memsz: dyn_size,
            p_align: 8,
        },
    ];
    if image.spare_slot {
        phdrs.push(ProgramHeader::default());
    }

    let mut shstrtab = vec![0u8];
    let n_interp = push_str(&mut shstrtab, ".interp") as u32;
    let n_dynamic = push_str(&mut shstrtab, ".dynamic") as u32;
    let n_dynstr = push_str(&mut shstrtab, ".dynstr") as u32;
    let n_shstrtab = push_str(&mut shstrtab, ".shstrtab") as u32;
    let shdrs = vec![
        SectionHeader::default(),
        SectionHeader {
            sh_name: n_interp,
            sh_type: SHT_PROGBITS,
            sh_flags: 0x2,
            sh_addr: 0x400200,
            sh_offset: 0x200,
            sh_size: interp_size,
            sh_addralign: 1,
            ..Default::default()
        },
        SectionHeader {
            sh_name: n_dynamic,
            sh_type: SHT_DYNAMIC,
            sh_flags: 0x3,
            sh_addr: 0x401480,
            sh_offset: 0x480,
            sh_size: dyn_size,
            sh_link: 3,
            sh_addralign: 8,
            sh_entsize: 16,
            ..Default::default()
        },
        SectionHeader {
            sh_name: n_dynstr,
            sh_type: SHT_STRTAB,
            sh_flags: 0x2,
            sh_addr: 0x401540,
            sh_offset: 0x540,
            sh_size: dynstr.len() as u64,
            sh_addralign: 1,
            ..Default::default()
        },
        SectionHeader {
            sh_name: n_shstrtab,
            sh_type: SHT_STRTAB,
            sh_offset: 0x600,
            sh_size: shstrtab.len() as u64,
            sh_addralign: 1,
            ..Default::default()
        },
    ];

    let mut header = Header {
        e_type: ET_EXEC,
        e_machine: 0x3e,
        e_version: 1,
        e_entry: 0x400000,
        e_phoff: 0x40,
        e_shoff: 0x640,
        e_ehsize: SIZEOF_EHDR64 as u16,
        e_phentsize: SIZEOF_PHDR64 as u16,
        e_phnum: phdrs.len() as u16,
        e_shentsize: 64,
        e_shnum: shdrs.len() as u16,
        e_shstrndx: 4,
        ..Default::default()
    };
    header.e_ident[..SELFMAG].copy_from_slice(ELFMAG);
    header.e_ident[4] = ELFCLASS64;
    header.e_ident[5] = ELFDATA2LSB;
    header.e_ident[6] = 1;

    let mut data = vec![0u8; 0x640 + shdrs.len() * 64];
    data.pwrite_with(header, 0, ctx).unwrap();
    let offset = &mut 0x40;
    for phdr in phdrs {
        data.gwrite_with(phdr, offset, ctx).unwrap();
    }
    data[0x200..0x200 + INTERP.len()].copy_from_slice(INTERP.as_bytes());
    let offset = &mut 0x480;
    for dyn_ in dyns {
        data.gwrite_with(dyn_, offset, ctx).unwrap();
    }
    data[0x540..0x540 + dynstr.len()].copy_from_slice(&dynstr);
    data[0x600..0x600 + shstrtab.len()].copy_from_slice(&shstrtab);
    let offset = &mut 0x640;
    for shdr in shdrs {
        data.gwrite_with(shdr, offset, ctx).unwrap();
    }
    data
}

/// Builds a minimal ELF32LE shared library with no section headers at all,
/// exercising the stripped-image paths
fn build_lib32() -> Vec<u8> {
    let ctx = Ctx::new(Container::Little, Endian::Little);

    let mut dynstr = vec![0u8];
    let libc = push_str(&mut dynstr, "libc.so.6");
    let soname = push_str(&mut dynstr, "libtest32.so.1");
    let dyns = vec![
        Dyn { d_tag: DT_NEEDED, d_val: libc },
        Dyn { d_tag: DT_SONAME, d_val: soname },
        Dyn { d_tag: DT_STRTAB, d_val: 0x401540 },
        Dyn { d_tag: DT_STRSZ, d_val: dynstr.len() as u64 },
        Dyn { d_tag: DT_NULL, d_val: 0 },
    ];
    let dyn_size = (dyns.len() * 8) as u64;

    let phdrs = vec![
        ProgramHeader {
            p_type: PT_LOAD,
            p_flags: PF_R | PF_X,
            p_offset: 0,
            p_vaddr: 0x400000,
            p_paddr: 0x400000,
            p_filesz: 0x400,
            p_memsz: 0x400,
            p_align: PAGE,
        },
        ProgramHeader {
            p_type: PT_LOAD,
            p_flags: PF_R | PF_W,
            p_offset: 0x400,
            p_vaddr: 0x401400,
            p_paddr: 0x401400,
            p_filesz: 0x200,
            p_memsz: 0x200,
            p_align: PAGE,
        },
        ProgramHeader {
            p_type: PT_DYNAMIC,
            p_flags: PF_R | PF_W,
            p_offset: 0x480,
            p_vaddr: 0x401480,
            p_paddr: 0x401480,
            p_filesz: dyn_size,
            p_memsz: dyn_size,
            p_align: 4,
        },
        ProgramHeader::default(), // spare slot
    ];

    let mut header = Header {
        e_type: ET_DYN,
        e_machine: 0x03,
        e_version: 1,
        e_phoff: 0x34,
        e_ehsize: SIZEOF_EHDR32 as u16,
        e_phentsize: SIZEOF_PHDR32 as u16,
        e_phnum: phdrs.len() as u16,
        ..Default::default()
    };
    header.e_ident[..SELFMAG].copy_from_slice(ELFMAG);
    header.e_ident[4] = ELFCLASS32;
    header.e_ident[5] = ELFDATA2LSB;
    header.e_ident[6] = 1;

    let mut data = vec![0u8; 0x600];
    data.pwrite_with(header, 0, ctx).unwrap();
    let offset = &mut 0x34;
    for phdr in phdrs {
        data.gwrite_with(phdr, offset, ctx).unwrap();
    }
    let offset = &mut 0x480;
    for dyn_ in dyns {
        data.gwrite_with(dyn_, offset, ctx).unwrap();
    }
    data[0x540..0x540 + dynstr.len()].copy_from_slice(&dynstr);
    data
}

fn write_fixture(name: &str, data: &[u8]) -> PathBuf {
    let path = temp_path(name);
    fs::write(&path, data).unwrap();
    path
}

fn load_count(elf: &Elf) -> usize {
    elf.program_headers
        .iter()
        .filter(|phdr| phdr.p_type == PT_LOAD)
        .count()
}

fn assert_loads_congruent(elf: &Elf) {
    for phdr in &elf.program_headers {
        if phdr.p_type == PT_LOAD {
            assert_eq!(
                (phdr.p_vaddr.wrapping_sub(phdr.p_offset)) % PAGE,
                0,
                "PT_LOAD at offset 0x{:x} breaks the loader's congruence rule",
                phdr.p_offset
            );
        }
    }
}

#[test]
fn reads_installed_fields() {
    let data = build_exe64(&Image {
        runpath: Some((DT_RUNPATH, "/opt/lib")),
        spare_slot: true,
        ..Default::default()
    });
    let input = write_fixture("reads", &data);

    let patcher = Patcher::open(&input).unwrap();
    assert_eq!(patcher.interpreter().unwrap().as_deref(), Some(INTERP));
    assert_eq!(patcher.needed().unwrap(), ["libselinux.so.1", "libc.so.6"]);
    assert_eq!(patcher.runpath().unwrap().as_deref(), Some("/opt/lib"));
    assert_eq!(patcher.soname().unwrap(), None, "an executable has no soname");

    fs::remove_file(&input).unwrap();
}

#[test]
fn set_interpreter_in_place_when_shorter() {
    let data = build_exe64(&Image { spare_slot: true, ..Default::default() });
    let input = write_fixture("interp_short_in", &data);
    let output = temp_path("interp_short_out");

    let mut patcher = Patcher::open(&input).unwrap();
    patcher.set_interpreter("/lib/AAAA.so").unwrap();
    patcher.save_to(&output).unwrap();

    let patched = fs::read(&output).unwrap();
    assert_eq!(patched.len(), data.len(), "a shorter path fits without extension");
    let elf = Elf::parse(&patched).unwrap();
    assert_eq!(elf.interpreter(), Some("/lib/AAAA.so"));
    assert_eq!(load_count(&elf), 2, "no PT_LOAD added for an in-place edit");
    let interp = elf
        .program_headers
        .iter()
        .find(|phdr| phdr.p_type == PT_INTERP)
        .unwrap();
    assert_eq!(interp.p_offset, 0x200);
    assert_eq!(interp.p_filesz, "/lib/AAAA.so".len() as u64 + 1);
    let start = interp.p_offset as usize;
    assert_eq!(
        &patched[start..start + interp.p_filesz as usize],
        b"/lib/AAAA.so\0"
    );
    // the residue of the longer original path is blanked
    assert!(patched[start + interp.p_filesz as usize..start + INTERP.len() + 1]
        .iter()
        .all(|&b| b == 0));
    assert_eq!(elf.needed(), ["libselinux.so.1", "libc.so.6"]);

    fs::remove_file(&input).unwrap();
    fs::remove_file(&output).unwrap();
}

#[test]
fn set_interpreter_longer_claims_spare_slot() {
    let long = "/very/long/path/to/ld-linux-x86-64.so.2";
    assert!(long.len() + 1 > INTERP.len() + 1);
    let data = build_exe64(&Image { spare_slot: true, ..Default::default() });
    let input = write_fixture("interp_long_in", &data);
    let output = temp_path("interp_long_out");

    let mut patcher = Patcher::open(&input).unwrap();
    patcher.set_interpreter(long).unwrap();
    patcher.save_to(&output).unwrap();

    let patched = fs::read(&output).unwrap();
    assert_eq!(patched.len(), data.len() + PAGE as usize);
    let elf = Elf::parse(&patched).unwrap();
    assert_eq!(elf.interpreter(), Some(long));
    assert_eq!(load_count(&elf), 3, "the spare slot became the new PT_LOAD");
    assert_loads_congruent(&elf);
    let interp = elf
        .program_headers
        .iter()
        .find(|phdr| phdr.p_type == PT_INTERP)
        .unwrap();
    let cover = elf
        .program_headers
        .iter()
        .find(|phdr| {
            phdr.p_type == PT_LOAD
                && interp.p_offset >= phdr.p_offset
                && interp.p_offset + interp.p_filesz <= phdr.p_offset + phdr.p_filesz
        })
        .expect("the relocated interpreter must be covered by a PT_LOAD");
    assert_eq!(cover.p_flags, PF_R | PF_W);
    // sections survived the shift: names still resolve
    assert!(elf.section_by_name(".interp").is_some());
    assert_eq!(elf.needed(), ["libselinux.so.1", "libc.so.6"]);

    fs::remove_file(&input).unwrap();
    fs::remove_file(&output).unwrap();
}

#[test]
fn set_soname_grows_the_strtab() {
    let data = build_exe64(&Image { soname: true, spare_slot: true, ..Default::default() });
    let input = write_fixture("soname_grow_in", &data);
    let output = temp_path("soname_grow_out");

    let old_strtab = {
        let elf = Elf::parse(&data).unwrap();
        elf.dyn_strtab_bytes().unwrap().to_vec()
    };

    let mut patcher = Patcher::open(&input).unwrap();
    patcher.set_soname("libtest.so.217").unwrap();
    patcher.save_to(&output).unwrap();

    let patched = fs::read(&output).unwrap();
    assert_eq!((patched.len() - data.len()) as u64 % PAGE, 0);
    let elf = Elf::parse(&patched).unwrap();
    assert_eq!(elf.soname(), Some("libtest.so.217"));
    assert_eq!(elf.needed(), ["libselinux.so.1", "libc.so.6"]);
    assert_loads_congruent(&elf);
    let new_strtab = elf.dyn_strtab_bytes().unwrap();
    assert!(
        new_strtab.starts_with(&old_strtab),
        "the strtab is append-only: every old index stays valid"
    );
    assert_eq!(
        elf.dyn_val(DT_STRSZ),
        Some(old_strtab.len() as u64 + "libtest.so.217".len() as u64 + 1)
    );
    // the dynamic array did not grow, only the tag value changed
    let dyn_phdr = elf
        .program_headers
        .iter()
        .find(|phdr| phdr.p_type == PT_DYNAMIC)
        .unwrap();
    assert_eq!(dyn_phdr.p_offset, 0x480);

    fs::remove_file(&input).unwrap();
    fs::remove_file(&output).unwrap();
}

#[test]
fn set_soname_to_existing_string_needs_no_extension() {
    let data = build_exe64(&Image { soname: true, spare_slot: true, ..Default::default() });
    let input = write_fixture("soname_reuse_in", &data);
    let output = temp_path("soname_reuse_out");

    let mut patcher = Patcher::open(&input).unwrap();
    patcher.set_soname("libc.so.6").unwrap();
    patcher.save_to(&output).unwrap();

    let patched = fs::read(&output).unwrap();
    assert_eq!(patched.len(), data.len(), "a resident string costs nothing");
    let elf = Elf::parse(&patched).unwrap();
    assert_eq!(elf.soname(), Some("libc.so.6"));

    fs::remove_file(&input).unwrap();
    fs::remove_file(&output).unwrap();
}

#[test]
fn set_runpath_creates_the_tag() {
    let data = build_exe64(&Image { spare_slot: true, ..Default::default() });
    let input = write_fixture("runpath_new_in", &data);
    let output = temp_path("runpath_new_out");

    let old_dyn_count = Elf::parse(&data).unwrap().dynamic.as_ref().unwrap().len();

    let mut patcher = Patcher::open(&input).unwrap();
    patcher.set_runpath(".").unwrap();
    patcher.save_to(&output).unwrap();

    let patched = fs::read(&output).unwrap();
    let elf = Elf::parse(&patched).unwrap();
    assert_eq!(elf.library_path(DT_RUNPATH), Some("."));
    let dyns = elf.dynamic.as_ref().unwrap();
    assert_eq!(dyns.len(), old_dyn_count + 1);
    assert_eq!(
        dyns[dyns.len() - 2].d_tag,
        DT_RUNPATH,
        "the new tag is spliced right before DT_NULL"
    );
    assert_eq!(dyns[dyns.len() - 1].d_tag, DT_NULL);
    let dyn_phdr = elf
        .program_headers
        .iter()
        .find(|phdr| phdr.p_type == PT_DYNAMIC)
        .unwrap();
    assert_eq!(dyn_phdr.p_filesz, (old_dyn_count as u64 + 1) * 16);
    assert_loads_congruent(&elf);

    fs::remove_file(&input).unwrap();
    fs::remove_file(&output).unwrap();
}

#[test]
fn force_rpath_targets_dt_rpath() {
    let data = build_exe64(&Image { spare_slot: true, ..Default::default() });
    let input = write_fixture("rpath_in", &data);
    let output = temp_path("rpath_out");

    let mut patcher = Patcher::open(&input).unwrap();
    patcher.use_rpath();
    patcher.set_runpath("$ORIGIN").unwrap();
    patcher.save_to(&output).unwrap();

    let patched = fs::read(&output).unwrap();
    let elf = Elf::parse(&patched).unwrap();
    assert_eq!(elf.library_path(DT_RPATH), Some("$ORIGIN"));
    assert_eq!(elf.dyn_position(DT_RUNPATH), None);

    fs::remove_file(&input).unwrap();
    fs::remove_file(&output).unwrap();
}

#[test]
fn grows_trailing_load_when_no_slot_is_spare() {
    let data = build_exe64(&Image::default());
    let input = write_fixture("grow_in", &data);
    let output = temp_path("grow_out");

    let mut patcher = Patcher::open(&input).unwrap();
    patcher.set_runpath(".").unwrap();
    patcher.save_to(&output).unwrap();

    let patched = fs::read(&output).unwrap();
    let elf = Elf::parse(&patched).unwrap();
    assert_eq!(load_count(&elf), 2, "no slot to claim: the RW load grew instead");
    let grown = elf
        .program_headers
        .iter()
        .filter(|phdr| phdr.p_type == PT_LOAD)
        .next_back()
        .unwrap();
    assert_eq!(grown.p_filesz, 0x200 + PAGE);
    assert_eq!(grown.p_memsz, 0x200 + PAGE);
    assert_loads_congruent(&elf);
    assert_eq!(elf.library_path(DT_RUNPATH), Some("."));
    assert!(elf.section_by_name(".shstrtab").is_some());

    fs::remove_file(&input).unwrap();
    fs::remove_file(&output).unwrap();
}

#[test]
fn refuses_when_no_placement_exists() {
    let data = build_exe64(&Image { bss_tail: true, ..Default::default() });
    let input = write_fixture("noplace_in", &data);
    let output = temp_path("noplace_out");

    let mut patcher = Patcher::open(&input).unwrap();
    patcher.set_runpath("/nowhere").unwrap();
    let err = patcher.save_to(&output).unwrap_err();
    assert!(err.to_string().contains("PT_LOAD"), "unexpected error: {}", err);

    fs::remove_file(&input).unwrap();
    let _ = fs::remove_file(&output);
}

#[test]
fn repatching_with_the_same_value_is_idempotent() {
    let data = build_exe64(&Image { spare_slot: true, ..Default::default() });
    let input = write_fixture("idem_in", &data);
    let first = temp_path("idem_first");
    let second = temp_path("idem_second");

    let mut patcher = Patcher::open(&input).unwrap();
    patcher.set_interpreter("/lib/AAAA.so").unwrap();
    patcher.save_to(&first).unwrap();

    let mut patcher = Patcher::open(&first).unwrap();
    patcher.set_interpreter("/lib/AAAA.so").unwrap();
    patcher.save_to(&second).unwrap();

    assert_eq!(
        fs::read(&first).unwrap(),
        fs::read(&second).unwrap(),
        "setting the installed value must be a byte-level no-op"
    );

    fs::remove_file(&input).unwrap();
    fs::remove_file(&first).unwrap();
    fs::remove_file(&second).unwrap();
}

#[test]
fn save_without_edits_copies_or_returns() {
    let data = build_exe64(&Image { spare_slot: true, ..Default::default() });
    let input = write_fixture("noop_in", &data);
    let output = temp_path("noop_out");

    let patcher = Patcher::open(&input).unwrap();
    // nothing pending, no explicit output: immediate no-op
    patcher.save().unwrap();
    assert_eq!(fs::read(&input).unwrap(), data);
    // explicit output degrades to a plain copy
    patcher.save_to(&output).unwrap();
    assert_eq!(fs::read(&output).unwrap(), data);

    fs::remove_file(&input).unwrap();
    fs::remove_file(&output).unwrap();
}

#[test]
fn discarded_soname_edit_on_an_executable() {
    let data = build_exe64(&Image { spare_slot: true, ..Default::default() });
    let input = write_fixture("nosoname_in", &data);

    let mut patcher = Patcher::open(&input).unwrap();
    patcher.set_soname("libwishful.so.1").unwrap();
    assert_eq!(patcher.soname().unwrap(), None, "the edit was discarded");
    patcher.save().unwrap();
    assert_eq!(fs::read(&input).unwrap(), data, "nothing pending, nothing written");

    fs::remove_file(&input).unwrap();
}

#[test]
fn elf32_soname_roundtrip() {
    let data = build_lib32();
    let input = write_fixture("lib32_in", &data);
    let output = temp_path("lib32_out");

    let mut patcher = Patcher::open(&input).unwrap();
    assert_eq!(patcher.soname().unwrap().as_deref(), Some("libtest32.so.1"));
    patcher.set_soname("libtest32.so.2").unwrap();
    patcher.save_to(&output).unwrap();

    let patched = fs::read(&output).unwrap();
    assert_eq!(patched.len(), data.len() + PAGE as usize);
    let elf = Elf::parse(&patched).unwrap();
    assert_eq!(elf.soname(), Some("libtest32.so.2"));
    assert_eq!(elf.needed(), ["libc.so.6"]);
    assert_loads_congruent(&elf);

    fs::remove_file(&input).unwrap();
    fs::remove_file(&output).unwrap();
}

#[test]
fn permissions_are_copied_to_the_output() {
    use std::os::unix::fs::PermissionsExt;

    let data = build_exe64(&Image { spare_slot: true, ..Default::default() });
    let input = write_fixture("perms_in", &data);
    let output = temp_path("perms_out");
    fs::set_permissions(&input, fs::Permissions::from_mode(0o755)).unwrap();

    let mut patcher = Patcher::open(&input).unwrap();
    patcher.set_interpreter("/lib/AAAA.so").unwrap();
    patcher.save_to(&output).unwrap();

    let mode = fs::metadata(&output).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);

    fs::remove_file(&input).unwrap();
    fs::remove_file(&output).unwrap();
}

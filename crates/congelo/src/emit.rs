//! Generated C source emission
//!
//! Renders the catalog into its on-disk form: `K` bytecode shard files
//! holding the byte-array definitions, and a `main.c` manifest holding the
//! extern declarations and the sentinel-terminated `struct _frozen` table.
//! Every artifact is rendered fully in memory and written in one shot, so a
//! failed run never leaves a truncated table behind.

use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result, bail};
use log::debug;

use crate::catalog::{Catalog, FrozenModule};

/// Name of the generated manifest file.
pub const MANIFEST_FILE_NAME: &str = "main.c";

/// Bytes rendered per line inside a byte-array definition. Purely cosmetic;
/// the byte sequence round-trips regardless of chunking.
const BYTES_PER_LINE: usize = 16;

const MANIFEST_INCLUDES: &str = "#include <Python.h>\n\n";

const MAIN_TABLE_PREFIX: &str = "
// Compiled Python modules. These should be appended to the existing
// `PyImport_FrozenModules` that ships with CPython.
struct _frozen _PyImport_FrozenModules_congelo[] = {
";

const FALLBACK_TABLE_PREFIX: &str = "
// Compiled Python modules. These should be appended to the existing
// `PyImport_FrozenModules` that ships with CPython.
struct _frozen _PyImport_FrozenModules[] = {
";

const TABLE_SUFFIX: &str = "    {0, 0, 0} /* sentinel */\n};\n";

/// Name of the `index`-th bytecode shard file.
pub fn shard_file_name(index: usize) -> String {
    format!("bytecode_{index}.c")
}

/// Write all `num_shards` shard files into `install_dir`.
///
/// Catalog entry `i` lands in shard `i mod num_shards`; shards left without
/// any entry are still created, empty. A zero `num_shards` is rejected here
/// as well as at config load, since the sharding arithmetic requires at
/// least one shard.
pub fn write_shards(catalog: &Catalog, install_dir: &Path, num_shards: usize) -> Result<()> {
    if num_shards == 0 {
        bail!("num_shards must be at least 1");
    }
    for (index, content) in render_shards(catalog, num_shards)?.iter().enumerate() {
        let path = install_dir.join(shard_file_name(index));
        fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!("wrote {} ({} bytes)", path.display(), content.len());
    }
    Ok(())
}

/// Write the `main.c` manifest into `install_dir`.
///
/// With `oss` set, a second table named `_PyImport_FrozenModules` holding
/// only the sentinel is appended, for builds whose interpreter expects that
/// symbol but ships no embedded modules of its own.
pub fn write_manifest(catalog: &Catalog, install_dir: &Path, oss: bool) -> Result<()> {
    let path = install_dir.join(MANIFEST_FILE_NAME);
    let content = render_manifest(catalog, oss)?;
    fs::write(&path, &content).with_context(|| format!("failed to write {}", path.display()))?;
    debug!("wrote {} ({} bytes)", path.display(), content.len());
    Ok(())
}

fn render_shards(catalog: &Catalog, num_shards: usize) -> Result<Vec<Vec<u8>>> {
    let mut shards = vec![Vec::new(); num_shards];
    for (index, module) in catalog.modules().iter().enumerate() {
        render_byte_array(&mut shards[index % num_shards], module)?;
    }
    Ok(shards)
}

/// One byte-array definition, e.g. for a two-byte blob:
///
/// ```c
/// unsigned char M_pkg__mod[] = {
///     1,2,
/// };
/// ```
///
/// with a hard tab indenting each byte line.
fn render_byte_array(out: &mut Vec<u8>, module: &FrozenModule) -> Result<()> {
    write!(out, "unsigned char {}[] = {{", module.symbol_name())?;
    for chunk in module.bytecode().chunks(BYTES_PER_LINE) {
        out.extend_from_slice(b"\n\t");
        for byte in chunk {
            write!(out, "{byte},")?;
        }
    }
    out.extend_from_slice(b"\n};\n");
    Ok(())
}

fn render_manifest(catalog: &Catalog, oss: bool) -> Result<Vec<u8>> {
    let mut out = Vec::from(MANIFEST_INCLUDES);
    for module in catalog.modules() {
        writeln!(out, "extern unsigned char {}[];", module.symbol_name())?;
    }

    out.extend_from_slice(MAIN_TABLE_PREFIX.as_bytes());
    for module in catalog.modules() {
        writeln!(
            out,
            "\t{{\"{}\", {}, {}}},",
            module.qualified_name(),
            module.symbol_name(),
            module.size()
        )?;
    }
    out.extend_from_slice(TABLE_SUFFIX.as_bytes());

    if oss {
        out.extend_from_slice(FALLBACK_TABLE_PREFIX.as_bytes());
        out.extend_from_slice(TABLE_SUFFIX.as_bytes());
    }
    Ok(out)
}

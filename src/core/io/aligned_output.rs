// Alignment output records
//
// Per read:
//
//   @name<TAB>numEnds
//   numEntries                                                   (per end)
//   length<TAB>referenceLength<TAB>contig<TAB>position<TAB>strand<TAB>score
//   <aligned reference>
//   <aligned read>
//   <colour error track>                                         (colour space only)

use std::io::Write;

use crate::core::alignment::types::{AlignedEntry, AlignedRead, Space};
use crate::core::io::reference::ReferenceSource;
use crate::error::{AlignError, Result};

fn write_entry<W: Write + ?Sized, R: ReferenceSource + ?Sized>(
    out: &mut W,
    entry: &AlignedEntry,
    reference: &R,
    space: Space,
) -> Result<()> {
    let contig = reference
        .contig_name(entry.contig)
        .ok_or_else(|| AlignError::UnknownContig(format!("#{}", entry.contig)))?;
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{:.6}",
        entry.length, entry.reference_length, contig, entry.position, entry.strand, entry.score
    )?;
    out.write_all(&entry.reference)?;
    out.write_all(b"\n")?;
    out.write_all(&entry.read)?;
    out.write_all(b"\n")?;
    if space == Space::Color {
        out.write_all(&entry.color_error)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Write one aligned read.
pub fn write_aligned_read<W: Write + ?Sized, R: ReferenceSource + ?Sized>(
    out: &mut W,
    read: &AlignedRead,
    reference: &R,
    space: Space,
) -> Result<()> {
    writeln!(out, "@{}\t{}", read.name, read.ends.len())?;
    for end in &read.ends {
        writeln!(out, "{}", end.entries.len())?;
        for entry in &end.entries {
            write_entry(out, entry, reference, space)?;
        }
    }
    Ok(())
}

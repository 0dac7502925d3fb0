use crate::core::models::atom::Atom;
use crate::core::models::chain::ChainType;
use crate::core::models::frame::CrystalFrame;
use crate::core::models::residue::{ResidueType, is_water_name};
use crate::core::models::system::MolecularSystem;
use nalgebra::Point3;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record at line {line}: {message}")]
    Malformed { line: usize, message: String },
}

/// Reads a PDB file into a molecular system and its crystallographic frame.
///
/// Only `CRYST1`, `ATOM` and `HETATM` records are interpreted; everything
/// else is skipped. Atom serials are reassigned sequentially in file order so
/// the system's serial space is dense regardless of gaps in the input.
pub fn read_pdb(path: &Path) -> Result<(MolecularSystem, CrystalFrame), PdbError> {
    parse_pdb(BufReader::new(File::open(path)?))
}

/// Parses PDB-formatted text from any buffered reader.
pub fn parse_pdb<R: BufRead>(reader: R) -> Result<(MolecularSystem, CrystalFrame), PdbError> {
    let mut system = MolecularSystem::new();
    let mut frame = CrystalFrame::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        if line.starts_with("CRYST1") {
            frame = parse_cryst1(&line, line_number)?;
        } else if line.starts_with("ATOM") || line.starts_with("HETATM") {
            parse_atom_record(&mut system, &line, line_number)?;
        }
    }
    Ok((system, frame))
}

fn parse_cryst1(line: &str, line_number: usize) -> Result<CrystalFrame, PdbError> {
    let field = |range: std::ops::Range<usize>| -> Result<f64, PdbError> {
        line.get(range.clone())
            .map(str::trim)
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| PdbError::Malformed {
                line: line_number,
                message: format!("unreadable CRYST1 field at columns {range:?}"),
            })
    };
    let lengths = [field(6..15)?, field(15..24)?, field(24..33)?];
    let angles = [field(33..40)?, field(40..47)?, field(47..54)?];
    let end = line.len().min(66);
    let space_group = line
        .get(55..end)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("P 1")
        .to_string();
    Ok(CrystalFrame {
        lengths,
        angles,
        space_group,
    })
}

fn parse_atom_record(
    system: &mut MolecularSystem,
    line: &str,
    line_number: usize,
) -> Result<(), PdbError> {
    let malformed = |message: &str| PdbError::Malformed {
        line: line_number,
        message: message.to_string(),
    };

    let column = |range: std::ops::Range<usize>| line.get(range).map(str::trim).unwrap_or("");

    let name = column(12..16);
    if name.is_empty() {
        return Err(malformed("missing atom name"));
    }
    let alt_loc = line
        .get(16..17)
        .and_then(|s| s.chars().next())
        .filter(|c| !c.is_whitespace());
    let residue_name = column(17..20);
    let chain_char = line
        .get(21..22)
        .and_then(|s| s.chars().next())
        .filter(|c| !c.is_whitespace())
        .unwrap_or('A');
    let residue_number: isize = column(22..26)
        .parse()
        .map_err(|_| malformed("unreadable residue number"))?;

    let coordinate = |range: std::ops::Range<usize>| -> Result<f64, PdbError> {
        column(range)
            .parse::<f64>()
            .map_err(|_| malformed("unreadable coordinate"))
    };
    let position = Point3::new(
        coordinate(30..38)?,
        coordinate(38..46)?,
        coordinate(46..54)?,
    );
    let occupancy = column(54..60).parse::<f64>().unwrap_or(1.0);
    let element = column(76..78);

    let residue_type = ResidueType::from_three_letter(residue_name);
    let chain_type = if residue_type.is_some() {
        ChainType::Protein
    } else if is_water_name(residue_name) {
        ChainType::Water
    } else {
        ChainType::Other
    };

    let chain_id = system.add_chain(chain_char, chain_type);
    let residue_id = system
        .add_residue(chain_id, residue_number, residue_name, residue_type)
        .ok_or_else(|| malformed("could not register residue"))?;

    let mut atom = Atom::new(name, residue_id, position);
    atom.alt_loc = alt_loc;
    atom.occupancy = occupancy;
    if !element.is_empty() {
        atom.element = element.to_string();
    }
    system
        .add_atom_to_residue(residue_id, atom)
        .ok_or_else(|| malformed("could not register atom"))?;
    Ok(())
}

/// Writes a molecular system as PDB `ATOM` records with a leading `CRYST1`.
///
/// Atoms are emitted in serial order with sequential record serials, one `TER`
/// per chain break, and a final `END`.
pub fn write_pdb(
    system: &MolecularSystem,
    frame: &CrystalFrame,
    path: &Path,
) -> Result<(), PdbError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(
        writer,
        "CRYST1{:9.3}{:9.3}{:9.3}{:7.2}{:7.2}{:7.2} {:<11}",
        frame.lengths[0],
        frame.lengths[1],
        frame.lengths[2],
        frame.angles[0],
        frame.angles[1],
        frame.angles[2],
        frame.space_group,
    )?;

    let mut record_serial = 0_u32;
    let mut previous_chain: Option<char> = None;
    for (_, atom) in system.atoms_iter() {
        let residue = system
            .residue(atom.residue_id)
            .expect("atom references a live residue");
        let chain = system
            .chain(residue.chain_id)
            .expect("residue references a live chain");

        if previous_chain.is_some_and(|c| c != chain.id) {
            writeln!(writer, "TER")?;
        }
        previous_chain = Some(chain.id);

        record_serial += 1;
        writeln!(
            writer,
            "ATOM  {:>5} {:<4}{}{:>3} {}{:>4}    {:8.3}{:8.3}{:8.3}{:6.2}{:6.2}          {:>2}",
            record_serial,
            format_atom_name(&atom.name),
            atom.alt_loc.unwrap_or(' '),
            residue.name,
            chain.id,
            residue.residue_number,
            atom.position.x,
            atom.position.y,
            atom.position.z,
            atom.occupancy,
            0.0,
            atom.element,
        )?;
    }
    writeln!(writer, "TER")?;
    writeln!(writer, "END")?;
    Ok(())
}

/// Short atom names are indented one column per PDB convention, so `CA`
/// renders as `" CA "` while four-character names fill the field.
fn format_atom_name(name: &str) -> String {
    if name.len() >= 4 {
        name.to_string()
    } else {
        format!(" {name:<3}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
CRYST1   23.260   22.914   22.580  90.00  90.00  90.00 P 1
ATOM      1  N   ALA A   6      12.490  10.000  11.308  1.00 99.80           N
ATOM      2  CA  ALA A   6      11.516  11.071  11.540  1.00103.38           C
ATOM      3  CB AALA A   6      12.044  12.068  12.580  0.50114.34           C
ATOM      4  CB BALA A   6      12.144  12.168  12.680  0.50114.34           C
HETATM    5  O   HOH B   1       5.000   5.000   5.000  1.00  0.00           O
TER
END
";

    #[test]
    fn parses_atoms_altlocs_and_frame() {
        let (system, frame) = parse_pdb(Cursor::new(SAMPLE)).unwrap();

        assert_eq!(system.atom_count(), 5);
        assert_eq!(system.residue_count(), 2);
        assert_eq!(frame.lengths, [23.26, 22.914, 22.58]);
        assert_eq!(frame.space_group, "P 1");

        let (_, cb_a) = system.find_atom_by_serial(3).unwrap();
        assert_eq!(cb_a.name, "CB");
        assert_eq!(cb_a.alt_loc, Some('A'));
        assert_eq!(cb_a.occupancy, 0.5);
        assert_eq!(system.altloc_tags(), vec!['A', 'B']);
    }

    #[test]
    fn classifies_chain_types_from_residues() {
        let (system, _) = parse_pdb(Cursor::new(SAMPLE)).unwrap();
        let protein = system.find_chain_by_id('A').unwrap();
        let water = system.find_chain_by_id('B').unwrap();
        assert_eq!(system.chain(protein).unwrap().chain_type, ChainType::Protein);
        assert_eq!(system.chain(water).unwrap().chain_type, ChainType::Water);
    }

    #[test]
    fn malformed_coordinates_are_rejected() {
        let bad = "ATOM      1  N   ALA A   6      xx.xxx  10.000  11.308  1.00 99.80           N\n";
        let result = parse_pdb(Cursor::new(bad));
        assert!(matches!(result, Err(PdbError::Malformed { line: 1, .. })));
    }

    #[test]
    fn non_atom_records_are_skipped() {
        let text = "REMARK hello\nANISOU junk\nATOM      1  N   ALA A   6      12.490  10.000  11.308  1.00 99.80           N\n";
        let (system, _) = parse_pdb(Cursor::new(text)).unwrap();
        assert_eq!(system.atom_count(), 1);
    }

    #[test]
    fn write_then_read_round_trips_structure() {
        let (system, frame) = parse_pdb(Cursor::new(SAMPLE)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdb");

        write_pdb(&system, &frame, &path).unwrap();
        let (reread, reread_frame) = read_pdb(&path).unwrap();

        assert_eq!(reread.atom_count(), system.atom_count());
        assert_eq!(reread.residue_count(), system.residue_count());
        assert_eq!(reread.altloc_tags(), system.altloc_tags());
        assert_eq!(reread_frame.lengths, frame.lengths);

        let (_, original) = system.find_atom_by_serial(2).unwrap();
        let (_, copy) = reread.find_atom_by_serial(2).unwrap();
        assert_eq!(copy.name, original.name);
        assert!((copy.position - original.position).norm() < 1e-3);
    }
}

use crate::alphabet::Alphabet;
use crate::error::{MotifError, Result};
use crate::model::MotifModel;
use crate::sequence::{RealizedMotif, SequenceCollection};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};

/// Reads sequences from a plain-text file, one sequence per line.
///
/// A file whose first non-blank line starts with '>' is read as FASTA
/// instead, one sequence per record. Residues are uppercased and blank
/// lines are skipped.
///
/// # Arguments
/// * `filename` - Path to the sequence file
/// * `alphabet` - Alphabet every residue must belong to
///
/// # Returns
/// * `Result<SequenceCollection>` - The sequences in file order
///
/// # Errors
/// * Returns `MotifError::Io` if the file cannot be opened or read
/// * Returns `MotifError::InvalidFileFormat` if no sequences are found
/// * Returns `MotifError::InvalidSequence` for residues outside the alphabet
pub fn read_sequences(filename: &str, alphabet: &Alphabet) -> Result<SequenceCollection> {
    let file = File::open(filename)?;
    let reader = BufReader::new(file);

    let mut sequences: Vec<String> = Vec::new();
    let mut fasta: Option<bool> = None;
    let mut in_record = false;
    let mut current_sequence = String::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if !*fasta.get_or_insert_with(|| line.starts_with('>')) {
            sequences.push(line.to_uppercase());
        } else if line.starts_with('>') {
            if in_record {
                sequences.push(current_sequence.to_uppercase());
                current_sequence.clear();
            }
            in_record = true;
        } else {
            current_sequence.push_str(line);
        }
    }

    if in_record {
        sequences.push(current_sequence.to_uppercase());
    }

    if sequences.is_empty() {
        return Err(MotifError::InvalidFileFormat("No sequences found".into()));
    }

    SequenceCollection::new(alphabet.clone(), sequences)
}

/// Lays the model out as a DataFrame with one row per alphabet symbol and
/// one column per model column ("0" is the background).
pub fn model_table(model: &MotifModel) -> Result<DataFrame> {
    let columns = (0..=model.width())
        .map(|column| {
            Column::new(
                column.to_string().into(),
                model.column(column).to_vec(),
            )
        })
        .collect::<Vec<_>>();
    let df = DataFrame::new(columns)?;
    Ok(df)
}

/// Writes the model matrix to a tab-separated file without header.
///
/// # Errors
/// * Returns `MotifError::Io` for file writing issues
/// * Returns `MotifError::DataError` if the table cannot be built or serialized
pub fn write_model(model: &MotifModel, filename: &str) -> Result<()> {
    let mut df = model_table(model)?;
    let mut file = File::create(filename)?;
    CsvWriter::new(&mut file)
        .include_header(false)
        .with_separator(b'\t')
        .finish(&mut df)?;
    Ok(())
}

/// Writes the chosen start offset of every sequence, one per line.
///
/// # Errors
/// * Returns `MotifError::Io` for file writing issues
pub fn write_positions(realized: &[RealizedMotif], filename: &str) -> Result<()> {
    let mut file = File::create(filename)?;
    for motif in realized {
        writeln!(file, "{}", motif.start)?;
    }
    Ok(())
}

/// Console report: the model matrix followed by every realized motif.
pub fn summary(model: &MotifModel, realized: &[RealizedMotif]) -> String {
    let mut report = format!("Motif:\n\n{}\nRealized Motifs:\n\n", model);
    for motif in realized {
        report.push_str(&format!("{}\t{}\n", motif.start, motif.motif));
    }
    report
}

use motif_em_rs::alphabet::Alphabet;
use motif_em_rs::engine::EmEngine;
use motif_em_rs::error::MotifError;
use motif_em_rs::io;
use motif_em_rs::model::MotifModel;

#[test]
fn test_read_sequences() {
    let path = "tests/data/dummy_sequences.txt";
    let seqs = io::read_sequences(path, &Alphabet::dna()).unwrap();
    assert_eq!(seqs.len(), 3);
    // blank lines are skipped and residues uppercased
    assert_eq!(seqs.get(2).unwrap().residues(), b"GGGCGTGGG");

    // test file does not exist
    let result = io::read_sequences("tests/data/nonexistent.txt", &Alphabet::dna());
    assert!(matches!(result, Err(MotifError::Io(_))));
}

#[test]
fn test_read_fasta_records() {
    let seqs = io::read_sequences("tests/data/planted.fasta", &Alphabet::dna()).unwrap();
    assert_eq!(seqs.len(), 6);
    // wrapped record lines are joined
    assert_eq!(
        seqs.get(0).unwrap().residues(),
        b"CTAAAGACAATATAATAACATACACGTCAG"
    );
    assert!(seqs.iter().all(|seq| seq.len() == 30));
}

#[test]
fn test_read_with_lowercase_alphabet() {
    let alphabet = Alphabet::new("acgt").unwrap();
    let seqs = io::read_sequences("tests/data/dummy_sequences.txt", &alphabet).unwrap();
    assert_eq!(seqs.len(), 3);
    assert_eq!(seqs.get(2).unwrap().residues(), b"GGGCGTGGG");
}

#[test]
fn test_read_rejects_foreign_alphabet() {
    let rna = Alphabet::from_name("rna").unwrap();
    let result = io::read_sequences("tests/data/dummy_sequences.txt", &rna);
    assert!(matches!(
        result,
        Err(MotifError::InvalidSequence { sequence: 0, .. })
    ));
}

#[test]
fn test_write_model() {
    let path = "tests/data/model_out.tsv";
    let model = MotifModel::from_seed_subsequence(b"CGT", &Alphabet::dna(), 0.6).unwrap();
    io::write_model(&model, path).unwrap();

    let text = std::fs::read_to_string(path).unwrap();
    let rows: Vec<Vec<f64>> = text
        .lines()
        .map(|line| line.split('\t').map(|v| v.parse().unwrap()).collect())
        .collect();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|row| row.len() == 4));
    assert_eq!(rows[0][0], 0.25);
    assert_eq!(rows[1][1], 0.6);
    for column in 0..4 {
        let sum: f64 = rows.iter().map(|row| row[column]).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    // clean up
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_write_positions_and_summary() {
    let path = "tests/data/positions_out.txt";
    let seqs = io::read_sequences("tests/data/dummy_sequences.txt", &Alphabet::dna()).unwrap();
    let result = EmEngine::default().run(&seqs, 3).unwrap();
    let realized = result.realized_motifs(&seqs).unwrap();
    io::write_positions(&realized, path).unwrap();

    let text = std::fs::read_to_string(path).unwrap();
    assert_eq!(text, "3\n3\n3\n");

    let report = io::summary(&result.model, &realized);
    assert!(report.starts_with("Motif:"));
    assert_eq!(report.matches("3\tCGT").count(), 3);

    // clean up
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_model_table_shape() {
    let model = MotifModel::from_seed_subsequence(b"ACGTA", &Alphabet::dna(), 0.8).unwrap();
    let df = io::model_table(&model).unwrap();
    assert_eq!(df.height(), 4);
    assert_eq!(df.width(), 6);
}

//! On-disk records of an evolutionary run.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::trace;
use serde::Serialize;

use crate::error::Result;
use crate::evolution::genome::Genome;

const STATS_HEADER: &str = "generation\tindividual\tspecies\tfitness\tneurons\tlinks";

/// Start (or truncate) a population statistics file with its header line.
pub fn write_population_statistics_headers(path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "{}", STATS_HEADER)?;
    Ok(())
}

/// Append one row per individual of `generation`.
pub fn write_population_statistics(path: &Path, genomes: &[Genome], fitnesses: &[f64], generation: usize) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);

    for (index, (genome, fitness)) in genomes.iter().zip(fitnesses).enumerate() {
        let species = genome.species_id.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
        writeln!(
            writer,
            "{}\t{}\t{}\t{:.6}\t{}\t{}",
            generation,
            index,
            species,
            fitness,
            genome.neuron_count(),
            genome.link_count()
        )?;
    }
    writer.flush()?;

    trace!("GEN={} ::: appended {} rows to {}", generation, genomes.len(), path.display());
    Ok(())
}

pub fn write_best_individual(path: &Path, genome: &Genome) -> Result<()> {
    write_json(path, genome)
}

pub fn read_genome(path: &Path) -> Result<Genome> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Record the outcome of a validator run.
pub fn write_validation_result(path: &Path, genome_path: &Path, fitness: f64) -> Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "genome\tfitness")?;
    writeln!(file, "{}\t{:.6}", genome_path.display(), fitness)?;
    Ok(())
}

#[cfg(test)]
mod run_log_tests {
    use super::*;
    use crate::evolution::genes::ActivationFunction;

    fn genome(id: u64) -> Genome {
        let mut genome = Genome::seed(3, 2, ActivationFunction::SignedSigmoid, 0.25);
        genome.id = id;
        genome.species_id = Some(1);
        genome
    }

    #[test]
    fn statistics_append_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0_fitnesses.dat");
        let genomes = vec![genome(0), genome(1)];

        write_population_statistics_headers(&path).unwrap();
        write_population_statistics(&path, &genomes, &[1.5, 0.5], 0).unwrap();
        write_population_statistics(&path, &genomes, &[2.0, 0.1], 1).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], STATS_HEADER);
        assert_eq!(lines[1], "0\t0\t1\t1.500000\t5\t6");
        assert!(lines[4].starts_with("1\t1\t"));
    }

    #[test]
    fn best_individual_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best.dat");
        let mut stored = genome(9);
        stored.set_fitness(3.25);

        write_best_individual(&path, &stored).unwrap();
        let restored = read_genome(&path).unwrap();

        assert_eq!(restored.id, 9);
        assert_eq!(restored.fitness(), 3.25);
        assert_eq!(restored.links, stored.links);
    }

    #[test]
    fn validation_result_has_fitness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validation.dat");

        write_validation_result(&path, Path::new("best.dat"), 0.75).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("best.dat\t0.750000"));
    }
}

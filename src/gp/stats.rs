//! Per-generation statistics.
//!
//! The run controller hands one [`GenerationRecord`] per population and
//! generation to a [`StatisticsSink`]. Sinks decide how records are kept;
//! this module ships an in-memory recorder and a JSON-lines writer.

use crate::error::Result;
use crate::gp::stepping::Generation;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Statistics of one population over one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Step number, starting at 1.
    pub generation: usize,
    /// Index of the population in the run.
    pub population: usize,
    /// Every score of the scored population.
    pub scores: Vec<f64>,
    /// Best score.
    pub best: f64,
    /// Worst score.
    pub worst: f64,
    /// Identifier of the active specialization.
    pub specialization: String,
}

impl GenerationRecord {
    /// Summarize `generation`.
    #[must_use]
    pub fn new(generation_number: usize, population: usize, generation: &Generation, specialization: String) -> Self {
        Self {
            generation: generation_number,
            population,
            scores: generation.scores(),
            best: generation.best_score,
            worst: generation.worst_score(),
            specialization,
        }
    }
}

/// Receives generation statistics.
pub trait StatisticsSink {
    /// Record one generation of one population.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    fn record(&mut self, record: &GenerationRecord) -> Result<()>;
}

/// Keeps every record in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Vec<GenerationRecord>,
}

impl RecordingSink {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records received so far, oldest first.
    #[must_use]
    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }
}

impl StatisticsSink for RecordingSink {
    fn record(&mut self, record: &GenerationRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Write records to `writer`.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Flush and return the writer.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> StatisticsSink for JsonLinesSink<W> {
    fn record(&mut self, record: &GenerationRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(generation: usize) -> GenerationRecord {
        GenerationRecord {
            generation,
            population: 0,
            scores: vec![1.0, 3.0],
            best: 3.0,
            worst: 1.0,
            specialization: "OD/IC/RSD/CC/MS/PR/DIV".into(),
        }
    }

    #[test]
    fn test_recording_sink() {
        let mut sink = RecordingSink::new();
        sink.record(&record(1)).unwrap();
        sink.record(&record(2)).unwrap();
        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.records()[1].generation, 2);
    }

    #[test]
    fn test_json_lines_sink() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.record(&record(1)).unwrap();
        sink.record(&record(2)).unwrap();
        let bytes = sink.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let decoded: Vec<GenerationRecord> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(decoded, vec![record(1), record(2)]);
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::evolution::genome::Genome;

/// Result of splitting a link with a new hidden neuron.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitInnovation {
    pub neuron_id: u32,
    pub in_innovation: u32,
    pub out_innovation: u32,
}

/// Population-wide registry of structural innovations, so that identical mutations
/// in different genomes share innovation numbers and neuron ids.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InnovationDatabase {
    next_innovation: u32,
    next_neuron_id: u32,
    #[serde(with = "link_map")]
    links: HashMap<(u32, u32), u32>,
    splits: HashMap<u32, SplitInnovation>,
}

impl InnovationDatabase {
    /// Register every link and neuron of the starting genome.
    pub fn from_genome(genome: &Genome) -> Self {
        let mut db = InnovationDatabase::default();

        for link in &genome.links {
            db.links.insert((link.from, link.to), link.innovation);
            db.next_innovation = db.next_innovation.max(link.innovation + 1);
        }
        db.next_neuron_id = genome.neurons.iter().map(|n| n.id + 1).max().unwrap_or(0);

        db
    }

    pub fn link_innovation(&mut self, from: u32, to: u32) -> u32 {
        if let Some(innovation) = self.links.get(&(from, to)) {
            return *innovation;
        }

        let innovation = self.next_innovation;
        self.next_innovation += 1;
        self.links.insert((from, to), innovation);
        innovation
    }

    /// Innovation for splitting the link `link_innovation` (`from -> to`). Genomes
    /// that already own the usual split neuron get a fresh, unshared one.
    pub fn split(&mut self, link_innovation: u32, from: u32, to: u32, genome_has_neuron: impl Fn(u32) -> bool) -> SplitInnovation {
        if let Some(split) = self.splits.get(&link_innovation) {
            if !genome_has_neuron(split.neuron_id) {
                return *split;
            }
            return self.fresh_split(from, to);
        }

        let split = self.fresh_split(from, to);
        self.splits.insert(link_innovation, split);
        split
    }

    fn fresh_split(&mut self, from: u32, to: u32) -> SplitInnovation {
        let neuron_id = self.next_neuron_id;
        self.next_neuron_id += 1;

        SplitInnovation {
            neuron_id,
            in_innovation: self.link_innovation(from, neuron_id),
            out_innovation: self.link_innovation(neuron_id, to),
        }
    }

    pub fn innovation_count(&self) -> u32 {
        self.next_innovation
    }
}

/// JSON object keys must be strings, so the `(from, to)` map is stored as a list.
mod link_map {
    use std::collections::HashMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(map: &HashMap<(u32, u32), u32>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<(u32, u32, u32)> = map.iter().map(|(&(f, t), &i)| (f, t, i)).collect();
        entries.sort_unstable_by_key(|e| e.2);
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<HashMap<(u32, u32), u32>, D::Error> {
        let entries: Vec<(u32, u32, u32)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().map(|(f, t, i)| ((f, t), i)).collect())
    }
}

#[cfg(test)]
mod innovation_tests {
    use super::*;

    #[test]
    fn same_link_gets_same_innovation() {
        let mut db = InnovationDatabase::default();

        let a = db.link_innovation(0, 5);
        let b = db.link_innovation(1, 5);
        let c = db.link_innovation(0, 5);

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(db.innovation_count(), 2);
    }

    #[test]
    fn split_is_shared_unless_neuron_already_present() {
        let mut db = InnovationDatabase::default();
        let link = db.link_innovation(0, 1);

        let first = db.split(link, 0, 1, |_| false);
        let second = db.split(link, 0, 1, |_| false);
        assert_eq!(first, second);

        let third = db.split(link, 0, 1, |id| id == first.neuron_id);
        assert_ne!(third.neuron_id, first.neuron_id);
    }

    #[test]
    fn survives_json_round_trip() {
        let mut db = InnovationDatabase::default();
        db.link_innovation(3, 4);
        let json = serde_json::to_string(&db).unwrap();
        let mut restored: InnovationDatabase = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.link_innovation(3, 4), 0);
        assert_eq!(restored.link_innovation(4, 3), 1);
    }
}

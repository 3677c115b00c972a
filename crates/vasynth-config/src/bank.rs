//! An ordered collection of presets with unique names.

use std::path::Path;

use vasynth_synth::Patch;

use crate::error::ConfigError;
use crate::format::{parse_presets, presets_to_string};
use crate::preset::Preset;

/// Presets in file order, unique by name.
///
/// Program numbers are positions in this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetBank {
    presets: Vec<Preset>,
}

impl PresetBank {
    /// An empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse preset text. A later section with an existing name replaces
    /// the earlier one in place. Fails without keeping anything if any line
    /// is malformed.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut bank = Self::new();
        for preset in parse_presets(text)? {
            bank.upsert(preset);
        }
        Ok(bank)
    }

    /// Load a preset file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let bank = Self::parse(&text)?;
        tracing::info!(path = %path.display(), presets = bank.len(), "preset bank loaded");
        Ok(bank)
    }

    /// Merge every preset from `other`, replacing same-named entries.
    pub fn merge(&mut self, other: PresetBank) {
        for preset in other.presets {
            self.upsert(preset);
        }
    }

    /// Canonical text for the whole bank.
    pub fn to_text(&self) -> String {
        presets_to_string(&self.presets)
    }

    /// Write the bank in canonical form.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_text()).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Add `preset`, replacing and returning any preset with the same name.
    ///
    /// A blank name could not be read back from preset text, so it is
    /// rejected.
    pub fn insert(&mut self, preset: Preset) -> Result<Option<Preset>, ConfigError> {
        if preset.name.trim().is_empty() {
            return Err(ConfigError::Invalid("preset name is blank".into()));
        }
        Ok(self.upsert(preset))
    }

    fn upsert(&mut self, preset: Preset) -> Option<Preset> {
        match self.presets.iter_mut().find(|p| p.name == preset.name) {
            Some(slot) => {
                tracing::debug!(name = %preset.name, "replacing preset");
                Some(std::mem::replace(slot, preset))
            }
            None => {
                self.presets.push(preset);
                None
            }
        }
    }

    /// Remove a preset by name.
    pub fn remove(&mut self, name: &str) -> Option<Preset> {
        let at = self.presets.iter().position(|p| p.name == name)?;
        Some(self.presets.remove(at))
    }

    /// Look up by exact name.
    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name == name)
    }

    /// Look up by exact name, as an error when missing.
    pub fn require(&self, name: &str) -> Result<&Preset, ConfigError> {
        self.get(name)
            .ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))
    }

    /// Preset for a MIDI program number.
    pub fn by_program(&self, program: u8) -> Option<&Preset> {
        self.presets.get(usize::from(program))
    }

    /// Engine patch for a MIDI program number, built off the audio thread.
    pub fn patch_for_program(&self, program: u8) -> Option<Patch> {
        let preset = self.by_program(program)?;
        tracing::info!(program, name = %preset.name, "program change");
        Some(preset.to_patch())
    }

    /// Names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|p| p.name.as_str())
    }

    /// Presets in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Preset> {
        self.presets.iter()
    }

    /// Number of presets.
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// Whether the bank is empty.
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl<'a> IntoIterator for &'a PresetBank {
    type Item = &'a Preset;
    type IntoIter = std::slice::Iter<'a, Preset>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Preset> for PresetBank {
    fn from_iter<I: IntoIterator<Item = Preset>>(iter: I) -> Self {
        let mut bank = Self::new();
        for preset in iter {
            if let Err(err) = bank.insert(preset) {
                tracing::warn!(%err, "skipping preset");
            }
        }
        bank
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LEADS: &str = "\
[Preset]
name=Lead
vcf_cutoff_freq=3000
[EndPreset]

[Preset]
name=Bass
vcf_cutoff_freq=400
[EndPreset]

[Preset]
name=Lead
vcf_cutoff_freq=5000
[EndPreset]
";

    #[test]
    fn duplicates_replace_in_place() {
        let bank = PresetBank::parse(TWO_LEADS).unwrap();
        assert_eq!(bank.names().collect::<Vec<_>>(), ["Lead", "Bass"]);
        assert_eq!(bank.get("Lead").unwrap().vcf.cutoff_freq, 5000.0);
        assert_eq!(bank.by_program(1).unwrap().name, "Bass");
        assert!(bank.by_program(2).is_none());
        assert_eq!(bank.patch_for_program(0).unwrap().filter.cutoff, 5000.0);
    }

    #[test]
    fn failed_parse_keeps_nothing() {
        let text = format!("{TWO_LEADS}[Preset]\nname=Broken\nvca_gain=loud\n[EndPreset]\n");
        let err = PresetBank::parse(&text).unwrap_err();
        assert!(matches!(err, ConfigError::PresetParse { line: 17, .. }));
    }

    #[test]
    fn require_reports_missing_names() {
        let bank = PresetBank::parse(TWO_LEADS).unwrap();
        assert!(bank.require("Bass").is_ok());
        assert!(matches!(
            bank.require("Pad"),
            Err(ConfigError::PresetNotFound(name)) if name == "Pad"
        ));
    }

    #[test]
    fn insert_and_remove() {
        let mut bank: PresetBank = [Preset::new("A"), Preset::new("B")].into_iter().collect();
        let mut louder = Preset::new("A");
        louder.master_volume = 0.5;
        assert!(bank.insert(louder).unwrap().is_some());
        assert_eq!(bank.get("A").unwrap().master_volume, 0.5);
        assert_eq!(bank.remove("A").unwrap().name, "A");
        assert_eq!(bank.len(), 1);
        assert!(bank.remove("A").is_none());
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut bank = PresetBank::new();
        assert!(matches!(
            bank.insert(Preset::new("   ")),
            Err(ConfigError::Invalid(_))
        ));
        assert!(bank.is_empty());

        let bank: PresetBank = [Preset::new(""), Preset::new("Keep")].into_iter().collect();
        assert_eq!(bank.names().collect::<Vec<_>>(), ["Keep"]);
        assert_eq!(PresetBank::parse(&bank.to_text()).unwrap(), bank);
    }
}

// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Versioned label tables mapping model output indices to class names

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::{Result, TurathError};

/// Version tag of the table compiled into the binary
pub const BUILTIN_VERSION: &str = "builtin-1";

/// Classes of the shipped heritage model, in output order
const BUILTIN_LABELS: [&str; 90] = [
    "Alwizaya palace", "A wall painting from the first century BC", "The historical Almurabae palace",
    "albuyut altiyniat fi hayi almarabae", "suq alqaysaria", "sur aldilam", "sadu alsabein birawdat sadir",
    "eayn alnajm", "Almasmak palace", "Marid palace",
    "Zaebal palace", "Al-Shanana Tower in Al-Rass", "Uhud Castle", "Al Kut Tower", "Historic Jeddah",
    "almaraqab aljanubiu bishaqra", "kaf palace", "The historic muraqab raghbat", "Salwa Palace",
    "Ibrahim Palace",
    "aleayn alqawsiat - eayan faraj", "The historic castle of Urwa bin Al-Zubair palaces",
    "Al Khubara Heritage Town", "Shamsan Castle", "Tabuk Heritage Castle", "Alqara Mountain",
    "AIUla Heritage Town", "Jubaila Police Station", "Mount Munikh Observatory",
    "The heritage town of Oyoun Al-Jawa",
    "Ghaseiba neighborhood", "Turaif neighborhood", "King Abdulaziz Historical Center",
    "Imam Turki bin Abdullah Castle", "King Abdulaziz Castle in Duba", "Historical Shada Palace",
    "Historical Khuzam Palace", "Khuzam Palace in Al-Ahsa", "Al-Dahou neighborhood", "Al-Bujairi neighborhood",
    "The town's heritage castle in Al-Wajh", "Al-Turaif bathroom", "Alamara Palace in Ghat",
    "Dhi Ain Heritage Village", "Al-amara Palace in Al-Issawiya", "Almajlis Heritage Market in Shaqra",
    "Al-Qashla Palace", "The historic King Abdulaziz Palace in Wadi Al-Dawa",
    "King Abdulaziz Palace in Quba", "The historic King Abdulaziz Palace in Lina Center",
    "Gold bracelets from Thaj Treasure", "Copper astrolabe", "Gilded silver tableware",
    "Patterned limestone slab", "Pottery vessel dating back to the fifth millennium",
    "A pottery bowl from the Tayma civilization", "Stone inscription from the tenth century AD",
    "A precious necklace made of gold pearls and rubies", "Lahyani Statue from the 4th century",
    "Statue of the King of Lihyan from the 4 century BC",
    "A necklace made of bone and shells from 7th BC", "Statue of suffering man",
    "Latch for the Alhujra alsharifa", "Camel statue", "A precious porcelain statue",
    "Tombstone from the third century AH", "Statue of a woman dating from first century AD",
    "7,000-year-old fossilized scrapers and axes", "Monument of dhat aleuyun", "A lamp made of gilded copper",
    "9000 year old horse figure", "A silver cup from the Al-Faw civilization",
    "Lion mask from the 2nd century AD", "Statue decorated with precious stones",
    "Head of a statue dating back to the 4th century BC", "Saluki head and body",
    "A silver dirham from the Abbasid era", "Glass perfume bottle", "Small statue from the 3rd century BC",
    "Almarmar statue of a man",
    "Tombstone from Mecca", "Date-shaped bottle", "A manuscript of the Qur'an",
    "A rare manuscript of the Holy Qur'an", "A mural dating back to the first century BC", "Aaref Castle",
    "King Abdulaziz stood in the center of Al Majmaah", "Al Uqair Heritage Port",
    "King Abdulaziz Palace in Haddad", "The governorate building in the town of Al-Ula",
];

/// Class names keyed by model output index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTable {
    pub version: String,
    pub labels: Vec<String>,
}

impl LabelTable {
    /// The table matching the shipped model
    pub fn builtin() -> Self {
        Self {
            version: BUILTIN_VERSION.to_string(),
            labels: BUILTIN_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Load a table from JSON: `{"version": "...", "labels": [...]}`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let table: Self = serde_json::from_str(&content)
            .map_err(|e| TurathError::Labels(format!("Failed to parse {:?}: {}", path, e)))?;
        table.check()?;
        info!("Loaded label table {} ({} classes) from {:?}", table.version, table.len(), path);
        Ok(table)
    }

    /// Configured table, or the built-in one when no path is given
    pub fn from_config(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(Path::new(path)),
            None => Ok(Self::builtin()),
        }
    }

    fn check(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(TurathError::Labels("label table has no version".to_string()));
        }
        if self.labels.is_empty() {
            return Err(TurathError::Labels("label table is empty".to_string()));
        }
        if let Some(i) = self.labels.iter().position(|l| l.trim().is_empty()) {
            return Err(TurathError::Labels(format!("label {} is blank", i)));
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_order() {
        let table = LabelTable::builtin();
        assert_eq!(table.len(), 90);
        assert_eq!(table.get(0), Some("Alwizaya palace"));
        assert_eq!(table.get(18), Some("Salwa Palace"));
        assert_eq!(table.get(89), Some("The governorate building in the town of Al-Ula"));
        assert_eq!(table.get(90), None);
    }

    #[test]
    fn test_load_external_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, r#"{"version": "2025-02", "labels": ["Masmak", "Marid"]}"#).unwrap();

        let table = LabelTable::from_config(path.to_str()).unwrap();
        assert_eq!(table.version, "2025-02");
        assert_eq!(table.get(1), Some("Marid"));
    }

    #[test]
    fn test_reject_empty_or_blank_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");

        std::fs::write(&path, r#"{"version": "v", "labels": []}"#).unwrap();
        assert!(matches!(LabelTable::load(&path), Err(TurathError::Labels(_))));

        std::fs::write(&path, r#"{"version": "v", "labels": ["ok", " "]}"#).unwrap();
        assert!(matches!(LabelTable::load(&path), Err(TurathError::Labels(_))));
    }

    #[test]
    fn test_default_is_builtin() {
        assert_eq!(LabelTable::from_config(None).unwrap(), LabelTable::builtin());
    }
}

// Copyright 2024 Vincent Chan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::str::FromStr;
use serde::Deserialize;

/// How strongly a write waits for acknowledgment.
///
/// Names follow the classic driver constants and are parsed
/// case-insensitively, including their aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteConcern {
    ErrorsIgnored,
    Normal,
    Safe,
    FsyncSafe,
    JournalSafe,
    ReplicasSafe,
    Majority,
}

/// Acknowledgment levels understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Acknowledgment {
    None,
    Acknowledged,
    Journaled,
    Replicated,
}

impl WriteConcern {

    pub fn acknowledgment(&self) -> Acknowledgment {
        match self {
            WriteConcern::ErrorsIgnored | WriteConcern::Normal => Acknowledgment::None,
            WriteConcern::Safe => Acknowledgment::Acknowledged,
            WriteConcern::FsyncSafe | WriteConcern::JournalSafe => Acknowledgment::Journaled,
            WriteConcern::ReplicasSafe | WriteConcern::Majority => Acknowledgment::Replicated,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WriteConcern::ErrorsIgnored => "ERRORS_IGNORED",
            WriteConcern::Normal => "NORMAL",
            WriteConcern::Safe => "SAFE",
            WriteConcern::FsyncSafe => "FSYNC_SAFE",
            WriteConcern::JournalSafe => "JOURNAL_SAFE",
            WriteConcern::ReplicasSafe => "REPLICAS_SAFE",
            WriteConcern::Majority => "MAJORITY",
        }
    }

}

impl fmt::Display for WriteConcern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WriteConcern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wc = match s.to_ascii_uppercase().as_str() {
            "NONE" | "ERRORS_IGNORED" => WriteConcern::ErrorsIgnored,
            "NORMAL" | "UNACKNOWLEDGED" => WriteConcern::Normal,
            "SAFE" | "ACKNOWLEDGED" => WriteConcern::Safe,
            "FSYNC_SAFE" | "FSYNCED" => WriteConcern::FsyncSafe,
            "JOURNAL_SAFE" | "JOURNALED" => WriteConcern::JournalSafe,
            "REPLICAS_SAFE" | "REPLICA_ACKNOWLEDGED" => WriteConcern::ReplicasSafe,
            "MAJORITY" => WriteConcern::Majority,
            _ => return Err(format!("unrecognised write concern: {}", s)),
        };
        Ok(wc)
    }
}

impl<'de> Deserialize<'de> for WriteConcern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// What to do with a `writeConcern` value that names no known level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownWriteConcern {
    /// Reply with a validation error.
    #[default]
    Reject,
    /// Log a warning and use the configured (or store) default.
    Default,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("SAFE".parse::<WriteConcern>().unwrap(), WriteConcern::Safe);
        assert_eq!("acknowledged".parse::<WriteConcern>().unwrap(), WriteConcern::Safe);
        assert_eq!("Journal_Safe".parse::<WriteConcern>().unwrap(), WriteConcern::JournalSafe);
        assert_eq!("NORMAL".parse::<WriteConcern>().unwrap(), WriteConcern::Normal);
        assert!("SORTA_SAFE".parse::<WriteConcern>().is_err());
    }

    #[test]
    fn test_acknowledgment_levels() {
        assert_eq!(WriteConcern::Normal.acknowledgment(), Acknowledgment::None);
        assert_eq!(WriteConcern::Safe.acknowledgment(), Acknowledgment::Acknowledged);
        assert_eq!(WriteConcern::JournalSafe.acknowledgment(), Acknowledgment::Journaled);
        assert!(WriteConcern::Majority.acknowledgment() > WriteConcern::FsyncSafe.acknowledgment());
    }

    #[test]
    fn test_policy_from_config() {
        let p: UnknownWriteConcern = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(p, UnknownWriteConcern::Default);
        assert_eq!(UnknownWriteConcern::default(), UnknownWriteConcern::Reject);
    }
}

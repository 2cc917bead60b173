// This file is part of accelplug, an application to expose accelerator hardware to container orchestrators and to manage FPGA bitstreams.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// accelplug is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// accelplug is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Parser for the QAT driver configuration files.
//!
//! The format is the classic sectioned key/value one:
//! ```text
//! # comment
//! [GENERAL]
//! ServicesEnabled = cy;dc
//!
//! [SSL]
//! NumberCyInstances = 1
//! NumberDcInstances = 0
//! NumProcesses = 2
//! LimitDevAccess = 1
//! ```
//! Entries found before the first header belong to the section with the empty name.

use crate::error::AccelError;
use std::collections::BTreeMap;
use std::path::Path;

/// Key/value entries of one section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfSection {
    entries: BTreeMap<String, String>,
}

impl ConfSection {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

/// A parsed configuration file. Sections keep their order of appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfFile {
    sections: Vec<(String, ConfSection)>,
}

impl ConfFile {
    /// Parse `contents`, using `file` for error context only.
    ///
    /// # Returns: `Result<ConfFile, AccelError>`
    /// * `Ok(ConfFile)` - Parsed sections
    /// * `Err(AccelError::Parse)` - A line is neither a header, an entry nor a comment, a header
    ///   is unterminated, or a section is declared twice
    pub fn parse(file: &Path, contents: &str) -> Result<ConfFile, AccelError> {
        let parse_error = |line_no: usize, msg: String| AccelError::Parse {
            file: file.into(),
            msg: format!("line {line_no}: {msg}"),
        };

        let mut sections = vec![(String::new(), ConfSection::default())];
        for (idx, raw) in contents.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .ok_or_else(|| parse_error(line_no, format!("unterminated header '{line}'")))?
                    .trim();
                if sections.iter().any(|(existing, _)| existing == name) {
                    return Err(parse_error(
                        line_no,
                        format!("section [{name}] is declared more than once"),
                    ));
                }
                sections.push((name.to_string(), ConfSection::default()));
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| parse_error(line_no, format!("expected 'key = value', got '{line}'")))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(parse_error(line_no, "entry without a key".into()));
            }
            if let Some((_, section)) = sections.last_mut() {
                section
                    .entries
                    .insert(key.to_string(), value.trim().to_string());
            }
        }
        Ok(ConfFile { sections })
    }

    /// Iterate over `(name, section)` pairs in file order, including the unnamed leading section.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &ConfSection)> {
        self.sections
            .iter()
            .map(|(name, section)| (name.as_str(), section))
    }
}

//! # Scan Target Model
//!
//! Defines what a scan is pointed at.
//!
//! * A [`Domain`] is the validated root the pipeline starts from.
//! * A [`ScanTarget`] is one live hostname together with the port universe to probe.
//! * A [`TargetSelection`] decides which live hostnames get a deep scan.

use std::fmt;
use std::str::FromStr;

use crate::Error;
use crate::network::ports::QUICK_PORTS;

/// A lowercase root domain such as `example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Domain(String);

impl Domain {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Domain {
    type Err = Error;

    /// Accepts bare hostnames. Schemes, paths, ports and wildcards are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let domain = s.trim().trim_end_matches('.').to_ascii_lowercase();

        let invalid = || Error::InvalidDomain(s.to_string());
        if domain.is_empty() || domain.len() > 253 || !domain.contains('.') {
            return Err(invalid());
        }

        for label in domain.split('.') {
            let valid_chars = label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if label.is_empty()
                || label.len() > 63
                || label.starts_with('-')
                || label.ends_with('-')
                || !valid_chars
            {
                return Err(invalid());
            }
        }

        Ok(Domain(domain))
    }
}

/// The set of ports probed on one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSet {
    /// The fixed list of well-known ports.
    Quick,
    /// Every port from 1 to 65535.
    Full,
    /// An explicit list supplied by the user.
    Custom(Vec<u16>),
}

impl PortSet {
    pub fn ports(&self) -> Vec<u16> {
        match self {
            PortSet::Quick => QUICK_PORTS.to_vec(),
            PortSet::Full => (1..=u16::MAX).collect(),
            PortSet::Custom(ports) => ports.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PortSet::Quick => QUICK_PORTS.len(),
            PortSet::Full => u16::MAX as usize,
            PortSet::Custom(ports) => ports.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_deep(&self) -> bool {
        matches!(self, PortSet::Full)
    }
}

/// A hostname plus the port universe selected for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub host: String,
    pub ports: PortSet,
}

impl ScanTarget {
    pub fn new(host: impl Into<String>, deep: bool) -> Self {
        let ports = if deep { PortSet::Full } else { PortSet::Quick };
        Self {
            host: host.into(),
            ports,
        }
    }

    pub fn with_ports(host: impl Into<String>, ports: Vec<u16>) -> Self {
        Self {
            host: host.into(),
            ports: PortSet::Custom(ports),
        }
    }

    pub fn is_deep(&self) -> bool {
        self.ports.is_deep()
    }
}

/// Which of the live subdomains receive a deep scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TargetSelection {
    /// Quick scan everything.
    #[default]
    QuickAll,
    /// Deep scan everything.
    DeepAll,
    /// Deep scan the given 1-based indices, quick scan the rest.
    Indices(Vec<usize>),
}

impl FromStr for TargetSelection {
    type Err = Error;

    /// Parses `""` (quick all), `"a"` (deep all) or `"1,3,5"`.
    ///
    /// Entries that are not numbers are skipped, but at least one must parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(TargetSelection::QuickAll);
        }
        if s.eq_ignore_ascii_case("a") || s.eq_ignore_ascii_case("all") {
            return Ok(TargetSelection::DeepAll);
        }

        let indices: Vec<usize> = s
            .split(',')
            .filter_map(|part| part.trim().parse::<usize>().ok())
            .filter(|idx| *idx > 0)
            .collect();

        if indices.is_empty() {
            return Err(Error::InvalidSelection(s.to_string()));
        }
        Ok(TargetSelection::Indices(indices))
    }
}

impl TargetSelection {
    /// Splits `hosts` into scan targets.
    ///
    /// Deep targets come first, in selection order. Out-of-range indices are
    /// ignored, but a non-empty host list must match at least one of them.
    pub fn apply(&self, hosts: &[String]) -> Result<Vec<ScanTarget>, Error> {
        let targets = match self {
            TargetSelection::QuickAll => hosts.iter().map(|h| ScanTarget::new(h, false)).collect(),
            TargetSelection::DeepAll => hosts.iter().map(|h| ScanTarget::new(h, true)).collect(),
            TargetSelection::Indices(indices) => {
                let mut deep: Vec<&String> = Vec::new();
                for idx in indices {
                    if let Some(host) = idx.checked_sub(1).and_then(|i| hosts.get(i)) {
                        if !deep.contains(&host) {
                            deep.push(host);
                        }
                    }
                }

                if deep.is_empty() && !hosts.is_empty() {
                    let picked: Vec<String> = indices.iter().map(usize::to_string).collect();
                    return Err(Error::InvalidSelection(format!(
                        "{} (only {} hosts)",
                        picked.join(","),
                        hosts.len()
                    )));
                }

                let quick = hosts.iter().filter(|h| !deep.contains(h));
                deep.iter()
                    .map(|h| ScanTarget::new(*h, true))
                    .chain(quick.map(|h| ScanTarget::new(h, false)))
                    .collect()
            }
        };
        Ok(targets)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

use crate::Error;

/// The "top 20" critical ports probed by a quick scan.
pub const QUICK_PORTS: [u16; 20] = [
    21, 22, 23, 25, 53, 80, 110, 111, 135, 139, 143, 443, 445, 993, 995, 1723, 3306, 3389, 5900,
    8080,
];

/// Ports whose services are analyzed over HTTP(S) by default.
pub const WEB_PORTS: [u16; 4] = [80, 443, 8080, 8443];

/// Ports conventionally served over TLS.
pub fn is_tls_port(port: u16) -> bool {
    matches!(port, 443 | 8443)
}

/// Parses `"80,443,8000-8010"` into an ordered, duplicate-free port list.
pub fn parse_port_list(s: &str) -> Result<Vec<u16>, Error> {
    let mut ports: Vec<u16> = Vec::new();

    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_port(start)?;
                let end = parse_port(end)?;
                if start > end {
                    return Err(Error::InvalidPort(part.to_string()));
                }
                ports.extend(start..=end);
            }
            None => ports.push(parse_port(part)?),
        }
    }

    let mut seen = std::collections::HashSet::new();
    ports.retain(|port| seen.insert(*port));

    if ports.is_empty() {
        return Err(Error::InvalidPort(s.to_string()));
    }
    Ok(ports)
}

fn parse_port(s: &str) -> Result<u16, Error> {
    match s.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(Error::InvalidPort(s.to_string())),
        Ok(port) => Ok(port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn quick_ports_are_unique() {
        let mut sorted = QUICK_PORTS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), QUICK_PORTS.len());
    }

    #[test]
    fn port_list_accepts_singles_and_ranges() {
        assert_eq!(parse_port_list("80, 443,8000-8002").unwrap(), vec![80, 443, 8000, 8001, 8002]);
        assert_eq!(parse_port_list("22,22,21-22").unwrap(), vec![22, 21]);
    }

    #[test]
    fn port_list_rejects_bad_input() {
        assert!(parse_port_list("").is_err());
        assert!(parse_port_list("0").is_err());
        assert!(parse_port_list("70000").is_err());
        assert!(parse_port_list("90-80").is_err());
        assert!(parse_port_list("http").is_err());
    }

    proptest! {
        #[test]
        fn port_list_keeps_first_occurrences(ports in prop::collection::vec(1u16..=u16::MAX, 1..32)) {
            let joined = ports.iter().map(u16::to_string).collect::<Vec<_>>().join(",");
            let mut expected: Vec<u16> = Vec::new();
            for port in &ports {
                if !expected.contains(port) {
                    expected.push(*port);
                }
            }
            prop_assert_eq!(parse_port_list(&joined).unwrap(), expected);
        }
    }
}

/// High-value labels tried when no passive source answers.
pub const COMMON_LABELS: &[&str] = &[
    "www", "mail", "remote", "blog", "webmail", "server", "ns1", "ns2", "smtp", "secure", "vpn",
    "m", "shop", "ftp", "mail2", "test", "portal", "ns", "ww1", "host", "support", "dev", "web",
    "bbs", "ww42", "mx", "email", "cloud", "1", "mail1", "2", "forum", "owa", "www2", "gw",
    "admin", "store", "mx1", "cdn", "api", "exchange", "app", "gov", "2020", "news",
];

/// Candidate hostnames under `root`, one per label, in wordlist order.
pub fn candidates(root: &str) -> Vec<String> {
    COMMON_LABELS
        .iter()
        .map(|label| format!("{label}.{root}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn labels_are_unique() {
        let unique: HashSet<_> = COMMON_LABELS.iter().collect();
        assert_eq!(unique.len(), COMMON_LABELS.len());
    }

    #[test]
    fn candidates_are_rooted() {
        let hosts = candidates("example.com");
        assert_eq!(hosts[0], "www.example.com");
        assert!(hosts.iter().all(|h| h.ends_with(".example.com")));
    }
}

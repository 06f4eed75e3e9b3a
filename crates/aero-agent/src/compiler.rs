//! Compiles a rule set into an nftables document.
//!
//! The document declares the managed table, flushes it, and redefines it
//! in full, so loading it with `nft -f` swaps the whole table in one
//! transaction. Rules from two different sets are never active together.

use aero_core::RuleSet;

/// Compiled nftables document, ready to be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    text: String,
    dnat_entries: usize,
    masquerade_entries: usize,
}

impl ConfigDocument {
    /// Document text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of destination-translation lines in the prerouting chain
    #[must_use]
    pub const fn dnat_entries(&self) -> usize {
        self.dnat_entries
    }

    /// Number of masquerade lines in the postrouting chain
    #[must_use]
    pub const fn masquerade_entries(&self) -> usize {
        self.masquerade_entries
    }
}

impl std::fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Turns rule sets into complete NAT table definitions.
#[derive(Debug, Clone)]
pub struct RuleCompiler {
    table: String,
}

impl RuleCompiler {
    /// Compiler for the `ip` family table named `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Name of the managed table
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Compile a rule set. An empty set yields a table with empty chains.
    #[must_use]
    pub fn compile(&self, rules: &RuleSet) -> ConfigDocument {
        let table = &self.table;
        let mut text = String::with_capacity(256 + rules.len() * 64);

        // Declaring first makes the flush valid when the table does not exist yet.
        text.push_str(&format!("table ip {table} {{ }}\n"));
        text.push_str(&format!("flush table ip {table}\n\n"));

        text.push_str(&format!("table ip {table} {{\n"));

        text.push_str("    chain prerouting {\n");
        text.push_str("        type nat hook prerouting priority -100;\n");
        let mut dnat_entries = 0;
        for rule in rules {
            for transport in rule.protocol.transports() {
                text.push_str(&format!(
                    "        {transport} dport {} dnat to {}:{}\n",
                    rule.listen_port, rule.dest_ip, rule.dest_port
                ));
                dnat_entries += 1;
            }
        }
        text.push_str("    }\n\n");

        text.push_str("    chain postrouting {\n");
        text.push_str("        type nat hook postrouting priority 100;\n");
        let destinations = rules.destinations();
        for ip in &destinations {
            text.push_str(&format!("        ip daddr {ip} masquerade\n"));
        }
        text.push_str("    }\n");

        text.push_str("}\n");

        ConfigDocument {
            text,
            dnat_entries,
            masquerade_entries: destinations.len(),
        }
    }
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self::new("aeronode")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_core::{ForwardingRule, Protocol};
    use std::collections::BTreeSet;
    use std::net::Ipv4Addr;

    fn rule(protocol: Protocol, listen: u16, ip: [u8; 4], port: u16) -> ForwardingRule {
        ForwardingRule::new(protocol, listen, Ipv4Addr::from(ip), port)
    }

    fn lines(doc: &ConfigDocument) -> BTreeSet<String> {
        doc.as_str().lines().map(|l| l.trim().to_string()).collect()
    }

    fn count(doc: &ConfigDocument, needle: &str) -> usize {
        doc.as_str().lines().filter(|l| l.contains(needle)).count()
    }

    #[test]
    fn test_empty_rule_set() {
        let doc = RuleCompiler::default().compile(&RuleSet::default());
        let expected = "table ip aeronode { }\n\
                        flush table ip aeronode\n\
                        \n\
                        table ip aeronode {\n    \
                            chain prerouting {\n        \
                                type nat hook prerouting priority -100;\n    \
                            }\n\
                        \n    \
                            chain postrouting {\n        \
                                type nat hook postrouting priority 100;\n    \
                            }\n\
                        }\n";
        assert_eq!(doc.as_str(), expected);
        assert_eq!(doc.dnat_entries(), 0);
        assert_eq!(doc.masquerade_entries(), 0);
    }

    #[test]
    fn test_flush_precedes_definition() {
        let rules = RuleSet::new(vec![rule(Protocol::Tcp, 80, [10, 0, 0, 1], 8080)]);
        let doc = RuleCompiler::new("edge").compile(&rules);
        let mut it = doc.as_str().lines();
        assert_eq!(it.next(), Some("table ip edge { }"));
        assert_eq!(it.next(), Some("flush table ip edge"));
    }

    #[test]
    fn test_combined_protocol_emits_two_entries() {
        let rules = RuleSet::new(vec![rule(Protocol::TcpUdp, 8080, [10, 0, 0, 5], 80)]);
        let doc = RuleCompiler::default().compile(&rules);

        assert_eq!(count(&doc, "dnat to"), 2);
        let lines = lines(&doc);
        assert!(lines.contains("tcp dport 8080 dnat to 10.0.0.5:80"));
        assert!(lines.contains("udp dport 8080 dnat to 10.0.0.5:80"));
        assert_eq!(doc.dnat_entries(), 2);
    }

    #[test]
    fn test_single_protocol_emits_one_entry() {
        let rules = RuleSet::new(vec![rule(Protocol::Udp, 53, [1, 1, 1, 1], 53)]);
        let doc = RuleCompiler::default().compile(&rules);

        assert_eq!(count(&doc, "dnat to"), 1);
        assert!(lines(&doc).contains("udp dport 53 dnat to 1.1.1.1:53"));
    }

    #[test]
    fn test_masquerade_dedup() {
        let rules = RuleSet::new(vec![
            rule(Protocol::Tcp, 8080, [10, 0, 0, 5], 80),
            rule(Protocol::Tcp, 8443, [10, 0, 0, 5], 443),
            rule(Protocol::Udp, 5353, [10, 0, 0, 9], 53),
            rule(Protocol::TcpUdp, 2222, [10, 0, 0, 5], 22),
        ]);
        let doc = RuleCompiler::default().compile(&rules);

        assert_eq!(count(&doc, "ip daddr 10.0.0.5 masquerade"), 1);
        assert_eq!(count(&doc, "ip daddr 10.0.0.9 masquerade"), 1);
        assert_eq!(doc.masquerade_entries(), 2);
        assert_eq!(doc.dnat_entries(), 5);
    }

    #[test]
    fn test_dnat_entries_keep_rule_order() {
        let rules = RuleSet::new(vec![
            rule(Protocol::Tcp, 9000, [10, 0, 0, 2], 90),
            rule(Protocol::Tcp, 1000, [10, 0, 0, 1], 10),
        ]);
        let doc = RuleCompiler::default().compile(&rules);
        let dnat: Vec<&str> = doc
            .as_str()
            .lines()
            .filter(|l| l.contains("dnat to"))
            .map(str::trim)
            .collect();
        assert_eq!(
            dnat,
            vec!["tcp dport 9000 dnat to 10.0.0.2:90", "tcp dport 1000 dnat to 10.0.0.1:10"]
        );
    }

    #[test]
    fn test_compile_is_deterministic() {
        let build = |order: &[usize]| {
            let all = [
                rule(Protocol::Tcp, 1, [10, 0, 0, 3], 1),
                rule(Protocol::Udp, 2, [10, 0, 0, 1], 2),
                rule(Protocol::TcpUdp, 3, [10, 0, 0, 2], 3),
            ];
            RuleSet::new(order.iter().map(|&i| all[i].clone()).collect())
        };
        let compiler = RuleCompiler::default();

        let a = compiler.compile(&build(&[0, 1, 2]));
        assert_eq!(a, compiler.compile(&build(&[0, 1, 2])));

        // Reordering rules changes line order but not the set of lines.
        let b = compiler.compile(&build(&[2, 0, 1]));
        assert_eq!(lines(&a), lines(&b));
    }
}

use super::{ChainGraph, ChainTopStatus};
use crate::{trust_store::TrustAnchorChecker, types::CertificateRecord};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io::{Result as IoResult, Write},
};

const INDENT: &str = "    ";
const BRANCH: &str = "└── ";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportLine {
    ChainHeader { number: usize },
    /// Heading for records only reachable through an issuance loop.
    LoopHeader { number: usize },
    Issuer { issuer: String },
    IssuerTrust { trusted: bool },
    Subject { subject: String, self_signed: bool },
    RootTrust { trusted: bool, sha1: bool },
    WeakSignature { level: usize, algorithm: String },
    Node { depth: usize, subject: String },
    San { level: usize, name: String },
    LoopDetected { depth: usize, count: usize },
    Truncated { limit: usize },
}

impl ReportLine {
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ReportLine::IssuerTrust { trusted: false }
                | ReportLine::RootTrust { trusted: false, .. }
                | ReportLine::WeakSignature { .. }
                | ReportLine::LoopDetected { .. }
                | ReportLine::Truncated { .. }
        )
    }
}

fn annotation_prefix(f: &mut Formatter<'_>, level: usize) -> FmtResult {
    write!(f, "{}  ", INDENT.repeat(level))
}

impl Display for ReportLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ReportLine::ChainHeader { number } => write!(f, "Chain #{number}:"),
            ReportLine::LoopHeader { number } => {
                write!(f, "Chain #{number} (no chain top, issuance loop):")
            }
            ReportLine::Issuer { issuer } => write!(f, "Issuer: {issuer}"),
            ReportLine::IssuerTrust { trusted: true } => {
                write!(f, "  [OK] issuer found in root store")
            }
            ReportLine::IssuerTrust { trusted: false } => {
                write!(f, "  [WARN] issuer not found in root store")
            }
            ReportLine::Subject {
                subject,
                self_signed: true,
            } => write!(f, "Subject: {subject} (self-signed)"),
            ReportLine::Subject { subject, .. } => write!(f, "Subject: {subject}"),
            ReportLine::RootTrust {
                trusted: true,
                sha1: true,
            } => write!(
                f,
                "  [OK] self-signed certificate found in root store (SHA-1 signature accepted for a trusted root)"
            ),
            ReportLine::RootTrust { trusted: true, .. } => {
                write!(f, "  [OK] self-signed certificate found in root store")
            }
            ReportLine::RootTrust { trusted: false, .. } => {
                write!(f, "  [WARN] self-signed certificate not found in root store")
            }
            ReportLine::WeakSignature { level, algorithm } => {
                annotation_prefix(f, *level)?;
                write!(f, "[WARN] signed with SHA-1 ({algorithm})")
            }
            ReportLine::Node { depth, subject } => {
                write!(f, "{}{BRANCH}{subject}", INDENT.repeat(*depth))
            }
            ReportLine::San { level, name } => {
                annotation_prefix(f, *level)?;
                write!(f, "SAN: {name}")
            }
            ReportLine::LoopDetected { depth, count } => write!(
                f,
                "{}[ERROR] issuance loop: depth {depth} exceeds certificate count {count}, branch truncated",
                INDENT.repeat(*depth)
            ),
            ReportLine::Truncated { limit } => write!(
                f,
                "[ERROR] more than {limit} tree entries in this branch, rest of the branch truncated"
            ),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub lines: Vec<ReportLine>,
}

impl Report {
    fn push(&mut self, line: ReportLine) {
        self.lines.push(line);
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ReportLine> {
        self.lines.iter().filter(|line| line.is_warning())
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> IoResult<()> {
        for line in &self.lines {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Depth-first, pre-order rendering of every chain in a [`ChainGraph`].
pub struct ChainRenderer<'g, 'a, T: ?Sized> {
    graph: &'g ChainGraph<'a>,
    roots: &'g T,
}

impl<'g, 'a, T> ChainRenderer<'g, 'a, T>
where
    T: TrustAnchorChecker + ?Sized,
{
    pub fn new(graph: &'g ChainGraph<'a>, roots: &'g T) -> Self {
        Self { graph, roots }
    }

    pub fn render(&self) -> Report {
        let records = self.graph.records();
        let mut report = Report::default();
        let mut reached = vec![false; records.len()];
        let mut number = 0;

        for &top in self.graph.chain_tops() {
            let Some(chain_top) = self.graph.classify(top, self.roots) else {
                continue;
            };
            number += 1;
            report.push(ReportLine::ChainHeader { number });
            self.mark_reachable(top, &mut reached);

            let record = chain_top.record;
            match chain_top.status {
                ChainTopStatus::ExternalIssuer {
                    issuer,
                    issuer_trusted,
                } => {
                    report.push(ReportLine::Issuer { issuer });
                    report.push(ReportLine::IssuerTrust {
                        trusted: issuer_trusted,
                    });
                    report.push(ReportLine::Subject {
                        subject: record.subject.clone(),
                        self_signed: false,
                    });
                    push_weak_signature(&mut report, record, 0);
                }
                ChainTopStatus::SelfSigned { trusted } => {
                    report.push(ReportLine::Subject {
                        subject: record.subject.clone(),
                        self_signed: true,
                    });
                    let sha1 = record.is_sha1_signed();
                    if sha1 && !trusted {
                        push_weak_signature(&mut report, record, 0);
                    }
                    report.push(ReportLine::RootTrust { trusted, sha1 });
                }
            }

            self.render_descendants(top, &mut report);
        }

        // Whatever is left hangs off an issuance loop with no top
        while let Some(pos) = reached.iter().position(|r| !r) {
            let record = &records[pos + 1];
            warn!("Certificate {} is only reachable through an issuance loop", record);

            number += 1;
            report.push(ReportLine::LoopHeader { number });
            self.mark_reachable(record.index, &mut reached);
            report.push(ReportLine::Subject {
                subject: record.subject.clone(),
                self_signed: record.is_self_signed(),
            });
            push_weak_signature(&mut report, record, 0);

            self.render_descendants(record.index, &mut report);
        }

        report
    }

    /// Flag every record issued, directly or not, by `from`.
    fn mark_reachable(&self, from: usize, reached: &mut [bool]) {
        reached[from - 1] = true;
        let mut pending = vec![from];
        while let Some(index) = pending.pop() {
            for child in self.graph.index().find_issued(index) {
                if !reached[child - 1] {
                    reached[child - 1] = true;
                    pending.push(child);
                }
            }
        }
    }

    fn render_descendants(&self, top: usize, report: &mut Report) {
        let records = self.graph.records();
        let count = records.len();

        // Budget of each direct child's subtree
        let limit = node_limit(count);
        let mut emitted = 0;

        // (record, depth) in reverse visiting order
        let mut stack: Vec<(usize, usize)> = Vec::new();
        self.expand(top, 0, count, &mut stack, report);

        while let Some((index, depth)) = stack.pop() {
            if depth == 0 {
                emitted = 0;
            } else if emitted == limit {
                warn!("Branch below {} exceeds {} entries", records[top], limit);
                report.push(ReportLine::Truncated { limit });
                // Drop the rest of this branch, the next direct child carries on
                while stack.last().is_some_and(|&(_, depth)| depth > 0) {
                    stack.pop();
                }
                continue;
            }
            emitted += 1;

            let record = &records[index];

            report.push(ReportLine::Node {
                depth,
                subject: record.subject.clone(),
            });
            push_weak_signature(report, record, depth + 1);
            for name in &record.san_list {
                report.push(ReportLine::San {
                    level: depth + 1,
                    name: name.clone(),
                });
            }

            self.expand(index, depth + 1, count, &mut stack, report);
        }
    }

    /// Queue the children of `index` at `depth`, or cut the branch once the
    /// depth exceeds the number of records.
    fn expand(
        &self,
        index: usize,
        depth: usize,
        count: usize,
        stack: &mut Vec<(usize, usize)>,
        report: &mut Report,
    ) {
        if depth > count {
            warn!(
                "Issuance loop below {}: depth {} exceeds {} certificates",
                self.graph.records()[index],
                depth,
                count
            );
            report.push(ReportLine::LoopDetected { depth, count });
            return;
        }

        let start = stack.len();
        stack.extend(self.graph.index().find_issued(index).map(|child| (child, depth)));
        stack[start..].reverse();
    }
}

/// Upper bound on tree entries in the branch of one direct child of a chain
/// top. The depth guard alone still allows fan-out to the power of N when
/// subjects are duplicated.
fn node_limit(count: usize) -> usize {
    count.saturating_mul(count.saturating_add(1))
}

fn push_weak_signature(report: &mut Report, record: &CertificateRecord, level: usize) {
    if record.is_sha1_signed() {
        report.push(ReportLine::WeakSignature {
            level,
            algorithm: record.signature_algorithm.clone(),
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        trust_store::RootStore,
        types::{CertificateRecord, CertificateRecords},
    };

    const SHA256: &str = "sha256WithRSAEncryption";
    const SHA1: &str = "sha1WithRSAEncryption";

    fn record(subject: &str, issuer: &str) -> CertificateRecord {
        CertificateRecord::new(subject, issuer).with_signature_algorithm(SHA256)
    }

    fn render(records: &CertificateRecords, roots: &RootStore) -> Report {
        let graph = ChainGraph::build(records);
        ChainRenderer::new(&graph, roots).render()
    }

    fn text(report: &Report) -> Vec<String> {
        report.lines.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn trusted_three_level_chain() {
        let records: CertificateRecords = [
            record("Leaf", "Intermediate"),
            record("Intermediate", "Root"),
            record("Root", "Root"),
        ]
        .into_iter()
        .collect();
        let report = render(&records, &RootStore::from_subjects(["Root"]));

        assert_eq!(
            text(&report),
            vec![
                "Chain #1:",
                "Subject: Root (self-signed)",
                "  [OK] self-signed certificate found in root store",
                "└── Intermediate",
                "    └── Leaf",
            ]
        );
        assert_eq!(report.warnings().count(), 0);
    }

    #[test]
    fn untrusted_sha1_root_warns_twice() {
        let records: CertificateRecords = [
            record("Leaf", "Intermediate"),
            record("Intermediate", "Root"),
            record("Root", "Root").with_signature_algorithm(SHA1),
        ]
        .into_iter()
        .collect();
        let report = render(&records, &RootStore::default());

        assert_eq!(
            &report.lines[..4],
            &[
                ReportLine::ChainHeader { number: 1 },
                ReportLine::Subject {
                    subject: "Root".to_owned(),
                    self_signed: true
                },
                ReportLine::WeakSignature {
                    level: 0,
                    algorithm: SHA1.to_owned()
                },
                ReportLine::RootTrust {
                    trusted: false,
                    sha1: true
                },
            ]
        );
        assert_eq!(report.warnings().count(), 2);
        assert_eq!(
            text(&report)[2..4],
            [
                "  [WARN] signed with SHA-1 (sha1WithRSAEncryption)",
                "  [WARN] self-signed certificate not found in root store",
            ]
        );
    }

    #[test]
    fn trusted_sha1_root_is_accepted() {
        let records: CertificateRecords = [record("Root", "Root").with_signature_algorithm(SHA1)]
            .into_iter()
            .collect();
        let report = render(&records, &RootStore::from_subjects(["Root"]));

        assert_eq!(report.warnings().count(), 0);
        assert_eq!(
            report.lines.last(),
            Some(&ReportLine::RootTrust {
                trusted: true,
                sha1: true
            })
        );
    }

    #[test]
    fn untrusted_modern_root_warns_once() {
        let records: CertificateRecords = [record("Root", "Root")].into_iter().collect();
        let report = render(&records, &RootStore::default());

        assert_eq!(
            text(&report),
            vec![
                "Chain #1:",
                "Subject: Root (self-signed)",
                "  [WARN] self-signed certificate not found in root store",
            ]
        );
    }

    #[test]
    fn external_issuer_block() {
        let records: CertificateRecords = [
            record("Leaf", "Intermediate").with_san_list(["DNS:example.com", "DNS:www.example.com"]),
            record("Intermediate", "Root").with_signature_algorithm(SHA1),
        ]
        .into_iter()
        .collect();
        let report = render(&records, &RootStore::from_subjects(["Root"]));

        assert_eq!(
            text(&report),
            vec![
                "Chain #1:",
                "Issuer: Root",
                "  [OK] issuer found in root store",
                "Subject: Intermediate",
                "  [WARN] signed with SHA-1 (sha1WithRSAEncryption)",
                "└── Leaf",
                "      SAN: DNS:example.com",
                "      SAN: DNS:www.example.com",
            ]
        );
    }

    #[test]
    fn missing_issuer_is_reported_not_fatal() {
        let records: CertificateRecords = [record("Leaf", "Gone")].into_iter().collect();
        let report = render(&records, &RootStore::default());

        assert_eq!(
            text(&report),
            vec![
                "Chain #1:",
                "Issuer: Gone",
                "  [WARN] issuer not found in root store",
                "Subject: Leaf",
            ]
        );
    }

    #[test]
    fn forked_children_render_in_index_order() {
        let records: CertificateRecords = [
            record("B", "X"),
            record("X", "X"),
            record("A", "X"),
            record("A1", "A"),
        ]
        .into_iter()
        .collect();
        let report = render(&records, &RootStore::from_subjects(["X"]));

        assert_eq!(
            text(&report)[3..],
            ["└── B", "└── A", "    └── A1"]
        );
    }

    #[test]
    fn sha1_child_is_annotated_at_any_depth() {
        let records: CertificateRecords = [
            record("Root", "Root"),
            record("Inter", "Root"),
            record("Leaf", "Inter").with_signature_algorithm(SHA1),
        ]
        .into_iter()
        .collect();
        let report = render(&records, &RootStore::from_subjects(["Root"]));

        let lines = text(&report);
        let leaf = lines.iter().position(|l| l == "    └── Leaf").unwrap();
        assert_eq!(
            lines[leaf + 1],
            "          [WARN] signed with SHA-1 (sha1WithRSAEncryption)"
        );
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn two_record_cycle_terminates_with_diagnostic() {
        let records: CertificateRecords = [record("One", "Two"), record("Two", "One")]
            .into_iter()
            .collect();
        let report = render(&records, &RootStore::default());

        assert_eq!(
            report.lines.first(),
            Some(&ReportLine::LoopHeader { number: 1 })
        );
        assert!(report
            .lines
            .contains(&ReportLine::LoopDetected { depth: 3, count: 2 }));
        // Depth never goes past the record count
        assert!(report.lines.iter().all(|line| match line {
            ReportLine::Node { depth, .. } => *depth <= 2,
            _ => true,
        }));
    }

    #[test]
    fn loop_only_truncates_its_own_branch() {
        let records: CertificateRecords = [
            record("Root", "Root"),
            record("Good", "Root"),
            record("Loop A", "Loop B"),
            record("Loop B", "Loop A"),
        ]
        .into_iter()
        .collect();
        let report = render(&records, &RootStore::from_subjects(["Root"]));
        let lines = text(&report);

        assert_eq!(lines[0], "Chain #1:");
        assert_eq!(lines[3], "└── Good");
        assert_eq!(lines[4], "Chain #2 (no chain top, issuance loop):");
        assert_eq!(lines[5], "Subject: Loop A");
        assert_eq!(
            report
                .lines
                .iter()
                .filter(|l| matches!(l, ReportLine::LoopDetected { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn cycle_below_a_chain_top_is_truncated() {
        // "Mid" and "Tail" issue each other and "Mid" hangs off the root too
        let records: CertificateRecords = [
            record("Root", "Root"),
            record("Mid", "Tail"),
            record("Tail", "Mid"),
            record("Mid", "Root"),
        ]
        .into_iter()
        .collect();
        let report = render(&records, &RootStore::from_subjects(["Root"]));

        assert!(report
            .lines
            .iter()
            .any(|l| matches!(l, ReportLine::LoopDetected { count: 4, .. })));
        assert_eq!(
            report
                .lines
                .iter()
                .filter(|l| matches!(l, ReportLine::ChainHeader { .. } | ReportLine::LoopHeader { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn duplicated_subjects_hit_the_entry_limit() {
        // Every copy of "Dup" issues every other copy
        let mut all = vec![record("Root", "Root")];
        all.extend((0..8).map(|_| record("Dup", "Dup")));
        all.push(record("Dup", "Root"));
        let records: CertificateRecords = all.into_iter().collect();
        let count = records.len();

        let report = render(&records, &RootStore::from_subjects(["Root"]));

        let nodes = report
            .lines
            .iter()
            .filter(|l| matches!(l, ReportLine::Node { .. }))
            .count();
        assert_eq!(nodes, count * (count + 1));
        assert_eq!(
            report.lines.last(),
            Some(&ReportLine::Truncated {
                limit: count * (count + 1)
            })
        );
    }

    #[test]
    fn entry_limit_spares_later_siblings() {
        // "A" and "B" issue each other, with three more copies of "A" under "B"
        let records: CertificateRecords = [
            record("Root", "Root"),
            record("A", "Root"),
            record("A", "B"),
            record("A", "B"),
            record("A", "B"),
            record("B", "A"),
            record("Good", "Root"),
        ]
        .into_iter()
        .collect();
        let report = render(&records, &RootStore::from_subjects(["Root"]));
        let lines = text(&report);

        let truncated = lines
            .iter()
            .position(|l| {
                l == "[ERROR] more than 56 tree entries in this branch, rest of the branch truncated"
            })
            .unwrap();
        assert_eq!(lines[truncated + 1..], ["└── Good"]);
        assert_eq!(
            report
                .lines
                .iter()
                .filter(|l| matches!(l, ReportLine::Truncated { .. }))
                .count(),
            1
        );
        assert!(!report
            .lines
            .iter()
            .any(|l| matches!(l, ReportLine::LoopHeader { .. })));
    }

    #[test]
    fn truncated_records_stay_out_of_the_loop_fallback() {
        // "Tail" follows an exploding "Dup" subtree under "Head" and is cut
        let mut all = vec![
            record("Root", "Root"),
            record("Head", "Root"),
            record("Dup", "Head"),
        ];
        all.extend((0..4).map(|_| record("Dup", "Dup")));
        all.push(record("Tail", "Head"));
        all.push(record("Deep", "Tail"));
        let records: CertificateRecords = all.into_iter().collect();

        let report = render(&records, &RootStore::from_subjects(["Root"]));
        let lines = text(&report);

        assert_eq!(
            lines.last().map(String::as_str),
            Some("[ERROR] more than 90 tree entries in this branch, rest of the branch truncated")
        );
        assert!(!lines.iter().any(|l| l.ends_with("└── Tail")));
        assert_eq!(
            report
                .lines
                .iter()
                .filter(|l| matches!(l, ReportLine::ChainHeader { .. } | ReportLine::LoopHeader { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn every_chain_top_gets_a_block() {
        let records: CertificateRecords = [
            record("Leaf A", "Root A"),
            record("Root B", "Root B"),
            record("Leaf B", "Root B"),
            record("Root A", "Root A"),
        ]
        .into_iter()
        .collect();
        let report = render(&records, &RootStore::from_subjects(["Root A", "Root B"]));

        let headers: Vec<_> = report
            .lines
            .iter()
            .filter(|l| matches!(l, ReportLine::ChainHeader { .. }))
            .collect();
        assert_eq!(headers.len(), 2);
        assert_eq!(text(&report)[1], "Subject: Root B (self-signed)");
    }

    #[test]
    fn write_to_emits_one_line_per_entry() {
        let records: CertificateRecords = [record("Root", "Root")].into_iter().collect();
        let report = render(&records, &RootStore::from_subjects(["Root"]));

        let mut out = Vec::new();
        report.write_to(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, report.to_string());
        assert_eq!(out.lines().count(), report.lines.len());
    }
}

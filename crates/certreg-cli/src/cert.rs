//! # Cert Subcommand
//!
//! Certificate operations against a registry data file.
//!
//! ## Subcommands
//!
//! - `issue`: Issue a certificate.
//! - `show`: Print the full record.
//! - `verify`: Verify by id, or by `--recipient` and `--course`.
//! - `revoke` / `delete`: Revoke a certificate.
//! - `list`: List certificates, newest first.
//! - `metadata`: Set or remove metadata entries.
//! - `stats`: Registry totals.
//!
//! ## Exit codes
//!
//! `verify` exits 0 for a valid certificate, 2 for a revoked one and 3 when
//! nothing matches. Every other subcommand exits 0 on success.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};

use certreg_core::{CertificateId, Metadata, MetadataUpdate};
use certreg_registry::{IssueRequest, ListFilter, Registry, Verification, DELETION_REASON};
use certreg_state::{Certificate, CertificateStatus, RevocationEvidence, RevocationOutcome};

use crate::{open_registry, print_json, StoreOptions};

/// Exit code for `verify` when the certificate is revoked.
pub const EXIT_REVOKED: u8 = 2;
/// Exit code for `verify` when no certificate matches.
pub const EXIT_NOT_FOUND: u8 = 3;

/// Arguments for the `certreg cert` subcommand.
#[derive(Args, Debug)]
pub struct CertArgs {
    /// Print JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: CertCommand,
}

/// Certificate subcommands.
#[derive(Subcommand, Debug)]
pub enum CertCommand {
    /// Issue a new certificate.
    Issue {
        /// Recipient's full name.
        #[arg(long)]
        recipient: String,
        /// Course or internship name.
        #[arg(long)]
        course: String,
        /// Issue date (YYYY-MM-DD). Defaults to today (UTC).
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Metadata entry as KEY=VALUE. VALUE is parsed as JSON when it can be.
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        metadata: Vec<String>,
    },

    /// Show a certificate record.
    Show {
        /// Certificate id.
        id: String,
    },

    /// Verify a certificate.
    Verify {
        /// Certificate id.
        #[arg(conflicts_with_all = ["recipient", "course"], required_unless_present = "recipient")]
        id: Option<String>,
        /// Recipient name, with --course.
        #[arg(long, requires = "course")]
        recipient: Option<String>,
        /// Course name, with --recipient.
        #[arg(long, requires = "recipient")]
        course: Option<String>,
    },

    /// Revoke a certificate. Revoking twice is a no-op.
    Revoke {
        /// Certificate id.
        id: String,
        /// Reason recorded on the certificate.
        #[arg(long)]
        reason: String,
        /// Who is revoking.
        #[arg(long)]
        actor: Option<String>,
    },

    /// Delete a certificate. It stays on record and verifies as revoked.
    Delete {
        /// Certificate id.
        id: String,
        /// Who is deleting.
        #[arg(long)]
        actor: Option<String>,
    },

    /// List certificates, newest first.
    List {
        /// Only `active` or `revoked` certificates.
        #[arg(long)]
        status: Option<CertificateStatus>,
        /// Exact course name, case-insensitive.
        #[arg(long)]
        course: Option<String>,
        /// Substring of the recipient name, case-insensitive.
        #[arg(long)]
        recipient: Option<String>,
        /// Maximum number of certificates.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Set or remove metadata entries.
    Metadata {
        /// Certificate id.
        id: String,
        /// Entry to set, as KEY=VALUE.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Key to remove.
        #[arg(long = "unset", value_name = "KEY")]
        unset: Vec<String>,
        /// Replace the whole map with the --set entries.
        #[arg(long, conflicts_with = "unset")]
        replace: bool,
    },

    /// Show registry totals.
    Stats,
}

/// Execute the cert subcommand.
pub fn run_cert(args: &CertArgs, options: &StoreOptions) -> Result<u8> {
    let registry = open_registry(options)?;
    let json = args.json;

    match &args.command {
        CertCommand::Issue {
            recipient,
            course,
            date,
            metadata,
        } => cmd_issue(&registry, recipient, course, *date, metadata, json),
        CertCommand::Show { id } => {
            let cert = registry.lookup(&parse_id(id)?)?;
            emit(&cert, json)
        }
        CertCommand::Verify {
            id,
            recipient,
            course,
        } => {
            let verification = match (id, recipient, course) {
                (Some(id), _, _) => registry.verify(id)?,
                (None, Some(recipient), Some(course)) => {
                    registry.find_by_recipient(recipient, course)?
                }
                _ => bail!("give a certificate id, or both --recipient and --course"),
            };
            cmd_verify(&verification, json)
        }
        CertCommand::Revoke { id, reason, actor } => {
            cmd_revoke(&registry, id, reason, actor.clone(), json)
        }
        CertCommand::Delete { id, actor } => {
            cmd_revoke(&registry, id, DELETION_REASON, actor.clone(), json)
        }
        CertCommand::List {
            status,
            course,
            recipient,
            limit,
        } => {
            let filter = ListFilter {
                status: *status,
                course: course.clone(),
                recipient: recipient.clone(),
                limit: *limit,
            };
            cmd_list(&registry.list(&filter)?, json)
        }
        CertCommand::Metadata {
            id,
            set,
            unset,
            replace,
        } => cmd_metadata(&registry, id, set, unset, *replace, json),
        CertCommand::Stats => {
            let stats = registry.statistics()?;
            if json {
                print_json(&stats)?;
            } else {
                println!("Certificates: {}", stats.total);
                println!("  Active: {}", stats.active);
                println!("  Revoked: {}", stats.revoked);
                for (course, count) in &stats.by_course {
                    println!("  {course}: {count}");
                }
            }
            Ok(0)
        }
    }
}

fn parse_id(raw: &str) -> Result<CertificateId> {
    CertificateId::parse(raw).with_context(|| format!("not a certificate id: {raw}"))
}

/// Split `KEY=VALUE`. VALUE becomes JSON if it parses, else a string.
fn parse_entry(raw: &str) -> Result<(String, serde_json::Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("metadata entry must look like KEY=VALUE: {raw}");
    };
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.trim().to_string(), value))
}

fn parse_entries(raw: &[String]) -> Result<BTreeMap<String, serde_json::Value>> {
    raw.iter().map(|entry| parse_entry(entry)).collect()
}

fn emit(cert: &Certificate, json: bool) -> Result<u8> {
    if json {
        print_json(cert)?;
        return Ok(0);
    }
    println!("Certificate: {}", cert.id());
    println!("  Recipient: {}", cert.recipient_name());
    println!("  Course: {}", cert.course_name());
    println!("  Issue date: {}", cert.issue_date());
    println!("  Issued at: {}", cert.issued_at());
    println!("  Status: {}", cert.status());
    for (key, value) in cert.metadata().iter() {
        println!("  {key}: {value}");
    }
    for t in cert.transitions() {
        println!(
            "  {} → {} at {}: {}",
            t.from_state, t.to_state, t.timestamp, t.reason
        );
    }
    Ok(0)
}

fn cmd_issue(
    registry: &Registry,
    recipient: &str,
    course: &str,
    date: Option<NaiveDate>,
    metadata: &[String],
    json: bool,
) -> Result<u8> {
    let metadata = Metadata::from_entries(parse_entries(metadata)?)?;
    let cert = registry.issue(IssueRequest {
        recipient_name: recipient.to_string(),
        course_name: course.to_string(),
        issue_date: date,
        metadata,
    })?;
    if json {
        print_json(&cert)?;
    } else {
        println!("OK: issued certificate {} to {}", cert.id(), cert.recipient_name());
    }
    Ok(0)
}

fn cmd_verify(verification: &Verification, json: bool) -> Result<u8> {
    let status = verification.status();
    if json {
        print_json(&serde_json::json!({
            "status": status,
            "certificate": verification.certificate(),
        }))?;
    } else {
        match verification.certificate() {
            Some(cert) => println!(
                "{}: {} for {} ({}, issued {})",
                status.as_str().to_uppercase(),
                cert.id(),
                cert.recipient_name(),
                cert.course_name(),
                cert.issue_date()
            ),
            None => println!("NOT FOUND"),
        }
    }
    Ok(match verification {
        Verification::Valid(_) => 0,
        Verification::Revoked(_) => EXIT_REVOKED,
        Verification::NotFound => EXIT_NOT_FOUND,
    })
}

fn cmd_revoke(
    registry: &Registry,
    id: &str,
    reason: &str,
    actor: Option<String>,
    json: bool,
) -> Result<u8> {
    let id = parse_id(id)?;
    let evidence = RevocationEvidence {
        reason: reason.to_string(),
        actor,
    };
    let (cert, outcome) = registry.revoke_with_outcome(&id, evidence)?;
    if json {
        print_json(&cert)?;
    } else if outcome == RevocationOutcome::AlreadyRevoked {
        println!("OK: certificate {id} was already revoked");
    } else {
        println!("OK: revoked certificate {id} ({reason})");
    }
    Ok(0)
}

fn cmd_list(certs: &[Certificate], json: bool) -> Result<u8> {
    if json {
        print_json(&certs)?;
        return Ok(0);
    }
    if certs.is_empty() {
        println!("No certificates found.");
        return Ok(0);
    }
    println!("Certificates ({}):", certs.len());
    for cert in certs {
        println!(
            "  {}  {:<7}  {}  {} / {}",
            cert.id(),
            cert.status().as_str(),
            cert.issue_date(),
            cert.recipient_name(),
            cert.course_name()
        );
    }
    Ok(0)
}

fn cmd_metadata(
    registry: &Registry,
    id: &str,
    set: &[String],
    unset: &[String],
    replace: bool,
    json: bool,
) -> Result<u8> {
    let id = parse_id(id)?;
    let mut entries = parse_entries(set)?;
    let update = if replace {
        MetadataUpdate::Replace(entries)
    } else {
        for key in unset {
            entries.insert(key.clone(), serde_json::Value::Null);
        }
        if entries.is_empty() {
            bail!("nothing to change: give --set or --unset");
        }
        MetadataUpdate::Merge(entries)
    };
    let cert = registry.update_metadata(&id, &update)?;
    if json {
        print_json(&cert)?;
    } else {
        println!("OK: certificate {id} now has {} metadata entries", cert.metadata().len());
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn options(dir: &Path) -> StoreOptions {
        StoreOptions {
            store: dir.join("certificates.json"),
            catalog: None,
        }
    }

    fn run(options: &StoreOptions, command: CertCommand) -> Result<u8> {
        run_cert(
            &CertArgs {
                json: false,
                command,
            },
            options,
        )
    }

    fn issue(options: &StoreOptions, recipient: &str, course: &str) -> CertificateId {
        run(
            options,
            CertCommand::Issue {
                recipient: recipient.into(),
                course: course.into(),
                date: None,
                metadata: vec!["grade=\"A\"".into(), "hours=40".into()],
            },
        )
        .unwrap();
        let registry = open_registry(options).unwrap();
        let certs = registry
            .list(&ListFilter {
                recipient: Some(recipient.into()),
                ..ListFilter::default()
            })
            .unwrap();
        certs[0].id().clone()
    }

    #[test]
    fn issue_persists_with_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let id = issue(&options, "Alice Smith", "Rust 101");

        let cert = open_registry(&options).unwrap().lookup(&id).unwrap();
        assert_eq!(cert.metadata().get("grade"), Some(&serde_json::json!("A")));
        assert_eq!(cert.metadata().get("hours"), Some(&serde_json::json!(40)));
    }

    #[test]
    fn verify_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let id = issue(&options, "Bob", "Go");
        let verify = |id: &str| {
            run(
                &options,
                CertCommand::Verify {
                    id: Some(id.into()),
                    recipient: None,
                    course: None,
                },
            )
            .unwrap()
        };

        assert_eq!(verify(id.as_str()), 0);
        assert_eq!(verify("nonexistent-id-1234"), EXIT_NOT_FOUND);

        run(
            &options,
            CertCommand::Revoke {
                id: id.to_string(),
                reason: "issued in error".into(),
                actor: Some("registrar".into()),
            },
        )
        .unwrap();
        assert_eq!(verify(id.as_str()), EXIT_REVOKED);
    }

    #[test]
    fn verify_by_recipient_and_course() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        issue(&options, "Carol King", "Rust 101");

        let code = run(
            &options,
            CertCommand::Verify {
                id: None,
                recipient: Some("carol king".into()),
                course: Some("RUST 101".into()),
            },
        )
        .unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn delete_leaves_revoked_record() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let id = issue(&options, "Dana", "Go");

        run(
            &options,
            CertCommand::Delete {
                id: id.to_string(),
                actor: None,
            },
        )
        .unwrap();

        let cert = open_registry(&options).unwrap().lookup(&id).unwrap();
        assert_eq!(cert.status(), CertificateStatus::Revoked);
        assert_eq!(cert.revocation().unwrap().reason, DELETION_REASON);
    }

    #[test]
    fn metadata_set_unset_and_replace() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let id = issue(&options, "Eve", "Rust 101");

        run(
            &options,
            CertCommand::Metadata {
                id: id.to_string(),
                set: vec!["mentor=Hal".into()],
                unset: vec!["hours".into()],
                replace: false,
            },
        )
        .unwrap();
        let cert = open_registry(&options).unwrap().lookup(&id).unwrap();
        assert_eq!(cert.metadata().get("mentor"), Some(&serde_json::json!("Hal")));
        assert_eq!(cert.metadata().get("hours"), None);
        assert_eq!(cert.metadata().len(), 2);

        run(
            &options,
            CertCommand::Metadata {
                id: id.to_string(),
                set: vec![],
                unset: vec![],
                replace: true,
            },
        )
        .unwrap();
        let cert = open_registry(&options).unwrap().lookup(&id).unwrap();
        assert!(cert.metadata().is_empty());
    }

    #[test]
    fn metadata_without_changes_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let id = issue(&options, "Finn", "Go");
        let result = run(
            &options,
            CertCommand::Metadata {
                id: id.to_string(),
                set: vec![],
                unset: vec![],
                replace: false,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn show_unknown_certificate_fails() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let result = run(
            &options,
            CertCommand::Show {
                id: "CERT-ABCDEF0123456789".into(),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn malformed_metadata_entry_is_rejected() {
        assert!(parse_entry("no-equals-sign").is_err());
        assert_eq!(
            parse_entry("score=9.5").unwrap(),
            ("score".to_string(), serde_json::json!(9.5))
        );
        assert_eq!(
            parse_entry("note=hello world").unwrap(),
            ("note".to_string(), serde_json::json!("hello world"))
        );
    }

    #[test]
    fn list_and_stats_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        issue(&options, "Gina", "Rust 101");
        issue(&options, "Hank", "Go");

        let code = run(
            &options,
            CertCommand::List {
                status: Some(CertificateStatus::Active),
                course: None,
                recipient: None,
                limit: Some(1),
            },
        )
        .unwrap();
        assert_eq!(code, 0);
        assert_eq!(run(&options, CertCommand::Stats).unwrap(), 0);
    }
}

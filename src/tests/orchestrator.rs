use super::{Orchestrator, RunResult, SectionOutcome, SectionReport};
use crate::document::{ConfigDocument, GroupId, SaveMode, SectionId};
use crate::error::{Error, Result};
use crate::fixtures::{provider, registry, write_config, FailingProvider, KEY, WEB_CONFIG};
use crate::processor::OperationMode;
use crate::providers::chacha::{LocalKeyProvider, DEFAULT_PROVIDER};
use crate::providers::{ProtectionProvider, ProviderError, ProviderRegistry};
use crate::resolver::SectionPath;
use std::fs;
use tempfile::TempDir;

struct Node {
    name: String,
    parent: Option<usize>,
    content: Vec<u8>,
    provider: Option<String>,
}

/// In-memory document that counts how often it is saved.
#[derive(Default)]
struct FakeDocument {
    nodes: Vec<Node>,
    forced: Vec<usize>,
    saves: usize,
}

impl FakeDocument {
    fn add(&mut self, name: &str, parent: Option<usize>) -> usize {
        self.nodes.push(Node {
            name: name.to_string(),
            parent,
            content: format!("<{name} />").into_bytes(),
            provider: None,
        });
        self.nodes.len() - 1
    }

    fn add_protected(&mut self, name: &str, parent: Option<usize>) -> usize {
        let index = self.add(name, parent);
        let node = &mut self.nodes[index];
        node.content = provider().protect(&node.content).unwrap();
        node.provider = Some(DEFAULT_PROVIDER.to_string());
        index
    }

    fn child(&self, parent: Option<usize>, name: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.parent == parent && n.name == name)
    }

    fn protected(&self, name: &str) -> bool {
        self.nodes
            .iter()
            .any(|n| n.name == name && n.provider.is_some())
    }
}

impl ConfigDocument for FakeDocument {
    fn top_level_section(&self, name: &str) -> Option<SectionId> {
        self.child(None, name).map(SectionId)
    }

    fn section_group(&self, name: &str) -> Option<GroupId> {
        self.child(None, name).map(GroupId)
    }

    fn nested_group(&self, group: GroupId, name: &str) -> Option<GroupId> {
        self.child(Some(group.0), name).map(GroupId)
    }

    fn group_section(&self, group: GroupId, name: &str) -> Option<SectionId> {
        self.child(Some(group.0), name).map(SectionId)
    }

    fn section_name(&self, section: SectionId) -> &str {
        &self.nodes[section.0].name
    }

    fn is_protected(&self, section: SectionId) -> bool {
        self.nodes[section.0].provider.is_some()
    }

    fn protection_provider(&self, section: SectionId) -> Option<String> {
        self.nodes[section.0].provider.clone()
    }

    fn protect(
        &mut self,
        section: SectionId,
        provider: &dyn ProtectionProvider,
    ) -> std::result::Result<(), ProviderError> {
        let node = &mut self.nodes[section.0];
        node.content = provider.protect(&node.content)?;
        node.provider = Some(provider.name().to_string());
        Ok(())
    }

    fn unprotect(
        &mut self,
        section: SectionId,
        provider: &dyn ProtectionProvider,
    ) -> std::result::Result<(), ProviderError> {
        let node = &mut self.nodes[section.0];
        node.content = provider.unprotect(&node.content)?;
        node.provider = None;
        Ok(())
    }

    fn mark_force_save(&mut self, section: SectionId) {
        self.forced.push(section.0);
    }

    fn save(&mut self, mode: SaveMode) -> Result<()> {
        assert_eq!(mode, SaveMode::Full);
        self.saves += 1;
        Ok(())
    }
}

fn orchestrator(paths: &[&str], providers: ProviderRegistry) -> Orchestrator {
    Orchestrator::new(
        paths.iter().map(|p| SectionPath::parse(p)).collect(),
        DEFAULT_PROVIDER,
        providers,
    )
}

fn outcomes(result: &RunResult) -> Vec<SectionOutcome> {
    result.sections.iter().map(|r| r.outcome).collect()
}

#[test]
fn test_encrypt_found_and_missing_sections() {
    let mut doc = FakeDocument::default();
    doc.add("appSettings", None);

    let result = orchestrator(&["appSettings", "dbSettings"], registry())
        .run_document(&mut doc, "-e")
        .unwrap();

    assert_eq!(
        result.sections,
        vec![
            SectionReport {
                path: "appSettings".to_string(),
                name: Some("appSettings".to_string()),
                outcome: SectionOutcome::Changed,
            },
            SectionReport {
                path: "dbSettings".to_string(),
                name: None,
                outcome: SectionOutcome::NotFound,
            },
        ]
    );
    assert_eq!(result.mode, Some(OperationMode::Encrypt));
    assert!(result.modified);
    assert!(result.persisted);
    assert_eq!(doc.saves, 1);
    assert!(doc.protected("appSettings"));
    assert_eq!(doc.forced, vec![0]);
}

#[test]
fn test_decrypt_nested_section() {
    let mut doc = FakeDocument::default();
    let net = doc.add("system.net", None);
    let mail = doc.add("mailSettings", Some(net));
    doc.add_protected("smtp", Some(mail));

    let result = orchestrator(&["system.net/mailSettings/smtp"], registry())
        .run_document(&mut doc, "-d")
        .unwrap();

    assert_eq!(outcomes(&result), vec![SectionOutcome::Changed]);
    assert!(result.modified);
    assert_eq!(doc.saves, 1);
    assert!(!doc.protected("smtp"));
    assert_eq!(doc.nodes[2].content, b"<smtp />");
}

#[test]
fn test_no_op_run_never_saves() {
    let mut doc = FakeDocument::default();
    doc.add_protected("appSettings", None);
    doc.add_protected("connectionStrings", None);

    let result = orchestrator(&["appSettings", "connectionStrings", "dbSettings"], registry())
        .run_document(&mut doc, "-e")
        .unwrap();

    assert_eq!(
        outcomes(&result),
        vec![
            SectionOutcome::AlreadyInState,
            SectionOutcome::AlreadyInState,
            SectionOutcome::NotFound,
        ]
    );
    assert!(!result.modified);
    assert!(!result.persisted);
    assert_eq!(doc.saves, 0);
}

#[test]
fn test_invalid_mode_reported_per_section() {
    let mut doc = FakeDocument::default();
    doc.add("appSettings", None);

    let result = orchestrator(&["appSettings", "dbSettings"], registry())
        .run_document(&mut doc, "-x")
        .unwrap();

    assert_eq!(result.mode, None);
    assert_eq!(
        outcomes(&result),
        vec![SectionOutcome::InvalidMode, SectionOutcome::NotFound]
    );
    assert!(!result.modified);
    assert_eq!(doc.saves, 0);
    assert!(!doc.protected("appSettings"));
}

#[test]
fn test_provider_failure_aborts_before_saving() {
    let mut doc = FakeDocument::default();
    doc.add("appSettings", None);
    doc.add("connectionStrings", None);
    let mut providers = ProviderRegistry::new();
    providers.register(Box::new(FailingProvider));

    let err = orchestrator(&["appSettings", "connectionStrings"], providers)
        .run_document(&mut doc, "-e")
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Provider {
            source: ProviderError::Encrypt,
            ..
        }
    ));
    assert_eq!(doc.saves, 0);
}

#[test]
fn test_missing_provider_aborts_before_saving() {
    let mut doc = FakeDocument::default();
    doc.add("appSettings", None);

    let err = orchestrator(&["appSettings"], ProviderRegistry::new())
        .run_document(&mut doc, "-e")
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Provider {
            source: ProviderError::Unavailable(_),
            ..
        }
    ));
    assert_eq!(doc.saves, 0);
}

#[test]
fn test_dry_run_never_saves() {
    let mut doc = FakeDocument::default();
    doc.add("appSettings", None);

    let result = orchestrator(&["appSettings"], registry())
        .dry_run(true)
        .run_document(&mut doc, "-e")
        .unwrap();

    assert!(result.modified);
    assert!(!result.persisted);
    assert_eq!(doc.saves, 0);
}

#[test]
fn test_repeated_path_is_not_processed_twice() {
    let mut doc = FakeDocument::default();
    doc.add("appSettings", None);

    let result = orchestrator(&["appSettings", "/appSettings/"], registry())
        .run_document(&mut doc, "-e")
        .unwrap();

    assert_eq!(
        outcomes(&result),
        vec![SectionOutcome::Changed, SectionOutcome::AlreadyInState]
    );
    assert_eq!(doc.saves, 1);
    assert_eq!(doc.forced, vec![0]);
}

#[test]
fn test_order_does_not_affect_final_state() {
    let build = || {
        let mut doc = FakeDocument::default();
        doc.add("appSettings", None);
        doc.add_protected("connectionStrings", None);
        let net = doc.add("system.net", None);
        doc.add("smtp", Some(net));
        doc
    };
    let paths = ["appSettings", "connectionStrings", "system.net/smtp"];
    let reversed = ["system.net/smtp", "connectionStrings", "appSettings"];

    let mut forward = build();
    orchestrator(&paths, registry())
        .run_document(&mut forward, "-e")
        .unwrap();
    let mut backward = build();
    orchestrator(&reversed, registry())
        .run_document(&mut backward, "-e")
        .unwrap();

    for name in ["appSettings", "connectionStrings", "smtp"] {
        assert!(forward.protected(name), "{name}");
        assert!(backward.protected(name), "{name}");
    }
    assert_eq!(forward.saves, 1);
    assert_eq!(backward.saves, 1);
}

#[test]
fn test_run_on_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), WEB_CONFIG);
    let paths = [
        "appSettings",
        "connectionStrings",
        "dbSettings",
        "crmSettings",
        "system.net/mailSettings/smtp",
    ];

    let (result, _) = orchestrator(&paths, registry()).run(&path, "-e").unwrap();
    assert_eq!(
        outcomes(&result),
        vec![
            SectionOutcome::Changed,
            SectionOutcome::Changed,
            SectionOutcome::NotFound,
            SectionOutcome::NotFound,
            SectionOutcome::Changed,
        ]
    );
    assert!(result.persisted);
    let protected = fs::read_to_string(&path).unwrap();
    for secret in ["s3cr3t", "hunter2", "mailpass"] {
        assert!(!protected.contains(secret), "{secret} leaked");
    }

    // A second encrypt has nothing to do and leaves the file alone.
    let (again, _) = orchestrator(&paths, registry()).run(&path, "-e").unwrap();
    assert!(!again.modified);
    assert_eq!(fs::read_to_string(&path).unwrap(), protected);

    let (result, _) = orchestrator(&paths, registry()).run(&path, "-d").unwrap();
    assert!(result.persisted);
    assert_eq!(fs::read_to_string(&path).unwrap(), WEB_CONFIG);
}

#[test]
fn test_run_on_file_failure_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), WEB_CONFIG);

    let err = orchestrator(&["appSettings", "connectionStrings"], ProviderRegistry::new())
        .run(&path, "-e")
        .unwrap_err();

    assert!(matches!(err, Error::Provider { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), WEB_CONFIG);
}

#[test]
fn test_provider_name_that_breaks_markup_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), WEB_CONFIG);

    for name in ["Ops\"Key", "R&D"] {
        let mut providers = ProviderRegistry::new();
        providers.register(Box::new(LocalKeyProvider::new(name, KEY)));
        let err = Orchestrator::new(vec![SectionPath::parse("appSettings")], name, providers)
            .run(&path, "-e")
            .unwrap_err();

        assert!(
            matches!(
                err,
                Error::Provider {
                    source: ProviderError::InvalidName(_),
                    ..
                }
            ),
            "name {name:?}"
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), WEB_CONFIG);
    }

    // Still a usable file afterwards.
    let (result, _) = orchestrator(&["appSettings"], registry()).run(&path, "-e").unwrap();
    assert!(result.persisted);
}

#[test]
fn test_dry_run_on_file_keeps_pending_edits() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), WEB_CONFIG);

    let (result, document) = orchestrator(&["appSettings"], registry())
        .dry_run(true)
        .run(&path, "-e")
        .unwrap();

    assert!(result.modified);
    assert!(!result.persisted);
    assert_eq!(document.edit_plan().edits.len(), 1);
    assert_eq!(fs::read_to_string(&path).unwrap(), WEB_CONFIG);
}

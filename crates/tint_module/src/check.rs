//! Completeness validation of interface records
//!
//! Every record passes a version gate and a kind-specific predicate before
//! it becomes selectable:
//!
//! ```text
//!   Unvalidated ──check──► Valid(kind)
//!        │
//!        └──────────────► Rejected   (logged with kind, registration and
//!                                     version / module api / host api)
//! ```
//!
//! Checking is pure. The registry records the outcome on the record and
//! re-runs the check on every load.

use crate::api::{Api, ApiHeader, ApiKind, ApiPayload, META_LOADER_TAG, OBSOLETE_TAGS};
use crate::interfaces::CONTEXT_TYPE_MAX;
use crate::ui::ModuleUi;
use std::fmt;
use tint_core::object::NameType;
use tint_core::version::{api_compat, ApiCompat};
use tint_core::{Version, HOST_API_VERSION};

/// Validation state of an interface record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Validation {
    Unvalidated,
    Valid(ApiKind),
    Rejected,
}

/// One reason a record failed validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckIssue {
    /// Tag no host version implements
    UnknownTag(u32),
    /// Tag of an interface retired by an older API break
    ObsoleteTag(u32),
    /// Meta loader records are not loaded by this host
    MetaLoader,
    ModuleApi(ApiCompat),
    EmptyRegistration,
    ZeroVersion,
    /// Required hook or field absent
    Missing(&'static str),
    ContextTypeTooLong(usize),
    /// Neither plugs nor sockets declare a usable connector
    NoConnectors,
    UiModuleApi(ApiCompat),
}

impl fmt::Display for CheckIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckIssue::UnknownTag(tag) => write!(f, "unknown interface tag {}", tag),
            CheckIssue::ObsoleteTag(tag) => write!(f, "obsolete interface tag {}", tag),
            CheckIssue::MetaLoader => f.write_str("meta loader interfaces are not supported"),
            CheckIssue::ModuleApi(compat) => write!(f, "module api {:?}", compat),
            CheckIssue::EmptyRegistration => f.write_str("empty registration"),
            CheckIssue::ZeroVersion => f.write_str("version is 0.0.0"),
            CheckIssue::Missing(what) => write!(f, "missing {}", what),
            CheckIssue::ContextTypeTooLong(len) => {
                write!(f, "context type has {} bytes, at most {}", len, CONTEXT_TYPE_MAX)
            }
            CheckIssue::NoConnectors => f.write_str("no plug or socket connectors"),
            CheckIssue::UiModuleApi(compat) => write!(f, "ui module api {:?}", compat),
        }
    }
}

/// Structured diagnostic of a rejected record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    pub kind: Option<ApiKind>,
    pub tag: u32,
    pub registration: String,
    pub version: Version,
    pub module_api: Version,
    pub host: Version,
    pub issues: Vec<CheckIssue>,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "{} interface", kind)?,
            None => write!(f, "interface tag {}", self.tag)?,
        }
        write!(
            f,
            " '{}' rejected (version {}, module api {}, host api {})",
            self.registration, self.version, self.module_api, self.host
        )?;
        for (i, issue) in self.issues.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { "; " })?;
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for Rejection {}

/// Validate against the current host API
pub fn check(api: &Api) -> Option<ApiKind> {
    check_against(api, HOST_API_VERSION).ok()
}

/// Validate against `host`, logging a warning on rejection
pub fn check_against(api: &Api, host: Version) -> Result<ApiKind, Rejection> {
    let found = issues(api.header(), api.payload(), host);
    match api.kind() {
        Some(kind) if found.is_empty() => Ok(kind),
        kind => {
            let rejection = Rejection {
                kind,
                tag: api.payload().tag(),
                registration: api.registration().to_string(),
                version: api.header().version,
                module_api: api.header().module_api,
                host,
                issues: found,
            };
            log::warn!("{}", rejection);
            Err(rejection)
        }
    }
}

/// Everything wrong with a record, empty when it is complete
pub fn issues(header: &ApiHeader, payload: &ApiPayload, host: Version) -> Vec<CheckIssue> {
    let mut found = Vec::new();

    if let ApiPayload::Unsupported { tag } = payload {
        found.push(if OBSOLETE_TAGS.contains(tag) {
            CheckIssue::ObsoleteTag(*tag)
        } else if *tag == META_LOADER_TAG {
            CheckIssue::MetaLoader
        } else {
            CheckIssue::UnknownTag(*tag)
        });
        return found;
    }

    match api_compat(header.module_api, host) {
        ApiCompat::Compatible => {}
        compat => {
            found.push(CheckIssue::ModuleApi(compat));
            return found;
        }
    }

    // Tag codecs are looked up by signature, not by registration
    if !matches!(payload, ApiPayload::ProfileTag(_)) {
        header_issues(header, &mut found);
    }

    match payload {
        ApiPayload::ProfileTag(p) => {
            if p.codec.is_none() {
                found.push(CheckIssue::Missing("tag codec"));
            }
        }
        ApiPayload::ContextBuilder(p) => {
            if p.context_type.len() > CONTEXT_TYPE_MAX {
                found.push(CheckIssue::ContextTypeTooLong(p.context_type.len()));
            }
            if !p.context_type.is_empty() && p.builder.is_none() {
                found.push(CheckIssue::Missing("context builder"));
            }
            match &p.ui {
                Some(ui) => ui_issues(ui, host, &mut found),
                None => found.push(CheckIssue::Missing("ui descriptor")),
            }
        }
        ApiPayload::DataConvert(p) => {
            if p.data_in.is_empty() {
                found.push(CheckIssue::Missing("input data types"));
            }
            if p.data_out.is_empty() {
                found.push(CheckIssue::Missing("output data types"));
            }
            if p.converter.is_none() {
                found.push(CheckIssue::Missing("converter"));
            }
        }
        ApiPayload::DataProcessing(p) => {
            if p.run.is_none() {
                found.push(CheckIssue::Missing("run function"));
            }
            if !p.plugs.is_usable() && !p.sockets.is_usable() {
                found.push(CheckIssue::NoConnectors);
            }
        }
        ApiPayload::DeviceConfig(p) => {
            if p.backend.is_none() {
                found.push(CheckIssue::Missing("device backend"));
            }
            if p.rank_map.is_empty() {
                found.push(CheckIssue::Missing("rank map"));
            }
            if let Some(ui) = &p.ui {
                ui_issues(ui, host, &mut found);
            }
        }
        ApiPayload::Policy(p) => {
            if p.pattern.is_empty() {
                found.push(CheckIssue::Missing("base pattern"));
            }
            if let Some(ui) = &p.ui {
                if !ui.options().is_empty() {
                    if ui.validator.is_none() {
                        found.push(CheckIssue::Missing("options validator"));
                    }
                    if ui.ui_getter.is_none() {
                        found.push(CheckIssue::Missing("ui getter"));
                    }
                    if ui.widget_event.is_none() {
                        found.push(CheckIssue::Missing("widget event hook"));
                    }
                }
                name_text_issues(ui, &mut found);
            }
        }
        ApiPayload::DataExchange(p) => {
            if p.handler.is_none() {
                found.push(CheckIssue::Missing("exchange handler"));
            }
            if let Some(ui) = &p.ui {
                name_text_issues(ui, &mut found);
            }
        }
        ApiPayload::Unsupported { .. } => {}
    }

    found
}

fn header_issues(header: &ApiHeader, found: &mut Vec<CheckIssue>) {
    if header.registration.is_empty() {
        found.push(CheckIssue::EmptyRegistration);
    }
    if header.version.is_zero() {
        found.push(CheckIssue::ZeroVersion);
    }
}

/// Declared texts require a getter answering "name"
fn name_text_issues(ui: &ModuleUi, found: &mut Vec<CheckIssue>) {
    if !ui.texts().is_empty() && !has_name_text(ui) {
        found.push(CheckIssue::Missing("name text"));
    }
}

fn has_name_text(ui: &ModuleUi) -> bool {
    ui.text("name", NameType::Name)
        .is_some_and(|name| !name.is_empty())
}

fn ui_issues(ui: &ModuleUi, host: Version, found: &mut Vec<CheckIssue>) {
    match api_compat(ui.module_api(), host) {
        ApiCompat::Compatible => {}
        compat => found.push(CheckIssue::UiModuleApi(compat)),
    }
    if !has_name_text(ui) {
        found.push(CheckIssue::Missing("name text"));
    }
    if ui.category().is_empty() {
        found.push(CheckIssue::Missing("ui category"));
    }
    if !ui.options().is_empty() && ui.ui_getter.is_none() {
        found.push(CheckIssue::Missing("ui getter"));
    }
    if ui.validator.is_some() && ui.widget_event.is_none() {
        found.push(CheckIssue::Missing("widget event hook"));
    }
}

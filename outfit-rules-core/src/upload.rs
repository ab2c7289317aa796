//! Upload routine: writes every rule of a rule set into a collection.
//!
//! Rules are inserted strictly in file order, one awaited call per rule, with
//! no batching and no transaction. A progress line is written after each
//! successful insert. What happens on a failure is chosen by the caller via
//! [`ErrorPolicy`]:
//!
//! - [`ErrorPolicy::AbortOnFirst`] returns the first failure as an
//!   [`UploadError`], which records how many documents were already written.
//! - [`ErrorPolicy::ContinueOnError`] records the failure in the
//!   [`UploadReport`] and moves on to the next rule.
//!
//! Failing to write a progress line stops the run under either policy.
//!
//! A rule without `min_temp`/`max_temp` is rejected before its insert call,
//! so it never reaches the store. Documents written before a failure stay
//! in the collection; running the same upload twice writes every rule twice.

use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::collection::CollectionId;
use crate::contract::{DocumentStore, StoreError, StoredDocument};
use crate::output::{write_dry_run_progress, write_progress};
use crate::rule::{Rule, RuleError};

/// What to do when a single rule fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    #[default]
    AbortOnFirst,
    ContinueOnError,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("rule {index} cannot be uploaded ({inserted} rules already inserted): {source}")]
    Rule {
        index: usize,
        inserted: usize,
        #[source]
        source: RuleError,
    },

    #[error("insert of rule {index} failed ({inserted} rules already inserted): {source}")]
    Store {
        index: usize,
        inserted: usize,
        #[source]
        source: StoreError,
    },

    #[error("failed to write progress for rule {index} ({inserted} rules already inserted): {source}")]
    Output {
        index: usize,
        inserted: usize,
        #[source]
        source: io::Error,
    },
}

impl UploadError {
    /// Number of documents written before the run stopped.
    pub fn inserted(&self) -> usize {
        match self {
            UploadError::Rule { inserted, .. }
            | UploadError::Store { inserted, .. }
            | UploadError::Output { inserted, .. } => *inserted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InsertedRule {
    pub index: usize,
    pub document: StoredDocument,
}

#[derive(Debug, Clone)]
pub struct RuleFailure {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct UploadReport {
    pub attempted: usize,
    pub inserted: Vec<InsertedRule>,
    pub failures: Vec<RuleFailure>,
}

impl UploadReport {
    /// True when every rule became a document.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.inserted.len() == self.attempted
    }
}

enum Failure {
    Rule(RuleError),
    Store(StoreError),
}

impl Failure {
    fn into_error(self, index: usize, inserted: usize) -> UploadError {
        match self {
            Failure::Rule(source) => UploadError::Rule {
                index,
                inserted,
                source,
            },
            Failure::Store(source) => UploadError::Store {
                index,
                inserted,
                source,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            Failure::Rule(e) => e.to_string(),
            Failure::Store(e) => e.to_string(),
        }
    }
}

/// Inserts every rule into `collection`, writing one progress line to `out`
/// per inserted rule.
pub async fn upload_rules<S, W>(
    store: &S,
    collection: &CollectionId,
    rules: &[Rule],
    policy: ErrorPolicy,
    out: &mut W,
) -> Result<UploadReport, UploadError>
where
    S: DocumentStore + ?Sized,
    W: Write + ?Sized,
{
    info!(
        collection = %collection,
        rules = rules.len(),
        ?policy,
        "[UPLOAD] Starting rule upload"
    );

    let mut report = UploadReport {
        attempted: rules.len(),
        ..UploadReport::default()
    };

    for (index, rule) in rules.iter().enumerate() {
        match insert_one(store, collection, rule).await {
            Ok((range, document)) => {
                debug!(index, document_id = %document.id, "[UPLOAD] add_document succeeded");
                report.inserted.push(InsertedRule { index, document });
                // The document is already stored, so it counts as inserted.
                write_progress(out, &range).map_err(|source| {
                    let inserted = report.inserted.len();
                    error!(index, inserted, error = ?source, "[UPLOAD][ERROR] Progress output failed");
                    UploadError::Output {
                        index,
                        inserted,
                        source,
                    }
                })?;
            }
            Err(failure) => {
                let inserted = report.inserted.len();
                match policy {
                    ErrorPolicy::AbortOnFirst => {
                        let err = failure.into_error(index, inserted);
                        error!(index, inserted, error = %err, "[UPLOAD][ERROR] Aborting upload");
                        return Err(err);
                    }
                    ErrorPolicy::ContinueOnError => {
                        let message = failure.message();
                        warn!(index, error = %message, "[UPLOAD] Rule failed, continuing");
                        report.failures.push(RuleFailure { index, message });
                    }
                }
            }
        }
    }

    info!(
        inserted = report.inserted.len(),
        failed = report.failures.len(),
        "[UPLOAD] Rule upload finished"
    );
    Ok(report)
}

async fn insert_one<S>(
    store: &S,
    collection: &CollectionId,
    rule: &Rule,
) -> Result<(crate::rule::TempRange, StoredDocument), Failure>
where
    S: DocumentStore + ?Sized,
{
    let range = rule.temp_range().map_err(Failure::Rule)?;
    let document = store
        .add_document(collection, rule.fields())
        .await
        .map_err(Failure::Store)?;
    Ok((range, document))
}

/// Checks every rule the way [`upload_rules`] would and writes a "Would add"
/// line for each, without touching any store. Returns the number of rules.
pub fn preview_rules<W>(rules: &[Rule], out: &mut W) -> Result<usize, UploadError>
where
    W: Write + ?Sized,
{
    for (index, rule) in rules.iter().enumerate() {
        let range = rule.temp_range().map_err(|source| UploadError::Rule {
            index,
            inserted: 0,
            source,
        })?;
        write_dry_run_progress(out, &range).map_err(|source| UploadError::Output {
            index,
            inserted: 0,
            source,
        })?;
    }
    info!(rules = rules.len(), "[DRY-RUN] All rules checked");
    Ok(rules.len())
}

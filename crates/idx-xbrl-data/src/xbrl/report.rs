//! Turning an extracted document set into a [`FinancialReport`].

use super::concepts::{LineItem, dei, is_mapped};
use super::instance::{XbrlContext, XbrlFact, XbrlInstance};
use super::numeric::parse_decimal;
use crate::error::{DataError, Result};
use crate::model::{
    DownloadedArchive, ExtractedDocuments, FinancialReport, LineItems, PeriodKind,
    ReportingPeriod, SourceMetadata,
};
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

/// Archive facts carried into the record metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSource {
    /// URL the archive was downloaded from
    pub source_url: Url,
    /// Archive size in bytes
    pub archive_size_bytes: u64,
}

impl From<&DownloadedArchive> for ReportSource {
    fn from(archive: &DownloadedArchive) -> Self {
        Self {
            source_url: archive.source_url.clone(),
            archive_size_bytes: archive.size_bytes,
        }
    }
}

/// Values read from one instance, before provenance is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Reporting period
    pub period: ReportingPeriod,
    /// ISO 4217 code of the total-assets unit
    pub currency: String,
    /// Line items
    pub items: LineItems,
    /// `EntityName` fact
    pub entity_name: Option<String>,
    /// `EntityCode` fact
    pub entity_code: Option<String>,
    /// Facts in the instance
    pub fact_count: usize,
    /// Facts matching no line item or metadata concept
    pub unmapped_fact_count: usize,
}

/// Parse the extracted files of one archive into a record.
///
/// # Errors
/// - [`DataError::NoInstanceDocument`] when no file has an `xbrl` root
/// - [`DataError::MissingFact`] / [`DataError::MalformedFact`] for total assets
/// - [`DataError::XmlParse`] when the chosen instance is not well formed
pub fn parse_report(
    documents: &ExtractedDocuments,
    source: &ReportSource,
) -> Result<FinancialReport> {
    let instance_path = select_instance(&documents.files)?;
    debug!(
        ticker = %documents.ticker,
        instance = %instance_path.display(),
        "selected instance document"
    );

    let instance = XbrlInstance::parse_file(&instance_path)?;
    let statement = extract_statement(&instance)?;

    let taxonomy_filename = documents
        .files
        .iter()
        .find(|p| has_extension(p, "xsd"))
        .and_then(|p| file_name(p));

    let report = FinancialReport {
        ticker: documents.ticker.clone(),
        period: statement.period,
        currency: statement.currency,
        items: statement.items,
        metadata: SourceMetadata {
            source_url: source.source_url.to_string(),
            instance_filename: file_name(&instance_path).unwrap_or_default(),
            taxonomy_filename,
            instance_size_bytes: std::fs::metadata(&instance_path)?.len(),
            archive_size_bytes: source.archive_size_bytes,
            entity_name: statement.entity_name,
            entity_code: statement.entity_code,
            fact_count: statement.fact_count,
            unmapped_fact_count: statement.unmapped_fact_count,
            processed_at: Utc::now(),
        },
    };

    info!(
        ticker = %report.ticker,
        period = %report.period.label,
        facts = report.metadata.fact_count,
        unmapped = report.metadata.unmapped_fact_count,
        "parsed report"
    );
    Ok(report)
}

/// Pick the instance document among extracted files.
///
/// Candidates are ranked `instance.xbrl`, `instance.xml`, `*.xbrl`, `*.xml`
/// (paths sorted within a rank). The first whose root element is `xbrl` wins;
/// any others are ignored.
pub fn select_instance(files: &[PathBuf]) -> Result<PathBuf> {
    let mut candidates: Vec<(u8, &PathBuf)> = files
        .iter()
        .filter_map(|p| instance_rank(p).map(|rank| (rank, p)))
        .collect();
    candidates.sort();

    for (_, path) in candidates {
        match XbrlInstance::is_instance_file(path) {
            Ok(true) => return Ok(path.clone()),
            Ok(false) => debug!(path = %path.display(), "not an XBRL instance"),
            Err(e) => debug!(path = %path.display(), error = %e, "unreadable instance candidate"),
        }
    }
    Err(DataError::NoInstanceDocument(files.len()))
}

fn instance_rank(path: &Path) -> Option<u8> {
    let name = file_name(path)?.to_ascii_lowercase();
    match name.as_str() {
        "instance.xbrl" => Some(0),
        "instance.xml" => Some(1),
        _ if name.ends_with(".xbrl") => Some(2),
        _ if name.ends_with(".xml") => Some(3),
        _ => None,
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

/// Read the line items of a parsed instance.
pub fn extract_statement(instance: &XbrlInstance) -> Result<Statement> {
    let period_end = period_end(instance)?;

    let Some((assets, _)) = select_fact(instance, LineItem::TotalAssets, period_end) else {
        return Err(DataError::MissingFact(format!(
            "total assets for period ending {period_end}"
        )));
    };
    let total_assets = parse_decimal(&assets.value).ok_or_else(|| DataError::MalformedFact {
        concept: assets.concept.clone(),
        reason: format!("unparsable value {:?}", assets.value),
    })?;
    let currency = currency_of(instance, assets)?;

    let mut items = LineItems {
        total_assets,
        ..Default::default()
    };
    let mut duration_days = None;

    for item in LineItem::ALL.into_iter().skip(1) {
        let Some((fact, context)) = select_fact(instance, item, period_end) else {
            continue;
        };
        let value = parse_decimal(&fact.value);
        if value.is_none() {
            warn!(
                concept = %fact.concept,
                value = %fact.value,
                "dropping unparsable {}",
                item.field_name()
            );
        }
        item.assign(&mut items, value);

        if matches!(item, LineItem::Revenue | LineItem::NetIncome) && duration_days.is_none() {
            duration_days = context.period.duration_days();
        }
    }

    let kind = duration_days.map_or(PeriodKind::Unknown, PeriodKind::from_duration_days);

    Ok(Statement {
        period: ReportingPeriod::ending(period_end, kind),
        currency,
        items,
        entity_name: instance.text_fact(dei::ENTITY_NAME).map(str::to_string),
        entity_code: instance.text_fact(dei::ENTITY_CODE).map(str::to_string),
        fact_count: instance.facts.len(),
        unmapped_fact_count: instance
            .facts
            .iter()
            .filter(|f| !is_mapped(&f.local_name))
            .count(),
    })
}

/// `CurrentPeriodEndDate`, else the latest date among total-assets facts.
fn period_end(instance: &XbrlInstance) -> Result<NaiveDate> {
    if let Some(raw) = instance.text_fact(dei::CURRENT_PERIOD_END_DATE) {
        match NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d") {
            Ok(date) => return Ok(date),
            Err(e) => warn!(value = raw, error = %e, "ignoring unparsable period end date"),
        }
    }

    LineItem::TotalAssets
        .concepts()
        .iter()
        .flat_map(|concept| primary_facts(instance, concept))
        .filter_map(|(_, context)| context.period.end())
        .max()
        .ok_or_else(|| DataError::MissingFact("total assets".to_string()))
}

/// Non-nil facts named `local_name` in contexts without dimensions.
fn primary_facts<'a>(
    instance: &'a XbrlInstance,
    local_name: &'a str,
) -> impl Iterator<Item = (&'a XbrlFact, &'a XbrlContext)> {
    instance
        .facts_named(local_name)
        .filter(|f| !f.is_nil && !f.value.is_empty())
        .filter_map(|f| {
            instance
                .context(&f.context_ref)
                .filter(|c| !c.has_dimensions)
                .map(|c| (f, c))
        })
}

/// Best fact for `item` ending on `period_end`.
///
/// Candidate concepts are tried in order. Within one concept an instant wins
/// over any duration, and a longer duration over a shorter one.
fn select_fact(
    instance: &XbrlInstance,
    item: LineItem,
    period_end: NaiveDate,
) -> Option<(&XbrlFact, &XbrlContext)> {
    item.concepts().iter().find_map(|concept| {
        primary_facts(instance, concept)
            .filter(|(_, context)| context.period.end() == Some(period_end))
            .max_by_key(|(_, context)| {
                if context.period.is_instant() {
                    i64::MAX
                } else {
                    context.period.duration_days().unwrap_or(0)
                }
            })
    })
}

fn currency_of(instance: &XbrlInstance, fact: &XbrlFact) -> Result<String> {
    let malformed = |reason: &str| DataError::MalformedFact {
        concept: fact.concept.clone(),
        reason: reason.to_string(),
    };

    let unit_ref = fact.unit_ref.as_deref().ok_or_else(|| malformed("no unit"))?;
    let unit = instance
        .unit(unit_ref)
        .ok_or_else(|| malformed(&format!("unknown unit {unit_ref}")))?;
    if unit.measure.is_empty() || unit.measure.contains('/') {
        return Err(malformed(&format!("not a currency unit: {}", unit.measure)));
    }
    Ok(unit.measure.clone())
}

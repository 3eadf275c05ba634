//! Streaming reader for XBRL instance documents.
//!
//! Collects contexts, units and every element carrying a `contextRef`
//! attribute. Concepts keep the prefix used in the document
//! (`idx-cor:Assets`); lookups go through the local name.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Period a context applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextPeriod {
    /// Point in time (balance sheet items)
    Instant(NaiveDate),
    /// Span of time (income and cash flow items)
    Duration {
        /// First day
        start: NaiveDate,
        /// Last day
        end: NaiveDate,
    },
    /// No period (rare, used for static facts)
    Forever,
}

impl ContextPeriod {
    /// Last day covered, if any.
    pub const fn end(&self) -> Option<NaiveDate> {
        match self {
            Self::Instant(date) => Some(*date),
            Self::Duration { end, .. } => Some(*end),
            Self::Forever => None,
        }
    }

    /// Length in days for duration periods.
    pub fn duration_days(&self) -> Option<i64> {
        match self {
            Self::Duration { start, end } => Some(end.signed_duration_since(*start).num_days()),
            _ => None,
        }
    }

    /// Returns true for point-in-time periods.
    pub const fn is_instant(&self) -> bool {
        matches!(self, Self::Instant(_))
    }
}

/// An `xbrli:context` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XbrlContext {
    /// Context id referenced by facts
    pub id: String,
    /// Entity identifier
    pub entity: Option<String>,
    /// Reporting period
    pub period: ContextPeriod,
    /// Whether the context carries a segment or scenario qualifier
    pub has_dimensions: bool,
}

/// An `xbrli:unit` element, reduced to its measure (`IDR`, `IDR/shares`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XbrlUnit {
    /// Unit id referenced by facts
    pub id: String,
    /// Measure without namespace prefix; numerator/denominator for divides
    pub measure: String,
}

/// A reported fact, value kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XbrlFact {
    /// Qualified concept name as written (e.g. "idx-cor:Assets")
    pub concept: String,
    /// Concept name without prefix (e.g. "Assets")
    pub local_name: String,
    /// Context id
    pub context_ref: String,
    /// Unit id, for numeric facts
    pub unit_ref: Option<String>,
    /// Declared precision
    pub decimals: Option<String>,
    /// Trimmed text content
    pub value: String,
    /// Whether the fact is `xsi:nil="true"`
    pub is_nil: bool,
}

/// Parsed XBRL instance document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XbrlInstance {
    /// Contexts by id
    pub contexts: HashMap<String, XbrlContext>,
    /// Units by id
    pub units: HashMap<String, XbrlUnit>,
    /// Facts in document order
    pub facts: Vec<XbrlFact>,
}

impl XbrlInstance {
    /// Parse an instance held in memory.
    pub fn parse_str(xml: &str) -> Result<Self> {
        Self::parse_reader(Reader::from_str(xml))
    }

    /// Parse an instance file.
    pub fn parse_file(path: &Path) -> Result<Self> {
        Self::parse_reader(Reader::from_file(path)?)
    }

    fn parse_reader<R: BufRead>(mut reader: Reader<R>) -> Result<Self> {
        reader.config_mut().trim_text(true);

        let mut builder = InstanceBuilder::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => builder.open(&e)?,
                Event::Empty(e) => {
                    builder.open(&e)?;
                    builder.close(e.local_name().as_ref())?;
                }
                Event::End(e) => builder.close(e.local_name().as_ref())?,
                Event::Text(t) => builder.push_text(&t.unescape()?),
                Event::CData(c) => builder.push_text(&String::from_utf8_lossy(&c.into_inner())),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        builder.finish()
    }

    /// Whether the file's root element is `xbrl`.
    pub fn is_instance_file(path: &Path) -> Result<bool> {
        let mut reader = Reader::from_file(path)?;
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => {
                    return Ok(e.local_name().as_ref() == b"xbrl");
                }
                Event::Eof => return Ok(false),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Look up a context by id.
    pub fn context(&self, id: &str) -> Option<&XbrlContext> {
        self.contexts.get(id)
    }

    /// Look up a unit by id.
    pub fn unit(&self, id: &str) -> Option<&XbrlUnit> {
        self.units.get(id)
    }

    /// All facts with the given local name.
    pub fn facts_named<'a, 'n>(
        &'a self,
        local_name: &'n str,
    ) -> impl Iterator<Item = &'a XbrlFact> + use<'a, 'n> {
        self.facts.iter().filter(move |f| f.local_name == local_name)
    }

    /// Value of the first non-nil, non-empty fact with the given local name.
    pub fn text_fact(&self, local_name: &str) -> Option<&str> {
        self.facts
            .iter()
            .find(|f| f.local_name == local_name && !f.is_nil && !f.value.is_empty())
            .map(|f| f.value.as_str())
    }
}

/// Which context/unit child element text belongs to.
#[derive(Debug, Clone, Copy)]
enum Leaf {
    Identifier,
    Instant,
    StartDate,
    EndDate,
    Measure,
}

#[derive(Debug, Default)]
struct ContextBuilder {
    id: String,
    entity: Option<String>,
    instant: Option<NaiveDate>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    forever: bool,
    has_dimensions: bool,
}

impl ContextBuilder {
    fn build(self) -> Result<XbrlContext> {
        let period = match (self.instant, self.start, self.end) {
            (Some(date), _, _) => ContextPeriod::Instant(date),
            (None, Some(start), Some(end)) => ContextPeriod::Duration { start, end },
            _ if self.forever => ContextPeriod::Forever,
            _ => {
                return Err(DataError::XmlParse(format!(
                    "context {} has no usable period",
                    self.id
                )));
            }
        };
        Ok(XbrlContext {
            id: self.id,
            entity: self.entity,
            period,
            has_dimensions: self.has_dimensions,
        })
    }
}

#[derive(Debug, Default)]
struct UnitBuilder {
    id: String,
    measures: Vec<String>,
}

#[derive(Debug)]
struct FactBuilder {
    concept: String,
    context_ref: String,
    unit_ref: Option<String>,
    decimals: Option<String>,
    is_nil: bool,
    /// Open child elements inside the fact
    nested: usize,
}

#[derive(Debug, Default)]
struct InstanceBuilder {
    instance: XbrlInstance,
    seen_root: bool,
    context: Option<ContextBuilder>,
    unit: Option<UnitBuilder>,
    fact: Option<FactBuilder>,
    leaf: Option<Leaf>,
    text: String,
}

impl InstanceBuilder {
    fn open(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let local = e.local_name();
        let local = local.as_ref();

        if !self.seen_root {
            if local != b"xbrl" {
                return Err(DataError::XmlParse(format!(
                    "root element is <{}>, expected <xbrl>",
                    String::from_utf8_lossy(local)
                )));
            }
            self.seen_root = true;
            return Ok(());
        }

        if let Some(fact) = &mut self.fact {
            fact.nested += 1;
            return Ok(());
        }

        if let Some(context) = &mut self.context {
            match local {
                b"identifier" => self.leaf = Some(Leaf::Identifier),
                b"instant" => self.leaf = Some(Leaf::Instant),
                b"startDate" => self.leaf = Some(Leaf::StartDate),
                b"endDate" => self.leaf = Some(Leaf::EndDate),
                b"forever" => context.forever = true,
                b"segment" | b"scenario" => context.has_dimensions = true,
                _ => {}
            }
            self.text.clear();
            return Ok(());
        }

        if self.unit.is_some() {
            if local == b"measure" {
                self.leaf = Some(Leaf::Measure);
            }
            self.text.clear();
            return Ok(());
        }

        match local {
            b"context" => {
                self.context = Some(ContextBuilder {
                    id: attribute(e, b"id")?.unwrap_or_default(),
                    ..Default::default()
                });
            }
            b"unit" => {
                self.unit = Some(UnitBuilder {
                    id: attribute(e, b"id")?.unwrap_or_default(),
                    ..Default::default()
                });
            }
            _ => {
                if let Some(context_ref) = attribute(e, b"contextRef")? {
                    self.fact = Some(FactBuilder {
                        concept: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                        context_ref,
                        unit_ref: attribute(e, b"unitRef")?,
                        decimals: attribute(e, b"decimals")?,
                        is_nil: attribute(e, b"nil")?.is_some_and(|v| v.trim() == "true"),
                        nested: 0,
                    });
                    self.text.clear();
                }
            }
        }
        Ok(())
    }

    fn close(&mut self, local: &[u8]) -> Result<()> {
        if let Some(fact) = &mut self.fact {
            if fact.nested > 0 {
                fact.nested -= 1;
                return Ok(());
            }
            if let Some(fact) = self.fact.take() {
                let local_name = fact
                    .concept
                    .rsplit(':')
                    .next()
                    .unwrap_or(&fact.concept)
                    .to_string();
                self.instance.facts.push(XbrlFact {
                    local_name,
                    concept: fact.concept,
                    context_ref: fact.context_ref,
                    unit_ref: fact.unit_ref,
                    decimals: fact.decimals,
                    value: self.text.trim().to_string(),
                    is_nil: fact.is_nil,
                });
            }
            self.text.clear();
            return Ok(());
        }

        if let Some(context) = &mut self.context {
            if local == b"context" {
                if let Some(context) = self.context.take() {
                    let context = context.build()?;
                    self.instance.contexts.insert(context.id.clone(), context);
                }
            } else if let Some(leaf) = self.leaf.take() {
                let text = self.text.trim();
                match leaf {
                    Leaf::Identifier => context.entity = Some(text.to_string()),
                    Leaf::Instant => context.instant = Some(parse_date(&context.id, text)?),
                    Leaf::StartDate => context.start = Some(parse_date(&context.id, text)?),
                    Leaf::EndDate => context.end = Some(parse_date(&context.id, text)?),
                    Leaf::Measure => {}
                }
            }
            self.text.clear();
            return Ok(());
        }

        if let Some(unit) = &mut self.unit {
            if local == b"unit" {
                if let Some(unit) = self.unit.take() {
                    self.instance.units.insert(
                        unit.id.clone(),
                        XbrlUnit {
                            measure: unit.measures.join("/"),
                            id: unit.id,
                        },
                    );
                }
            } else if let Some(Leaf::Measure) = self.leaf.take() {
                let measure = self.text.trim();
                let measure = measure.rsplit(':').next().unwrap_or(measure);
                unit.measures.push(measure.to_string());
            }
            self.text.clear();
        }
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if self.fact.is_some() || self.leaf.is_some() {
            self.text.push_str(text);
        }
    }

    fn finish(self) -> Result<XbrlInstance> {
        if !self.seen_root {
            return Err(DataError::XmlParse("document has no root element".to_string()));
        }
        Ok(self.instance)
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Parse `YYYY-MM-DD`, ignoring any time part.
fn parse_date(context_id: &str, text: &str) -> Result<NaiveDate> {
    let date = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
        DataError::XmlParse(format!("context {context_id}: invalid date {text:?}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTANCE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
            xmlns:idx-cor="http://www.idx.co.id/xbrl/taxonomy/2020-01-01/cor"
            xmlns:iso4217="http://www.xbrl.org/2003/iso4217"
            xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <link:schemaRef xmlns:link="http://www.xbrl.org/2003/linkbase" href="taxonomy.xsd"/>
  <xbrli:context id="CurrentYearInstant">
    <xbrli:entity><xbrli:identifier scheme="http://www.idx.co.id">BBCA</xbrli:identifier></xbrli:entity>
    <xbrli:period><xbrli:instant>2023-12-31</xbrli:instant></xbrli:period>
  </xbrli:context>
  <xbrli:context id="CurrentYearDuration">
    <xbrli:entity><xbrli:identifier scheme="http://www.idx.co.id">BBCA</xbrli:identifier></xbrli:entity>
    <xbrli:period>
      <xbrli:startDate>2023-01-01</xbrli:startDate>
      <xbrli:endDate>2023-12-31</xbrli:endDate>
    </xbrli:period>
  </xbrli:context>
  <xbrli:context id="SegmentInstant">
    <xbrli:entity>
      <xbrli:identifier scheme="http://www.idx.co.id">BBCA</xbrli:identifier>
      <xbrli:segment><xbrldi:explicitMember xmlns:xbrldi="http://xbrl.org/2006/xbrldi" dimension="idx-dim:SegmentAxis">idx-dim:Retail</xbrldi:explicitMember></xbrli:segment>
    </xbrli:entity>
    <xbrli:period><xbrli:instant>2023-12-31</xbrli:instant></xbrli:period>
  </xbrli:context>
  <xbrli:unit id="IDR"><xbrli:measure>iso4217:IDR</xbrli:measure></xbrli:unit>
  <xbrli:unit id="IDRPerShare">
    <xbrli:divide>
      <xbrli:unitNumerator><xbrli:measure>iso4217:IDR</xbrli:measure></xbrli:unitNumerator>
      <xbrli:unitDenominator><xbrli:measure>xbrli:shares</xbrli:measure></xbrli:unitDenominator>
    </xbrli:divide>
  </xbrli:unit>
  <idx-cor:Assets contextRef="CurrentYearInstant" unitRef="IDR" decimals="-6">1000000</idx-cor:Assets>
  <idx-cor:Assets contextRef="SegmentInstant" unitRef="IDR" decimals="-6">400000</idx-cor:Assets>
  <idx-cor:ProfitLoss contextRef="CurrentYearDuration" unitRef="IDR" decimals="-6"> 250000 </idx-cor:ProfitLoss>
  <idx-cor:GrossProfit contextRef="CurrentYearDuration" unitRef="IDR" xsi:nil="true"/>
  <idx-cor:EntityName contextRef="CurrentYearDuration">PT Bank &amp; Co</idx-cor:EntityName>
</xbrli:xbrl>"#;

    #[test]
    fn test_parse_contexts() {
        let instance = XbrlInstance::parse_str(INSTANCE).unwrap();
        assert_eq!(instance.contexts.len(), 3);

        let instant = instance.context("CurrentYearInstant").unwrap();
        assert_eq!(
            instant.period,
            ContextPeriod::Instant(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap())
        );
        assert_eq!(instant.entity.as_deref(), Some("BBCA"));
        assert!(!instant.has_dimensions);

        let duration = instance.context("CurrentYearDuration").unwrap();
        assert_eq!(duration.period.duration_days(), Some(364));
        assert!(instance.context("SegmentInstant").unwrap().has_dimensions);
    }

    #[test]
    fn test_parse_units() {
        let instance = XbrlInstance::parse_str(INSTANCE).unwrap();
        assert_eq!(instance.unit("IDR").unwrap().measure, "IDR");
        assert_eq!(instance.unit("IDRPerShare").unwrap().measure, "IDR/shares");
    }

    #[test]
    fn test_parse_facts() {
        let instance = XbrlInstance::parse_str(INSTANCE).unwrap();
        assert_eq!(instance.facts.len(), 5);

        let assets: Vec<_> = instance.facts_named("Assets").collect();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].concept, "idx-cor:Assets");
        assert_eq!(assets[0].value, "1000000");
        assert_eq!(assets[0].unit_ref.as_deref(), Some("IDR"));
        assert_eq!(assets[0].decimals.as_deref(), Some("-6"));

        let profit = instance.facts_named("ProfitLoss").next().unwrap();
        assert_eq!(profit.value, "250000");

        let gross = instance.facts_named("GrossProfit").next().unwrap();
        assert!(gross.is_nil);
        assert!(gross.value.is_empty());

        assert_eq!(instance.text_fact("EntityName"), Some("PT Bank & Co"));
        assert_eq!(instance.text_fact("GrossProfit"), None);
    }

    #[test]
    fn test_text_fact_outlives_lookup_key() {
        let instance = XbrlInstance::parse_str(INSTANCE).unwrap();
        let name = {
            let key = String::from("EntityName");
            instance.text_fact(&key)
        };
        assert_eq!(name, Some("PT Bank & Co"));
    }

    #[test]
    fn test_rejects_non_xbrl_root() {
        let result = XbrlInstance::parse_str("<html><body>Not found</body></html>");
        assert!(matches!(result, Err(DataError::XmlParse(_))));
    }

    #[test]
    fn test_rejects_empty_document() {
        let result = XbrlInstance::parse_str("<?xml version=\"1.0\"?>");
        assert!(matches!(result, Err(DataError::XmlParse(_))));
    }

    #[test]
    fn test_rejects_context_without_period() {
        let xml = r#"<xbrl><context id="c1"><entity><identifier>X</identifier></entity></context></xbrl>"#;
        let result = XbrlInstance::parse_str(xml);
        assert!(matches!(result, Err(DataError::XmlParse(_))));
    }

    #[test]
    fn test_malformed_xml() {
        let result = XbrlInstance::parse_str("<xbrl><context id=\"c1\"></xbrl>");
        assert!(result.is_err());
    }
}

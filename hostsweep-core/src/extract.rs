//! Turns arbitrary discovery-backend responses into live host addresses.
//!
//! Backends are expected to answer `{"alive_hosts": [...], "count": n}`, but
//! older or third-party services return other shapes. Extraction runs an
//! ordered chain of [`ExtractionStrategy`] values and stops at the first one
//! that yields at least one address.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

/// Field the structured response shape carries its host list in.
pub const ALIVE_HOSTS_FIELD: &str = "alive_hosts";

/// Attributes consulted, in order, when a host entry is an object.
const ADDRESS_ATTRIBUTES: [&str; 2] = ["ip", "address"];

/// Tagged result of running the strategy chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "addresses", rename_all = "snake_case")]
pub enum Extraction {
    /// Addresses read from the `alive_hosts` list.
    StructuredHosts(Vec<String>),
    /// Addresses taken from the first scalar-only list in the response.
    HeuristicList(Vec<String>),
    /// Nothing recognisable.
    Empty,
}

impl Extraction {
    pub fn addresses(&self) -> &[String] {
        match self {
            Extraction::StructuredHosts(addresses)
            | Extraction::HeuristicList(addresses) => addresses,
            Extraction::Empty => &[],
        }
    }

    pub fn into_addresses(self) -> Vec<String> {
        match self {
            Extraction::StructuredHosts(addresses)
            | Extraction::HeuristicList(addresses) => addresses,
            Extraction::Empty => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.addresses().is_empty()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Extraction::StructuredHosts(_) => "structured_hosts",
            Extraction::HeuristicList(_) => "heuristic_list",
            Extraction::Empty => "empty",
        }
    }
}

/// One way of reading addresses out of a response.
///
/// Implementations return `None` when they do not apply or found nothing, so
/// the chain can move on to the next strategy.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, response: &Value) -> Option<Extraction>;
}

/// Reads `alive_hosts`, accepting bare strings/numbers or objects with an
/// `ip`/`address` attribute.
#[derive(Debug, Default, Clone, Copy)]
pub struct AliveHostsStrategy;

impl ExtractionStrategy for AliveHostsStrategy {
    fn name(&self) -> &'static str {
        "alive_hosts"
    }

    fn extract(&self, response: &Value) -> Option<Extraction> {
        let hosts = response.as_object()?.get(ALIVE_HOSTS_FIELD)?.as_array()?;

        let mut addresses = OrderedAddresses::default();
        for host in hosts {
            match host {
                Value::Object(entry) => {
                    if let Some(address) = address_attribute(entry) {
                        addresses.push(address);
                    }
                }
                other => {
                    if let Some(address) = scalar_text(other) {
                        addresses.push(address);
                    }
                }
            }
        }

        addresses.finish().map(Extraction::StructuredHosts)
    }
}

/// Takes the first non-empty top-level list whose elements are all strings
/// or numbers, in document order.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstScalarListStrategy;

impl ExtractionStrategy for FirstScalarListStrategy {
    fn name(&self) -> &'static str {
        "first_scalar_list"
    }

    fn extract(&self, response: &Value) -> Option<Extraction> {
        let list = response.as_object()?.values().find_map(|value| {
            let items = value.as_array()?;
            let scalar_only = !items.is_empty()
                && items
                    .iter()
                    .all(|item| item.is_string() || item.is_number());
            scalar_only.then_some(items)
        })?;

        let mut addresses = OrderedAddresses::default();
        for item in list {
            if let Some(address) = scalar_text(item) {
                addresses.push(address);
            }
        }

        addresses.finish().map(Extraction::HeuristicList)
    }
}

/// Ordered strategy chain. The default chain is `alive_hosts` followed by the
/// scalar-list heuristic.
pub struct ResultExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl std::fmt::Debug for ResultExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultExtractor")
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for ResultExtractor {
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(AliveHostsStrategy),
                Box::new(FirstScalarListStrategy),
            ],
        }
    }
}

impl ResultExtractor {
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    pub fn with_strategy(
        mut self,
        strategy: impl ExtractionStrategy + 'static,
    ) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn extract(&self, response: &Value) -> Extraction {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.extract(response))
            .unwrap_or(Extraction::Empty)
    }
}

/// Runs the default chain without allocating an extractor.
pub fn extract_hosts(response: &Value) -> Extraction {
    let chain: [&dyn ExtractionStrategy; 2] =
        [&AliveHostsStrategy, &FirstScalarListStrategy];
    chain
        .iter()
        .find_map(|strategy| strategy.extract(response))
        .unwrap_or(Extraction::Empty)
}

fn address_attribute(entry: &Map<String, Value>) -> Option<String> {
    ADDRESS_ATTRIBUTES
        .iter()
        .find_map(|key| entry.get(*key).and_then(scalar_text))
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// First-seen ordered set of addresses.
#[derive(Default)]
struct OrderedAddresses {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl OrderedAddresses {
    fn push(&mut self, address: String) {
        if self.seen.insert(address.clone()) {
            self.ordered.push(address);
        }
    }

    fn finish(self) -> Option<Vec<String>> {
        (!self.ordered.is_empty()).then_some(self.ordered)
    }
}

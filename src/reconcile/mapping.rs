use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::model::field::FieldId;
use crate::model::issue::Issue;
use crate::tracker::AllowedValues;

/// Every option observed in `field` across `issues`, keyed by value. When two
/// ids share a value the one seen last wins.
pub fn observed_options(issues: &[Issue], field: FieldId) -> BTreeMap<String, String> {
    let mut options = BTreeMap::new();
    for issue in issues {
        for option in issue.select_options(field) {
            options.insert(option.value, option.id);
        }
    }
    options
}

/// Source option id to destination option id, joined on identical values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionMapping(BTreeMap<String, String>);

impl OptionMapping {
    pub fn build(source: &BTreeMap<String, String>, destination: &AllowedValues) -> Self {
        Self(
            source
                .iter()
                .filter_map(|(value, source_id)| {
                    destination
                        .get(value)
                        .map(|destination_id| (source_id.clone(), destination_id.clone()))
                })
                .collect(),
        )
    }

    pub fn get(&self, source_id: &str) -> Option<&str> {
        self.0.get(source_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Destination ids for a set of source option ids. Unmapped ids drop out.
    pub fn translate(&self, source_ids: &BTreeSet<String>) -> BTreeSet<String> {
        source_ids
            .iter()
            .filter_map(|id| self.get(id))
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Display for OptionMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (source, destination)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{source} -> {destination}")?;
        }
        f.write_str("}")
    }
}

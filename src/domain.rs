use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::EnrichError;

/// Lookup key for every provider. Only surrounding whitespace is removed;
/// the identifier itself is treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Doi(String);

impl Doi {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Doi {
    type Err = EnrichError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(EnrichError::InvalidDoi(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// DOI, title and abstract.
    Basic,
    /// The ten-column record with citation, date and link.
    Full,
}

impl Variant {
    pub fn fields(self) -> &'static [Field] {
        match self {
            Variant::Basic => &[Field::Doi, Field::Title, Field::Abstract],
            Variant::Full => &[
                Field::Doi,
                Field::Title,
                Field::Abstract,
                Field::Year,
                Field::Month,
                Field::Journal,
                Field::Authors,
                Field::Cite,
                Field::PubDate,
                Field::Link,
            ],
        }
    }

    pub fn headers(self) -> Vec<&'static str> {
        self.fields().iter().map(|field| field.header()).collect()
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Basic => write!(f, "basic"),
            Variant::Full => write!(f, "full"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Doi,
    Title,
    Abstract,
    Year,
    Month,
    Journal,
    Authors,
    Cite,
    PubDate,
    Link,
}

impl Field {
    pub fn header(self) -> &'static str {
        match self {
            Field::Doi => "DOI",
            Field::Title => "Title",
            Field::Abstract => "Abstract",
            Field::Year => "Year",
            Field::Month => "Month",
            Field::Journal => "Journal",
            Field::Authors => "Authors",
            Field::Cite => "Cite",
            Field::PubDate => "Pub_Date",
            Field::Link => "Link",
        }
    }
}

/// Decides whether a provider's answer is good enough to stop the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Acceptance {
    /// At least one examined field is non-empty.
    Any,
    /// Every examined field is non-empty.
    All,
}

impl Acceptance {
    pub fn accepts(self, record: &MetadataRecord, variant: Variant) -> bool {
        let mut examined = variant
            .fields()
            .iter()
            .filter(|field| **field != Field::Doi)
            .map(|field| !record.get(*field).trim().is_empty());
        match self {
            Acceptance::Any => examined.any(|present| present),
            Acceptance::All => examined.all(|present| present),
        }
    }
}

impl fmt::Display for Acceptance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Acceptance::Any => write!(f, "any"),
            Acceptance::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub doi: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub year: String,
    pub month: String,
    pub journal: String,
    pub authors: String,
    pub cite: String,
    pub pub_date: String,
    pub link: String,
}

impl MetadataRecord {
    /// A record with every field beyond the DOI left empty.
    pub fn empty(doi: &Doi) -> Self {
        Self {
            doi: doi.as_str().to_string(),
            ..Self::default()
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Doi => &self.doi,
            Field::Title => &self.title,
            Field::Abstract => &self.abstract_text,
            Field::Year => &self.year,
            Field::Month => &self.month,
            Field::Journal => &self.journal,
            Field::Authors => &self.authors,
            Field::Cite => &self.cite,
            Field::PubDate => &self.pub_date,
            Field::Link => &self.link,
        }
    }

    /// Projects the record onto the variant's columns, substituting
    /// `placeholder` for every empty non-DOI field.
    pub fn row(&self, variant: Variant, placeholder: &str) -> Vec<String> {
        variant
            .fields()
            .iter()
            .map(|field| {
                let value = self.get(*field).trim();
                if *field != Field::Doi && value.is_empty() {
                    placeholder.to_string()
                } else {
                    value.to_string()
                }
            })
            .collect()
    }
}

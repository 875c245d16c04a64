//! Topic taxonomy: immutable topic → keyword/phrase configuration.
//!
//! A taxonomy is built once, validated, and shared read-only by every
//! detector. Tests substitute minimal taxonomies through [`TopicTaxonomy::new`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use polis_common::{Error, Result, ResultExt};

use super::matcher::TermMatcher;

/// Definition of one political topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicDefinition {
    pub id: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Multi-word phrases, weighted higher than keywords
    #[serde(default)]
    pub phrases: Vec<String>,
    /// Ids of narrower topics in the same taxonomy
    #[serde(default)]
    pub subtopics: Vec<String>,
}

impl TopicDefinition {
    pub fn new(id: &str, keywords: &[&str], phrases: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            keywords: keywords.iter().map(|s| (*s).to_string()).collect(),
            phrases: phrases.iter().map(|s| (*s).to_string()).collect(),
            subtopics: Vec::new(),
        }
    }

    pub fn with_subtopics(mut self, subtopics: &[&str]) -> Self {
        self.subtopics = subtopics.iter().map(|s| (*s).to_string()).collect();
        self
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct TaxonomyFile {
    topics: Vec<TopicDefinition>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledTopic {
    pub(crate) definition: TopicDefinition,
    pub(crate) matcher: TermMatcher,
}

/// Validated, compiled topic taxonomy.
#[derive(Debug, Clone)]
pub struct TopicTaxonomy {
    topics: Vec<CompiledTopic>,
    index: BTreeMap<String, usize>,
}

impl TopicTaxonomy {
    /// Build a taxonomy, rejecting duplicate ids, topics without terms, and
    /// sub-topic references to unknown ids.
    pub fn new(definitions: Vec<TopicDefinition>) -> Result<Self> {
        let mut index = BTreeMap::new();
        for (i, def) in definitions.iter().enumerate() {
            if def.id.trim().is_empty() {
                return Err(Error::Validation("topic with empty id".to_string()));
            }
            if index.insert(def.id.clone(), i).is_some() {
                return Err(Error::Validation(format!("duplicate topic id \"{}\"", def.id)));
            }
        }

        let mut topics = Vec::with_capacity(definitions.len());
        for def in definitions {
            for sub in &def.subtopics {
                if !index.contains_key(sub) {
                    return Err(Error::Validation(format!(
                        "topic \"{}\" lists unknown sub-topic \"{sub}\"",
                        def.id
                    )));
                }
                if *sub == def.id {
                    return Err(Error::Validation(format!(
                        "topic \"{}\" lists itself as a sub-topic",
                        def.id
                    )));
                }
            }

            let matcher = TermMatcher::new(&def.keywords, &def.phrases)
                .context(format!("topic \"{}\"", def.id))?;
            if matcher.is_empty() {
                return Err(Error::Validation(format!("topic \"{}\" has no terms", def.id)));
            }
            topics.push(CompiledTopic {
                definition: def,
                matcher,
            });
        }

        Ok(Self { topics, index })
    }

    /// Parse a taxonomy from JSON:
    /// `{ "topics": [ { "id", "keywords", "phrases", "subtopics" } ] }`.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: TaxonomyFile = serde_json::from_str(json)?;
        Self::new(file.topics)
    }

    /// Load a taxonomy file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("reading taxonomy {}", path.display()))?;
        Self::from_json(&content).context(format!("loading taxonomy {}", path.display()))
    }

    /// The built-in political taxonomy.
    pub fn builtin() -> Result<Self> {
        Self::new(builtin_topics())
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&TopicDefinition> {
        self.index.get(id).map(|i| &self.topics[*i].definition)
    }

    /// Sub-topic ids of a topic; empty for unknown ids.
    pub fn subtopics_of(&self, id: &str) -> &[String] {
        self.get(id).map(|d| d.subtopics.as_slice()).unwrap_or(&[])
    }

    /// Topic ids in definition order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(|t| t.definition.id.as_str())
    }

    pub(crate) fn compiled(&self) -> &[CompiledTopic] {
        &self.topics
    }

    /// Every id reachable from `id` through sub-topic links, excluding `id`.
    pub fn descendants_of(&self, id: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = self.subtopics_of(id).iter().map(String::as_str).collect();
        while let Some(next) = stack.pop() {
            if next != id && seen.insert(next.to_string()) {
                stack.extend(self.subtopics_of(next).iter().map(String::as_str));
            }
        }
        seen
    }
}

fn builtin_topics() -> Vec<TopicDefinition> {
    vec![
        TopicDefinition::new(
            "healthcare",
            &[
                "healthcare", "medicare", "medicaid", "obamacare", "insurance", "hospital",
                "prescription",
            ],
            &[
                "health care", "single payer", "public option", "affordable care act",
                "drug prices", "universal healthcare",
            ],
        ),
        TopicDefinition::new(
            "economy",
            &["economy", "inflation", "recession", "gdp", "markets", "jobs", "deficit", "debt"],
            &[
                "interest rates", "federal reserve", "cost of living", "economic growth",
                "free market",
            ],
        )
        .with_subtopics(&["taxation", "labor", "business"]),
        TopicDefinition::new(
            "taxation",
            &["tax", "taxation", "irs", "deductions", "loopholes"],
            &[
                "tax cuts", "tax the rich", "wealth tax", "income tax", "capital gains", "flat tax",
                "wealth redistribution",
            ],
        ),
        TopicDefinition::new(
            "labor",
            &["union", "workers", "wages", "strike", "unemployment", "labor"],
            &[
                "minimum wage", "living wage", "collective bargaining", "right to work",
                "working class",
            ],
        ),
        TopicDefinition::new(
            "business",
            &[
                "business", "entrepreneurs", "startups", "corporations", "industry",
                "privatization", "competition",
            ],
            &["small business", "private sector", "free enterprise", "key industries"],
        ),
        TopicDefinition::new(
            "immigration",
            &[
                "immigration", "immigrants", "asylum", "deportation", "border", "refugees",
                "citizenship",
            ],
            &[
                "border wall", "illegal immigration", "path to citizenship", "border security",
                "sanctuary cities",
            ],
        ),
        TopicDefinition::new(
            "climate",
            &["climate", "emissions", "renewables", "fossil", "carbon", "pollution", "environment"],
            &[
                "climate change", "global warming", "green new deal", "carbon tax", "clean energy",
                "paris agreement",
            ],
        ),
        TopicDefinition::new(
            "criminal_justice",
            &["police", "policing", "prison", "incarceration", "crime", "sentencing"],
            &[
                "criminal justice", "law and order", "defund the police", "mass incarceration",
                "death penalty",
            ],
        ),
        TopicDefinition::new(
            "guns",
            &["guns", "firearms", "nra", "rifles", "handguns"],
            &[
                "gun control", "second amendment", "background checks", "assault weapons",
                "gun rights",
            ],
        ),
        TopicDefinition::new(
            "education",
            &["education", "schools", "teachers", "curriculum", "students", "tuition"],
            &[
                "student loans", "school choice", "public schools", "charter schools",
                "free college",
            ],
        ),
        TopicDefinition::new(
            "civil_rights",
            &["discrimination", "equality", "racism", "lgbtq", "segregation"],
            &[
                "civil rights", "voting rights", "racial justice", "same-sex marriage",
                "equal protection",
            ],
        )
        .with_subtopics(&["reproductive_rights"]),
        TopicDefinition::new(
            "reproductive_rights",
            &["abortion", "contraception", "pro-choice", "pro-life"],
            &["roe v wade", "reproductive rights", "planned parenthood", "right to life"],
        ),
        TopicDefinition::new(
            "religion",
            &["church", "faith", "christian", "religious", "prayer", "secular"],
            &["religious liberty", "separation of church and state", "judeo-christian values"],
        ),
        TopicDefinition::new(
            "foreign_policy",
            &["military", "nato", "sanctions", "diplomacy", "war", "troops", "allies"],
            &["foreign policy", "foreign aid", "national security", "trade war", "united nations"],
        ),
        TopicDefinition::new(
            "elections",
            &["election", "ballot", "voters", "gerrymandering", "campaign", "candidates"],
            &[
                "electoral college", "voter id", "mail-in ballots", "campaign finance",
                "term limits",
            ],
        ),
        TopicDefinition::new(
            "technology_privacy",
            &["privacy", "surveillance", "encryption", "censorship", "antitrust"],
            &["big tech", "data privacy", "free speech", "section 230", "net neutrality"],
        ),
    ]
}

//! Per-dimension indicator lexicons.
//!
//! Each dimension owns one [`IndicatorSet`] per pole plus a table of topics
//! aligned with a pole. Sets are validated when loaded: both poles need terms,
//! no term may sit on both poles, and each dimension appears exactly once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use polis_common::{Error, Result, ResultExt};

use super::matcher::TermMatcher;
use super::taxonomy::TopicTaxonomy;
use crate::types::{Dimension, Pole};

/// Keywords and phrases for one pole of one dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub phrases: Vec<String>,
}

impl IndicatorSet {
    pub fn new(keywords: &[&str], phrases: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|s| (*s).to_string()).collect(),
            phrases: phrases.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Serializable definition of one dimension's lexicon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionLexiconDef {
    pub dimension: Dimension,
    pub positive: IndicatorSet,
    pub negative: IndicatorSet,
    /// Topic id → pole the topic pushes toward
    #[serde(default)]
    pub aligned_topics: BTreeMap<String, Pole>,
}

/// Compiled lexicon for one dimension.
#[derive(Debug, Clone)]
pub struct DimensionLexicon {
    dimension: Dimension,
    positive: TermMatcher,
    negative: TermMatcher,
    aligned_topics: BTreeMap<String, Pole>,
}

impl DimensionLexicon {
    pub fn new(def: DimensionLexiconDef) -> Result<Self> {
        let dimension = def.dimension;
        let positive = TermMatcher::new(&def.positive.keywords, &def.positive.phrases)
            .context(format!("{dimension} positive pole"))?;
        let negative = TermMatcher::new(&def.negative.keywords, &def.negative.phrases)
            .context(format!("{dimension} negative pole"))?;

        if positive.is_empty() || negative.is_empty() {
            return Err(Error::Validation(format!(
                "{dimension} lexicon needs terms on both poles"
            )));
        }
        if let Some((term, _)) = positive.terms().find(|(t, _)| negative.contains(t)) {
            return Err(Error::Validation(format!(
                "{dimension} term \"{term}\" appears on both poles"
            )));
        }

        Ok(Self {
            dimension,
            positive,
            negative,
            aligned_topics: def.aligned_topics,
        })
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn pole(&self, pole: Pole) -> &TermMatcher {
        match pole {
            Pole::Positive => &self.positive,
            Pole::Negative => &self.negative,
        }
    }

    /// Pole a topic is aligned with, if any.
    pub fn alignment(&self, topic_id: &str) -> Option<Pole> {
        self.aligned_topics.get(topic_id).copied()
    }

    pub fn aligned_topics(&self) -> impl Iterator<Item = (&str, Pole)> {
        self.aligned_topics.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct LexiconFile {
    dimensions: Vec<DimensionLexiconDef>,
}

/// Lexicons for all three dimensions.
#[derive(Debug, Clone)]
pub struct DimensionLexicons {
    lexicons: BTreeMap<Dimension, DimensionLexicon>,
}

impl DimensionLexicons {
    /// Build from definitions; every dimension must appear exactly once.
    pub fn new(defs: Vec<DimensionLexiconDef>) -> Result<Self> {
        let mut lexicons = BTreeMap::new();
        for def in defs {
            let dimension = def.dimension;
            if lexicons.insert(dimension, DimensionLexicon::new(def)?).is_some() {
                return Err(Error::Validation(format!(
                    "{dimension} lexicon defined more than once"
                )));
            }
        }
        if let Some(missing) = Dimension::ALL.iter().find(|d| !lexicons.contains_key(d)) {
            return Err(Error::Validation(format!("missing {missing} lexicon")));
        }
        Ok(Self { lexicons })
    }

    /// Parse from JSON:
    /// `{ "dimensions": [ { "dimension", "positive", "negative", "aligned_topics" } ] }`.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: LexiconFile = serde_json::from_str(json)?;
        Self::new(file.dimensions)
    }

    /// Load a lexicon file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("reading lexicon {}", path.display()))?;
        Self::from_json(&content).context(format!("loading lexicon {}", path.display()))
    }

    /// The built-in lexicon.
    pub fn builtin() -> Result<Self> {
        Self::new(builtin_lexicons())
    }

    pub fn get(&self, dimension: Dimension) -> &DimensionLexicon {
        // new() guarantees all three
        &self.lexicons[&dimension]
    }

    /// Check that every aligned topic exists in the taxonomy.
    pub fn validate_against(&self, taxonomy: &TopicTaxonomy) -> Result<()> {
        for lexicon in self.lexicons.values() {
            for (topic, _) in lexicon.aligned_topics() {
                if !taxonomy.contains(topic) {
                    return Err(Error::Validation(format!(
                        "{} lexicon aligns unknown topic \"{topic}\"",
                        lexicon.dimension()
                    )));
                }
            }
        }
        Ok(())
    }
}

fn builtin_lexicons() -> Vec<DimensionLexiconDef> {
    vec![
        DimensionLexiconDef {
            dimension: Dimension::Economic,
            positive: IndicatorSet::new(
                &[
                    "competition", "privatization", "privatize", "deregulation", "entrepreneurship",
                    "entrepreneurs", "capitalism", "innovation", "profit", "investors",
                    "enterprise",
                ],
                &[
                    "free market", "free enterprise", "private sector", "tax cuts", "lower taxes",
                    "small business", "market competition", "cut regulations", "school choice",
                ],
            ),
            negative: IndicatorSet::new(
                &[
                    "redistribution", "nationalization", "nationalize", "socialism", "unions",
                    "welfare", "subsidies", "inequality", "billionaires", "regulation",
                ],
                &[
                    "wealth redistribution", "public ownership", "collective ownership",
                    "central planning", "universal basic income", "wealth tax", "tax the rich",
                    "living wage", "minimum wage", "single payer", "social safety net",
                    "price controls",
                ],
            ),
            aligned_topics: [
                ("business".to_string(), Pole::Positive),
                ("labor".to_string(), Pole::Negative),
            ]
            .into_iter()
            .collect(),
        },
        DimensionLexiconDef {
            dimension: Dimension::Social,
            positive: IndicatorSet::new(
                &[
                    "equality", "diversity", "inclusion", "inclusive", "lgbtq", "feminism",
                    "progressive", "multicultural", "tolerance", "decriminalize", "pro-choice",
                ],
                &[
                    "same-sex marriage", "marriage equality", "reproductive rights",
                    "abortion rights",
                    "racial justice", "social justice", "gender identity", "trans rights",
                    "criminal justice reform",
                ],
            ),
            negative: IndicatorSet::new(
                &[
                    "tradition", "traditional", "faith", "religious", "patriotism", "morality",
                    "heritage", "pro-life", "christian", "decency",
                ],
                &[
                    "traditional values", "family values", "sanctity of life", "law and order",
                    "religious liberty", "western civilization", "nuclear family", "right to life",
                ],
            ),
            aligned_topics: [
                ("civil_rights".to_string(), Pole::Positive),
                ("religion".to_string(), Pole::Negative),
            ]
            .into_iter()
            .collect(),
        },
        DimensionLexiconDef {
            dimension: Dimension::Governance,
            positive: IndicatorSet::new(
                &[
                    "liberty", "decentralization", "decentralize", "federalism", "autonomy",
                    "libertarian", "localism", "privacy", "self-governance",
                ],
                &[
                    "states' rights", "limited government", "individual liberty", "local control",
                    "small government", "civil liberties", "government overreach", "free speech",
                    "personal freedom", "community control",
                ],
            ),
            negative: IndicatorSet::new(
                &[
                    "surveillance", "mandate", "centralization", "censorship",
                    "nationwide", "crackdown", "authoritarian",
                ],
                &[
                    "federal government", "strong leadership", "national standards",
                    "federal oversight", "central government", "government control",
                    "executive order", "emergency powers", "national mandate",
                ],
            ),
            aligned_topics: [("technology_privacy".to_string(), Pole::Positive)]
                .into_iter()
                .collect(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lexicons_validate_against_builtin_taxonomy() {
        let lexicons = DimensionLexicons::builtin().unwrap();
        let taxonomy = TopicTaxonomy::builtin().unwrap();
        lexicons.validate_against(&taxonomy).unwrap();
        assert_eq!(
            lexicons.get(Dimension::Economic).alignment("labor"),
            Some(Pole::Negative)
        );
    }

    #[test]
    fn test_term_on_both_poles_rejected() {
        let def = DimensionLexiconDef {
            dimension: Dimension::Economic,
            positive: IndicatorSet::new(&["markets"], &[]),
            negative: IndicatorSet::new(&["Markets"], &[]),
            aligned_topics: BTreeMap::new(),
        };
        let err = DimensionLexicon::new(def).unwrap_err();
        assert!(err.to_string().contains("both poles"));
    }

    #[test]
    fn test_empty_pole_rejected() {
        let def = DimensionLexiconDef {
            dimension: Dimension::Social,
            positive: IndicatorSet::new(&["equality"], &[]),
            negative: IndicatorSet::default(),
            aligned_topics: BTreeMap::new(),
        };
        assert!(DimensionLexicon::new(def).is_err());
    }

    #[test]
    fn test_missing_dimension_rejected() {
        let mut defs = builtin_lexicons();
        defs.pop();
        let err = DimensionLexicons::new(defs).unwrap_err();
        assert!(err.to_string().contains("Governance"));
    }

    #[test]
    fn test_unknown_alignment_rejected() {
        let mut defs = builtin_lexicons();
        defs[0]
            .aligned_topics
            .insert("astrology".to_string(), Pole::Positive);
        let lexicons = DimensionLexicons::new(defs).unwrap();
        let taxonomy = TopicTaxonomy::builtin().unwrap();
        assert!(lexicons.validate_against(&taxonomy).is_err());
    }

    #[test]
    fn test_lexicon_json_shape() {
        let json = r#"{
            "dimensions": [
                { "dimension": "Economic",
                  "positive": { "keywords": ["market"] },
                  "negative": { "phrases": ["public ownership"] },
                  "aligned_topics": { "labor": "negative" } },
                { "dimension": "Social",
                  "positive": { "keywords": ["equality"] },
                  "negative": { "keywords": ["tradition"] } },
                { "dimension": "Governance",
                  "positive": { "keywords": ["liberty"] },
                  "negative": { "keywords": ["mandate"] } }
            ]
        }"#;
        let lexicons = DimensionLexicons::from_json(json).unwrap();
        assert_eq!(
            lexicons.get(Dimension::Economic).alignment("labor"),
            Some(Pole::Negative)
        );
        assert!(lexicons.get(Dimension::Social).alignment("labor").is_none());
    }
}

//! Field names, value rules and vocabularies of the repository export.

use std::collections::BTreeMap;

use crate::nested::{Key, Path};
use crate::normalize::ValueRules;

/// The default location of the bulk export.
pub const BASE_URL: &str = "https://elasticdump.prod.openeduhub.net";

/// The default (compressed) export file.
pub const TARGET_FILE: &str = "workspace_data-public-only.json.gz";

/// The sub-document of every exported line that holds the record.
pub const PREFIX: &str = "_source";

/// Members of this collection carry the redaction flag.
pub const REDACTION_COLLECTION: &str = "Redaktionsbuffet";

/// Fields of a SKOS concept that list its sub-concepts.
pub const SUBCATEGORY_FIELDS: &[&str] = &["hasTopConcept", "narrower"];

/// The file name of the token cache.
pub const TOKEN_CACHE_FILE: &str = "nlp_cache.json";

/// Commonly used metadata fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fields {
    Age,
    CourseMode,
    CollectionsLocation,
    CollectionsTitle,
    CollectionsUuid,
    Competence,
    Description,
    Duration,
    EducationalContext,
    FskRating,
    Id,
    IntendedEndUser,
    KeywordsControlled,
    KeywordsFree,
    Language,
    Lrt,
    TaxonId,
    TaxonIdUniversity,
    TestData,
    Title,
    Topic,
    Url,
}

impl Fields {
    pub const fn path(self) -> &'static str {
        match self {
            Self::Age => "properties.ccm:educationaltypicalagerange",
            Self::CourseMode => "properties.ccm:oeh_course_coursemode",
            Self::CollectionsLocation => {
                "collections.properties.cclom:location"
            }
            Self::CollectionsTitle => "collections.properties.cm:title",
            Self::CollectionsUuid => "collections.properties.sys:node-uuid",
            Self::Competence => "properties.ccm:competence",
            Self::Description => "properties.cclom:general_description",
            Self::Duration => "properties.cclom:duration",
            Self::EducationalContext => "properties.ccm:educationalcontext",
            Self::FskRating => "properties.ccm:fskRating",
            Self::Id => "nodeRef.id",
            Self::IntendedEndUser => {
                "properties.ccm:educationalintendedenduserrole"
            }
            Self::KeywordsControlled => {
                "properties.cclom:classification_keyword"
            }
            Self::KeywordsFree => "properties.cclom:general_keyword",
            Self::Language => "properties.cclom:general_language",
            Self::Lrt => "properties.ccm:oeh_lrt",
            Self::TaxonId => "properties.ccm:taxonid",
            Self::TaxonIdUniversity => "properties.ccm:oeh_taxonid_university",
            Self::TestData => "properties.ccm:oeh_ai_test_data",
            Self::Title => "properties.cclom:title",
            Self::Topic => "properties.ccm:curriculum",
            Self::Url => "properties.ccm:wwwurl",
        }
    }
}

/// The path of the identifier of a SKOS concept.
pub fn id_path() -> Path {
    vec![Key::from("id")]
}

/// The path of the (german) label of a SKOS concept.
pub fn label_path() -> Path {
    vec![Key::from("prefLabel"), Key::from("de")]
}

const DISCIPLINE: &str = "http://w3id.org/openeduhub/vocabs/discipline/";

const DISCIPLINE_REMAP: &[(&str, &str)] = &[
    ("Darstellendes-Spiel", "12002"),
    ("Deutsch", "120"),
    ("Deutsch als Zweitsprache", "28002"),
    ("Deutsch als", "28002"),
    ("Englisch", "20001"),
    ("Geografie", "220"),
    ("Geschichte", "240"),
    ("Informatik", "320"),
    ("Mathematik", "380"),
    ("Physik", "460"),
    ("Religion", "520"),
    ("Spanisch", "20007"),
    ("Medienbildung", "900"),
];

const LANGUAGE_REMAP: &[(&str, &str)] = &[
    ("de_DE", "de"),
    ("de_AT", "de"),
    ("DE", "de"),
    ("de-DE", "de"),
    ("Deutsch", "de"),
    ("en-US-LEARN", "en"),
    ("en_US", "en"),
    ("en_GB", "en"),
    ("hu_HU", "hu"),
    ("es_CR", "es"),
    ("es_ES", "es"),
    ("es_AR", "es"),
    ("fr_FR", "fr"),
    ("tr_TR", "tr"),
    ("latin", "la"),
];

/// Returns the default drop and remap rules per field.
pub fn value_rules() -> BTreeMap<String, ValueRules> {
    let mut discipline_remap: BTreeMap<String, String> = DISCIPLINE_REMAP
        .iter()
        .map(|(from, to)| {
            (format!("{DISCIPLINE}{from}"), format!("{DISCIPLINE}{to}"))
        })
        .collect();
    discipline_remap
        .insert("Zweitsprache".into(), format!("{DISCIPLINE}28002"));

    let discipline = ValueRules::new(
        [
            String::new(),
            format!("{DISCIPLINE}???"),
            format!("{DISCIPLINE}Pädagogik"),
        ],
        discipline_remap,
    );

    let language = ValueRules::new(
        Vec::<String>::new(),
        LANGUAGE_REMAP
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string())),
    );

    BTreeMap::from([
        (Fields::TaxonId.path().to_string(), discipline),
        (Fields::Language.path().to_string(), language),
    ])
}

const VOCABS: &str = "https://vocabs.openeduhub.de/w3id.org/openeduhub/vocabs";

/// Returns the default SKOS vocabulary per field.
pub fn skos_urls() -> BTreeMap<String, String> {
    [
        (Fields::EducationalContext, "educationalContext/index.json"),
        (Fields::FskRating, "fskRating/index.json"),
        (Fields::IntendedEndUser, "intendedEndUserRole/index.json"),
        (Fields::Lrt, "new_lrt/index.json"),
        (Fields::TaxonId, "discipline/index.json"),
        (
            Fields::Topic,
            "oeh-topics/5e40e372-735c-4b17-bbf7-e827a5702b57.json",
        ),
    ]
    .into_iter()
    .map(|(field, file)| (field.path().to_string(), format!("{VOCABS}/{file}")))
    .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn discipline_rules() {
        let rules = &value_rules()[Fields::TaxonId.path()];
        let value = json!([
            "http://w3id.org/openeduhub/vocabs/discipline/Mathematik",
            "http://w3id.org/openeduhub/vocabs/discipline/???",
            "Zweitsprache",
        ]);

        assert_eq!(
            rules.apply(value),
            json!([
                "http://w3id.org/openeduhub/vocabs/discipline/380",
                "http://w3id.org/openeduhub/vocabs/discipline/28002",
            ])
        );
    }

    #[test]
    fn skos_url_of_discipline() {
        assert_eq!(
            skos_urls()[Fields::TaxonId.path()],
            "https://vocabs.openeduhub.de/w3id.org/openeduhub/vocabs/\
             discipline/index.json"
        );
    }
}

//! # Dataprep
//!
//! Tools to turn the bulk metadata export of an educational-content
//! repository into datasets for multi-label classification.
//!
//! Records of the line-delimited JSON export are normalized (dropping
//! and remapping values per field), filtered and reduced to a few
//! columns ([loader]). Every target field is encoded into a boolean
//! membership matrix along with the sorted category identifiers and
//! their labels ([encode], [labels]). The resulting [Dataset] can be
//! tokenized ([ProcessedDataset]) and turned into bag-of-words
//! features ([BowDataset]).
//!
//! All dataset types can be subset by document, by the categories of
//! one target or by the words of the vocabulary ([subset]); every
//! parallel field is kept aligned.
//!
//! ## License
//!
//! This project is licensed under the terms of the [EUPL v1.2].
//!
//! [EUPL v1.2]: https://joinup.ec.europa.eu/collection/eupl/eupl-text-eupl-12

pub mod bow;
pub mod config;
pub mod defaults;
pub mod encode;
pub mod error;
pub mod fetch;
pub mod filters;
pub mod labels;
pub mod loader;
pub mod nested;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod subset;
pub mod tokenize;

pub use error::{DataprepError, DataprepResult};
pub use record::{BowDataset, Dataset, ProcessedDataset, Record, TargetData};

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{DataprepError, DataprepResult};
    pub use crate::labels::{
        HttpSource, JsonSource, LabelResolver, UriLookup,
    };
    pub use crate::pipeline::{generate_data, KeepDocuments, PipelineOptions};
    pub use crate::record::{
        BowDataset, Dataset, ProcessedDataset, Record, TargetData,
    };
    pub use crate::subset::{
        subset_by_category, subset_by_document, subset_by_word,
    };
    pub use crate::tokenize::{Tokenizer, WordTokenizer};
}

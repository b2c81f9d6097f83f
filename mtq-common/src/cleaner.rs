//! Dataset ingestion and validation
//!
//! An upload arrives as metadata plus one of two payload shapes: three
//! parallel newline-delimited text blocks, or a pre-split list of sentence
//! records. Both shapes go through [`clean_data`], which either yields a
//! fully aligned [`Dataset`] or nothing at all.

use crate::db::EvaluationStore;
use crate::language::Language;
use crate::models::{Dataset, DatasetSentence, SentencePair, SentenceSet, DEFAULT_SENTENCE_PAIR_TYPE};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{error, info};

/// Dataset metadata entered alongside the upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    #[serde(default)]
    pub set_name: String,
    pub source_language: String,
    pub target_language: String,
    #[serde(default)]
    pub possible_evaluator_ids: Vec<String>,
}

/// Three parallel text blocks, one sentence per line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTextPayload {
    pub source_text: String,
    pub human_translated_text: String,
    pub machine_translated_text: String,
}

/// One pre-split sentence record; all four fields are required
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceRecord {
    pub original: String,
    pub human_translation: String,
    pub machine_translation: String,
    pub sentence_pair_type: String,
}

/// Pre-split sentence list with optional evaluator whitelist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceListPayload {
    pub sentences: Vec<SentenceRecord>,
    #[serde(default)]
    pub possible_evaluator_ids: Vec<String>,
}

/// The two accepted upload shapes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetPayload {
    RawText(RawTextPayload),
    Sentences(SentenceListPayload),
}

/// A decoded upload body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetUpload {
    #[serde(flatten)]
    pub metadata: DatasetMetadata,
    pub payload: DatasetPayload,
}

/// Decode an upload body; anything that does not fit a known shape is a shape error
pub fn parse_upload(bytes: &[u8]) -> Result<DatasetUpload> {
    serde_json::from_slice(bytes).map_err(|e| {
        error!("Could not parse dataset upload: {}", e);
        Error::Shape(e.to_string())
    })
}

/// Split a text block into sentences on runs of `\n`, `\r` and `\r\n`
///
/// Consecutive separators collapse, so no sentence is ever empty.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split(['\r', '\n'])
        .filter(|sentence| !sentence.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validate an upload into a [`Dataset`]
///
/// Returns `None` when either language does not resolve or, for raw text,
/// when the three blocks split into different numbers of sentences.
pub fn clean_data(metadata: &DatasetMetadata, payload: &DatasetPayload) -> Option<Dataset> {
    let source_language = Language::resolve(&metadata.source_language)?;
    let target_language = Language::resolve(&metadata.target_language)?;

    let mut possible_evaluator_ids: BTreeSet<String> =
        metadata.possible_evaluator_ids.iter().cloned().collect();

    let sentences = match payload {
        DatasetPayload::RawText(raw) => {
            let originals = split_sentences(&raw.source_text);
            let human = split_sentences(&raw.human_translated_text);
            let machine = split_sentences(&raw.machine_translated_text);

            if originals.len() != human.len() || originals.len() != machine.len() {
                return None;
            }

            originals
                .into_iter()
                .zip(human)
                .zip(machine)
                .map(|((original, human_translation), machine_translation)| DatasetSentence {
                    original,
                    human_translation,
                    machine_translation,
                    sentence_pair_type: DEFAULT_SENTENCE_PAIR_TYPE.to_string(),
                })
                .collect()
        }
        DatasetPayload::Sentences(list) => {
            possible_evaluator_ids.extend(list.possible_evaluator_ids.iter().cloned());
            list.sentences
                .iter()
                .map(|record| DatasetSentence {
                    original: record.original.clone(),
                    human_translation: record.human_translation.clone(),
                    machine_translation: record.machine_translation.clone(),
                    sentence_pair_type: record.sentence_pair_type.clone(),
                })
                .collect()
        }
    };

    Some(Dataset {
        sentences,
        set_name: metadata.set_name.clone(),
        source_language,
        target_language,
        possible_evaluator_ids,
    })
}

/// One new sentence pair per dataset sentence
pub fn generate_sentence_pairs(dataset: &Dataset) -> Vec<SentencePair> {
    dataset
        .sentences
        .iter()
        .map(|sentence| {
            SentencePair::new(
                sentence.original.clone(),
                sentence.human_translation.clone(),
                sentence.machine_translation.clone(),
                dataset.source_language,
                dataset.target_language,
                sentence.sentence_pair_type.clone(),
            )
        })
        .collect()
}

/// Store every pair, then a sentence set referencing them; returns the set id
pub async fn put_sentence_set_and_pairs(
    store: &dyn EvaluationStore,
    sentence_pairs: &[SentencePair],
    dataset: &Dataset,
) -> Result<String> {
    let mut sentence_ids = BTreeSet::new();
    for pair in sentence_pairs {
        sentence_ids.insert(store.put_sentence_pair(pair).await?);
    }

    let sentence_set = SentenceSet::new(
        dataset.set_name.clone(),
        dataset.source_language,
        dataset.target_language,
        sentence_ids,
        dataset.possible_evaluator_ids.clone(),
    );
    store.put_sentence_set(&sentence_set).await
}

/// Clean and persist an upload; returns the new sentence set id
pub async fn submit_dataset(
    store: &dyn EvaluationStore,
    metadata: &DatasetMetadata,
    payload: &DatasetPayload,
) -> Result<String> {
    let Some(dataset) = clean_data(metadata, payload) else {
        error!(
            set_name = %metadata.set_name,
            source_language = %metadata.source_language,
            target_language = %metadata.target_language,
            "Could not clean data"
        );
        return Err(Error::Validation(format!(
            "Could not clean data for dataset '{}'",
            metadata.set_name
        )));
    };

    let sentence_pairs = generate_sentence_pairs(&dataset);
    let set_id = put_sentence_set_and_pairs(store, &sentence_pairs, &dataset).await?;

    info!(
        set_id = %set_id,
        sentences = sentence_pairs.len(),
        "Submitted dataset {} ({} -> {})",
        dataset.set_name,
        dataset.source_language,
        dataset.target_language
    );
    Ok(set_id)
}

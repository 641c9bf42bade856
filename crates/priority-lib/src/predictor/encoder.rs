//! Input encoding for the inference graph
//!
//! The pipeline manifest shipped next to each ONNX graph carries the
//! preprocessing the graph expects: numeric columns pass straight through,
//! categorical columns are one-hot encoded against a fixed vocabulary.

use super::ClassValue;
use crate::error::ClassifierError;
use crate::frame::{Cell, Frame};
use crate::harmonize::{ColumnKind, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_version() -> String {
    "unversioned".to_string()
}

/// Sidecar description of a serialized pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// One-hot vocabulary per categorical column
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    /// Class values in probability-column order
    #[serde(default)]
    pub classes: Vec<ClassValue>,
    /// Encoded input width the graph was exported with
    #[serde(default)]
    pub n_features: Option<usize>,
}

impl PipelineManifest {
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

/// Turns harmonized rows into float vectors
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    schema: Schema,
    vocabularies: Vec<Option<Vec<String>>>,
    width: usize,
}

impl FeatureEncoder {
    pub fn new(schema: Schema, manifest: &PipelineManifest) -> Result<Self, ClassifierError> {
        let mut vocabularies = Vec::with_capacity(schema.columns.len());
        let mut width = 0;

        for spec in schema.columns {
            match spec.kind {
                ColumnKind::Numeric => {
                    vocabularies.push(None);
                    width += 1;
                }
                ColumnKind::Categorical => {
                    let vocab = manifest
                        .categories
                        .get(spec.name)
                        .ok_or_else(|| ClassifierError::MissingVocabulary(spec.name.to_string()))?;
                    width += vocab.len();
                    vocabularies.push(Some(vocab.clone()));
                }
            }
        }

        if let Some(declared) = manifest.n_features {
            if declared != width {
                return Err(ClassifierError::FeatureWidth {
                    declared,
                    encoded: width,
                });
            }
        }

        Ok(Self {
            schema,
            vocabularies,
            width,
        })
    }

    /// Length of every encoded row
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn encode_row(&self, frame: &Frame, row: usize) -> Result<Vec<f32>, ClassifierError> {
        let mut out = Vec::with_capacity(self.width);

        for (spec, vocab) in self.schema.columns.iter().zip(&self.vocabularies) {
            let cell = frame
                .get(row, spec.name)
                .ok_or_else(|| ClassifierError::MissingFeature(spec.name.to_string()))?;

            match vocab {
                None => out.push(numeric_value(spec.name, cell)?),
                Some(vocab) => {
                    let value = match cell {
                        Cell::Missing => None,
                        other => Some(other.to_string()),
                    };
                    // unknown categories encode as all zeros
                    out.extend(
                        vocab
                            .iter()
                            .map(|v| if Some(v) == value.as_ref() { 1.0 } else { 0.0 }),
                    );
                }
            }
        }

        Ok(out)
    }
}

fn numeric_value(column: &str, cell: &Cell) -> Result<f32, ClassifierError> {
    match cell {
        Cell::Number(v) => Ok(*v as f32),
        Cell::Missing => Ok(f32::NAN),
        Cell::Text(s) => s
            .trim()
            .parse::<f32>()
            .map_err(|_| ClassifierError::NotNumeric {
                column: column.to_string(),
                value: s.clone(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmonize::Harmonizer;
    use crate::models::TicketRecord;

    fn manifest() -> PipelineManifest {
        let mut categories = BTreeMap::new();
        categories.insert(
            "Status".to_string(),
            vec!["Closed".to_string(), "Open".to_string()],
        );
        categories.insert(
            "Category".to_string(),
            vec!["incident".to_string(), "request".to_string()],
        );
        categories.insert("Closure_Code".to_string(), vec!["Other".to_string()]);
        PipelineManifest {
            name: "priority_rf_pipeline".to_string(),
            version: "1.0.0".to_string(),
            categories,
            classes: vec![ClassValue::Int(1), ClassValue::Int(2)],
            n_features: None,
        }
    }

    #[test]
    fn test_width_counts_one_hot_blocks() {
        let encoder = FeatureEncoder::new(Schema::ticket(), &manifest()).unwrap();
        assert_eq!(encoder.width(), 8 + 2 + 2 + 1);
    }

    #[test]
    fn test_encode_record() {
        let encoder = FeatureEncoder::new(Schema::ticket(), &manifest()).unwrap();
        let record = TicketRecord {
            impact: 3,
            handle_time_hrs: 1.5,
            ..Default::default()
        };
        let encoded = encoder.encode_row(&record.to_frame(), 0).unwrap();

        assert_eq!(encoded.len(), encoder.width());
        assert_eq!(encoded[0], 3.0);
        assert_eq!(encoded[3], 1.5);
        assert_eq!(encoded[4], 1.5);
        // Status=Open, Category=incident, Closure_Code=Other
        assert_eq!(&encoded[8..], &[0.0, 1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unknown_category_is_all_zero() {
        let encoder = FeatureEncoder::new(Schema::ticket(), &manifest()).unwrap();
        let mut frame = Harmonizer::default().harmonize(&Frame::new(["Impact"]));
        frame
            .push_row(vec![
                Cell::Number(1.0),
                Cell::Number(1.0),
                Cell::Number(0.0),
                Cell::Number(0.0),
                Cell::Number(0.0),
                Cell::Number(0.0),
                Cell::Number(0.0),
                Cell::Number(0.0),
                Cell::text("Unknown"),
                Cell::text("Unknown"),
                Cell::Missing,
            ])
            .unwrap();

        let encoded = encoder.encode_row(&frame, 0).unwrap();
        assert!(encoded[8..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_numeric_looking_codes_match_vocabulary() {
        let mut manifest = manifest();
        manifest
            .categories
            .insert("Category".to_string(), vec!["1.5".to_string(), "1.50".to_string()]);
        manifest
            .categories
            .insert("Closure_Code".to_string(), vec!["007".to_string()]);
        let encoder = FeatureEncoder::new(Schema::ticket(), &manifest).unwrap();

        let input =
            Frame::from_csv_bytes(b"Impact,Status,Category,Closure_Code\n2,Open,1.50,007\n").unwrap();
        let frame = Harmonizer::default().harmonize(&input);
        let encoded = encoder.encode_row(&frame, 0).unwrap();

        assert_eq!(encoded[0], 2.0);
        assert_eq!(&encoded[8..], &[0.0, 1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_text_in_numeric_column_is_rejected() {
        let encoder = FeatureEncoder::new(Schema::ticket(), &manifest()).unwrap();
        let input = Frame::from_csv_bytes(b"Impact,Status\nhigh,Open\n").unwrap();
        let frame = Harmonizer::default().harmonize(&input);

        let err = encoder.encode_row(&frame, 0).unwrap_err();
        assert!(matches!(err, ClassifierError::NotNumeric { ref column, .. } if column == "Impact"));
    }

    #[test]
    fn test_missing_feature_is_rejected() {
        let encoder = FeatureEncoder::new(Schema::ticket(), &manifest()).unwrap();
        let mut frame = Frame::new(["Impact"]);
        frame.push_row(vec![Cell::Number(1.0)]).unwrap();

        let err = encoder.encode_row(&frame, 0).unwrap_err();
        assert!(matches!(err, ClassifierError::MissingFeature(_)));
    }

    #[test]
    fn test_manifest_requires_every_vocabulary() {
        let mut m = manifest();
        m.categories.remove("Closure_Code");
        let err = FeatureEncoder::new(Schema::ticket(), &m).unwrap_err();
        assert!(matches!(err, ClassifierError::MissingVocabulary(ref c) if c == "Closure_Code"));
    }

    #[test]
    fn test_manifest_width_mismatch() {
        let mut m = manifest();
        m.n_features = Some(40);
        let err = FeatureEncoder::new(Schema::ticket(), &m).unwrap_err();
        assert!(matches!(err, ClassifierError::FeatureWidth { declared: 40, encoded: 13 }));
    }

    #[test]
    fn test_manifest_json_defaults() {
        let m = PipelineManifest::from_json(br#"{"categories": {"Status": ["Open"]}}"#).unwrap();
        assert_eq!(m.version, "unversioned");
        assert!(m.classes.is_empty());
        assert_eq!(m.n_features, None);
    }
}

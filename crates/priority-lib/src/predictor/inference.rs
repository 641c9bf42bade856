//! ONNX inference using tract
//!
//! Runs an exported classification pipeline one row at a time. The graph
//! takes a `[1, width]` float input built by the [`FeatureEncoder`]; its
//! outputs are classified at load time into a label tensor and/or a
//! class-probability matrix.

use super::encoder::{FeatureEncoder, PipelineManifest};
use super::{ClassValue, Classifier};
use crate::error::ClassifierError;
use crate::frame::Frame;
use crate::harmonize::Schema;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Per-row inference latency above which a warning is logged
pub const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputRole {
    Label,
    Probabilities,
    Ignored,
}

#[derive(Debug, Default)]
struct RowOutput {
    label: Option<ClassValue>,
    probabilities: Option<Vec<f32>>,
}

/// Classifier backed by an optimized tract plan
pub struct OnnxClassifier {
    name: String,
    plan: TractModel,
    outputs: Vec<OutputRole>,
    encoder: FeatureEncoder,
    manifest: PipelineManifest,
}

impl OnnxClassifier {
    /// Load a graph for the ticket schema
    pub fn from_bytes(
        name: impl Into<String>,
        model_bytes: &[u8],
        manifest: PipelineManifest,
    ) -> Result<Self, ClassifierError> {
        Self::with_schema(name, model_bytes, manifest, Schema::ticket())
    }

    pub fn with_schema(
        name: impl Into<String>,
        model_bytes: &[u8],
        manifest: PipelineManifest,
        schema: Schema,
    ) -> Result<Self, ClassifierError> {
        let encoder = FeatureEncoder::new(schema, &manifest)?;
        let (plan, outputs) = Self::load_model(model_bytes, encoder.width())?;

        if !outputs
            .iter()
            .any(|r| matches!(r, OutputRole::Label | OutputRole::Probabilities))
        {
            return Err(ClassifierError::NoLabel);
        }

        let name = name.into();
        debug!(model = %name, outputs = ?outputs, width = encoder.width(), "Inference graph ready");

        Ok(Self {
            name,
            plan,
            outputs,
            encoder,
            manifest,
        })
    }

    /// Parse, type and optimize an ONNX graph from bytes
    fn load_model(
        model_bytes: &[u8],
        width: usize,
    ) -> Result<(TractModel, Vec<OutputRole>), ClassifierError> {
        let typed = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .and_then(|m| m.with_input_fact(0, f32::fact([1, width]).into()))
            .and_then(|m| m.into_optimized())
            .map_err(ClassifierError::Inference)?;

        let outputs = describe_outputs(&typed)?;
        let plan = typed.into_runnable().map_err(ClassifierError::Inference)?;
        Ok((plan, outputs))
    }

    pub fn manifest(&self) -> &PipelineManifest {
        &self.manifest
    }

    fn run_row(&self, features: Vec<f32>) -> Result<RowOutput, ClassifierError> {
        let start = Instant::now();

        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.encoder.width()), features)
                .map_err(|e| ClassifierError::Inference(e.into()))?
                .into();
        let result = self
            .plan
            .run(tvec!(input.into()))
            .map_err(ClassifierError::Inference)?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(model = %self.name, elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(model = %self.name, elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        let mut output = RowOutput::default();
        for (value, role) in result.iter().zip(&self.outputs) {
            match role {
                OutputRole::Label => output.label = first_label(value)?,
                OutputRole::Probabilities => {
                    let probs = value
                        .to_array_view::<f32>()
                        .map_err(ClassifierError::Inference)?
                        .iter()
                        .copied()
                        .collect();
                    output.probabilities = Some(probs);
                }
                OutputRole::Ignored => {}
            }
        }
        Ok(output)
    }

    fn resolve_label(&self, output: RowOutput) -> Result<ClassValue, ClassifierError> {
        if let Some(label) = output.label {
            return Ok(label);
        }
        let probs = output.probabilities.ok_or(ClassifierError::NoLabel)?;
        let idx = argmax(&probs).ok_or(ClassifierError::NoLabel)?;
        self.manifest
            .classes
            .get(idx)
            .cloned()
            .ok_or(ClassifierError::UnknownClassIndex(idx))
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.manifest.version
    }

    fn predict(&self, frame: &Frame) -> Result<Vec<ClassValue>, ClassifierError> {
        (0..frame.len())
            .map(|row| {
                let features = self.encoder.encode_row(frame, row)?;
                let output = self.run_row(features)?;
                self.resolve_label(output)
            })
            .collect()
    }

    fn predict_proba(&self, frame: &Frame) -> Result<Vec<Vec<f32>>, ClassifierError> {
        if !self.supports_proba() {
            return Err(ClassifierError::Unsupported("predict_proba"));
        }
        (0..frame.len())
            .map(|row| {
                let features = self.encoder.encode_row(frame, row)?;
                self.run_row(features)?
                    .probabilities
                    .ok_or(ClassifierError::Unsupported("predict_proba"))
            })
            .collect()
    }

    fn supports_proba(&self) -> bool {
        self.outputs.contains(&OutputRole::Probabilities)
    }
}

fn describe_outputs(model: &TypedModel) -> Result<Vec<OutputRole>, ClassifierError> {
    let outlets = model.output_outlets().map_err(ClassifierError::Inference)?;
    outlets
        .iter()
        .map(|outlet| {
            let fact = model
                .outlet_fact(*outlet)
                .map_err(ClassifierError::Inference)?;
            Ok(match fact.datum_type {
                DatumType::I64 | DatumType::I32 | DatumType::String => OutputRole::Label,
                DatumType::F32 if fact.shape.rank() == 2 => OutputRole::Probabilities,
                _ => OutputRole::Ignored,
            })
        })
        .collect()
}

fn first_label(tensor: &Tensor) -> Result<Option<ClassValue>, ClassifierError> {
    let label = match tensor.datum_type() {
        DatumType::I64 => tensor
            .as_slice::<i64>()
            .map_err(ClassifierError::Inference)?
            .first()
            .map(|v| ClassValue::Int(*v)),
        DatumType::I32 => tensor
            .as_slice::<i32>()
            .map_err(ClassifierError::Inference)?
            .first()
            .map(|v| ClassValue::Int(i64::from(*v))),
        DatumType::String => tensor
            .as_slice::<String>()
            .map_err(ClassifierError::Inference)?
            .first()
            .cloned()
            .map(ClassValue::Text),
        _ => None,
    };
    Ok(label)
}

fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmonize::Harmonizer;
    use prost::Message;
    use std::collections::BTreeMap;
    use tract_onnx::pb;
    use tract_onnx::pb::tensor_proto::DataType;

    /// 8 numeric columns plus one "Unknown" slot per categorical column
    const WIDTH: usize = 11;

    fn value_info(name: &str, elem_type: DataType, dims: &[i64]) -> pb::ValueInfoProto {
        let dim = dims
            .iter()
            .map(|d| pb::tensor_shape_proto::Dimension {
                value: Some(pb::tensor_shape_proto::dimension::Value::DimValue(*d)),
                ..Default::default()
            })
            .collect();
        pb::ValueInfoProto {
            name: name.to_string(),
            r#type: Some(pb::TypeProto {
                value: Some(pb::type_proto::Value::TensorType(pb::type_proto::Tensor {
                    elem_type: elem_type as i32,
                    shape: Some(pb::TensorShapeProto { dim }),
                })),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn int_attr(name: &str, value: i64) -> pb::AttributeProto {
        pb::AttributeProto {
            name: name.to_string(),
            r#type: pb::attribute_proto::AttributeType::Int as i32,
            i: value,
            ..Default::default()
        }
    }

    /// Linear scorer over the encoded row. Impact weighs `[1, 2, 3]` on the
    /// three classes; every other feature weighs nothing.
    fn scorer_graph(with_scores: bool, with_label: bool) -> Vec<u8> {
        let mut weights = vec![0.0f32; WIDTH * 3];
        weights[..3].copy_from_slice(&[1.0, 2.0, 3.0]);

        let mut node = vec![pb::NodeProto {
            input: vec!["features".to_string(), "weights".to_string()],
            output: vec!["scores".to_string()],
            name: "score".to_string(),
            op_type: "MatMul".to_string(),
            ..Default::default()
        }];
        let mut output = Vec::new();
        if with_scores {
            output.push(value_info("scores", DataType::Float, &[1, 3]));
        }
        if with_label {
            node.push(pb::NodeProto {
                input: vec!["scores".to_string()],
                output: vec!["label".to_string()],
                name: "pick".to_string(),
                op_type: "ArgMax".to_string(),
                attribute: vec![int_attr("axis", 1), int_attr("keepdims", 0)],
                ..Default::default()
            });
            output.insert(0, value_info("label", DataType::Int64, &[1]));
        }

        let graph = pb::GraphProto {
            name: "ticket_scorer".to_string(),
            node,
            initializer: vec![pb::TensorProto {
                name: "weights".to_string(),
                dims: vec![WIDTH as i64, 3],
                data_type: DataType::Float as i32,
                float_data: weights,
                ..Default::default()
            }],
            input: vec![value_info("features", DataType::Float, &[1, WIDTH as i64])],
            output,
            ..Default::default()
        };

        pb::ModelProto {
            ir_version: 7,
            opset_import: vec![pb::OperatorSetIdProto {
                domain: String::new(),
                version: 13,
            }],
            graph: Some(graph),
            ..Default::default()
        }
        .encode_to_vec()
    }

    fn tickets(impacts: &[u32]) -> Frame {
        let mut csv = String::from("Impact\n");
        for impact in impacts {
            csv.push_str(&format!("{}\n", impact));
        }
        Harmonizer::default().harmonize(&Frame::from_csv_bytes(csv.as_bytes()).unwrap())
    }

    fn manifest() -> PipelineManifest {
        let mut categories = BTreeMap::new();
        for column in ["Status", "Category", "Closure_Code"] {
            categories.insert(column.to_string(), vec!["Unknown".to_string()]);
        }
        PipelineManifest {
            categories,
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_model_bytes_rejected() {
        let result = OnnxClassifier::from_bytes("broken", b"not an onnx graph", manifest());
        assert!(matches!(result, Err(ClassifierError::Inference(_))));
    }

    #[test]
    fn test_manifest_checked_before_graph() {
        let result = OnnxClassifier::from_bytes("broken", b"", PipelineManifest::default());
        assert!(matches!(result, Err(ClassifierError::MissingVocabulary(_))));
    }

    #[test]
    fn test_label_and_probability_outputs() {
        let model = scorer_graph(true, true);
        let classifier = OnnxClassifier::from_bytes("scorer", &model, manifest()).unwrap();

        assert_eq!(
            classifier.outputs,
            vec![OutputRole::Label, OutputRole::Probabilities]
        );
        assert!(classifier.supports_proba());

        let frame = tickets(&[2, 1]);
        let labels = classifier.predict(&frame).unwrap();
        assert_eq!(labels, vec![ClassValue::Int(2), ClassValue::Int(2)]);

        let proba = classifier.predict_proba(&frame).unwrap();
        assert_eq!(proba, vec![vec![2.0, 4.0, 6.0], vec![1.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_label_only_graph_has_no_probabilities() {
        let model = scorer_graph(false, true);
        let classifier = OnnxClassifier::from_bytes("scorer", &model, manifest()).unwrap();

        assert_eq!(classifier.outputs, vec![OutputRole::Label]);
        assert!(!classifier.supports_proba());

        let frame = tickets(&[3]);
        assert_eq!(classifier.predict(&frame).unwrap(), vec![ClassValue::Int(2)]);
        assert!(matches!(
            classifier.predict_proba(&frame),
            Err(ClassifierError::Unsupported(_))
        ));
    }

    #[test]
    fn test_probabilities_only_graph_maps_manifest_classes() {
        let model = scorer_graph(true, false);
        let manifest = PipelineManifest {
            classes: vec![ClassValue::Int(1), ClassValue::Int(3), ClassValue::Int(5)],
            ..manifest()
        };
        let classifier = OnnxClassifier::from_bytes("scorer", &model, manifest).unwrap();

        assert_eq!(classifier.outputs, vec![OutputRole::Probabilities]);
        assert_eq!(
            classifier.predict(&tickets(&[4])).unwrap(),
            vec![ClassValue::Int(5)]
        );
    }

    #[test]
    fn test_probabilities_without_classes_is_an_error() {
        let model = scorer_graph(true, false);
        let classifier = OnnxClassifier::from_bytes("scorer", &model, manifest()).unwrap();

        let err = classifier.predict(&tickets(&[1])).unwrap_err();
        assert!(matches!(err, ClassifierError::UnknownClassIndex(2)));
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[f32::NAN, 0.3]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_first_label_reads_int64_tensor() {
        let tensor = tensor1(&[3i64, 1]);
        assert_eq!(first_label(&tensor).unwrap(), Some(ClassValue::Int(3)));
    }

    #[test]
    fn test_first_label_ignores_float_tensor() {
        let tensor = tensor1(&[0.5f32]);
        assert_eq!(first_label(&tensor).unwrap(), None);
    }
}

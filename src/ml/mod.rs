// ============================================================
// Layer 5 — ML / Model Layer
// ============================================================
// The model-and-training engine, written directly against
// plain `Vec<f32>` buffers sized from one `Architecture`.
//
// What's in this layer:
//
//   params.rs     — the four parameter tensors, generic over
//                   f32 (weights, gradients, moments) and i8
//
//   ops.rs        — Leaky ReLU, causal dilated convolution taps,
//                   dense layer, softmax, cross-entropy
//
//   model.rs      — TrainableModel (keeps activations for
//                   backprop) and InferenceModel (lean, shared)
//
//   backward.rs   — per-sample gradients of the cross-entropy loss
//
//   optimizer.rs  — global-norm clipping, SGD and Adam
//
//   trainer.rs    — the epoch loop with validation metrics
//
//   serializer.rs — header-checked model blobs
//
//   quantizer.rs  — fixed-scale int8 post-training quantization
//
//   inferencer.rs — optional loaded model behind `Classifier`
//
// Reference: Bai et al. (2018) An Empirical Evaluation of
//            Generic Convolutional and Recurrent Networks
//            Kingma & Ba (2015) Adam

/// Parameter tensors shared by every model view
pub mod params;

/// Stateless numerical building blocks
pub mod ops;

/// Trainable and inference models with their forward passes
pub mod model;

/// Backward pass for TrainableModel
pub mod backward;

/// Gradient clipping and update rules
pub mod optimizer;

/// Epoch loop
pub mod trainer;

/// Model blob encoding and decoding
pub mod serializer;

/// Int8 post-training quantization
pub mod quantizer;

/// Optional loaded model behind the Classifier trait
pub mod inferencer;

// ============================================================
// Layer 5 — Model Serializer
// ============================================================
// Byte layout of a model blob:
//
//   offset  size  field
//   0       4     magic  "TCNF" (f32 payload) | "TCNQ" (i8 payload)
//   4       4     F  features      u32 little-endian
//   8       4     T  seq_len
//   12      4     C  channels
//   16      4     K  kernel_size
//   20      4     N  num_classes
//   24      4     D  dilation
//   28      ...   tcn_weights, tcn_biases, head_weights, head_biases
//
// Float payloads are little-endian f32, int8 payloads are raw
// bytes. A reader states the architecture it expects and every
// header field is compared against it, so a blob written for a
// different shape is rejected instead of being misread.

use crate::domain::architecture::Architecture;
use crate::domain::error::{TcnError, TcnResult};
use crate::ml::model::InferenceModel;
use crate::ml::params::ParamSet;
use crate::ml::quantizer::QuantizedModel;

pub const FLOAT_MAGIC: [u8; 4] = *b"TCNF";
pub const QUANT_MAGIC: [u8; 4] = *b"TCNQ";

/// Magic plus six u32 dimensions.
pub const HEADER_LEN: usize = 4 + 6 * 4;

fn write_header(out: &mut Vec<u8>, magic: [u8; 4], arch: &Architecture) -> TcnResult<()> {
    out.extend_from_slice(&magic);
    for (name, value) in arch.fields() {
        let value = u32::try_from(value)
            .map_err(|_| TcnError::InvalidConfig(format!("{name} = {value} does not fit in a model header")))?;
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(())
}

/// Validate the header against `expected` and return the payload.
fn read_header<'a>(bytes: &'a [u8], magic: [u8; 4], expected: &Architecture) -> TcnResult<&'a [u8]> {
    if bytes.len() < 4 {
        return Err(TcnError::Truncated { expected: HEADER_LEN, found: bytes.len() });
    }
    let found = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if found != magic {
        return Err(TcnError::BadMagic { expected: magic, found });
    }
    if bytes.len() < HEADER_LEN {
        return Err(TcnError::Truncated { expected: HEADER_LEN, found: bytes.len() });
    }

    for ((field, want), chunk) in expected.fields().into_iter().zip(bytes[4..HEADER_LEN].chunks_exact(4)) {
        let got = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as usize;
        if got != want {
            return Err(TcnError::ArchitectureMismatch { field, expected: want, found: got });
        }
    }
    Ok(&bytes[HEADER_LEN..])
}

/// Payload must hold exactly `need` bytes.
fn check_payload(total: usize, payload: usize, need: usize) -> TcnResult<()> {
    if payload < need {
        return Err(TcnError::Truncated { expected: HEADER_LEN + need, found: total });
    }
    if payload > need {
        return Err(TcnError::TrailingBytes(payload - need));
    }
    Ok(())
}

/// Serialize float parameters into a `TCNF` blob.
pub fn encode_float(arch: &Architecture, params: &ParamSet<f32>) -> TcnResult<Vec<u8>> {
    if params.len() != arch.param_count() {
        return Err(TcnError::DimensionMismatch { expected: arch.param_count(), actual: params.len() });
    }
    let mut out = Vec::with_capacity(HEADER_LEN + params.len() * 4);
    write_header(&mut out, FLOAT_MAGIC, arch)?;
    for v in params.values() {
        out.extend_from_slice(&v.to_le_bytes());
    }
    Ok(out)
}

/// Deserialize a `TCNF` blob into an inference model of shape `expected`.
pub fn decode_float(bytes: &[u8], expected: &Architecture) -> TcnResult<InferenceModel> {
    let payload = read_header(bytes, FLOAT_MAGIC, expected)?;
    check_payload(bytes.len(), payload.len(), expected.param_count() * 4)?;

    let flat: Vec<f32> = payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    InferenceModel::from_params(*expected, ParamSet::from_flat(expected, flat)?)
}

/// Serialize an int8 model into a `TCNQ` blob.
pub fn encode_quantized(model: &QuantizedModel) -> TcnResult<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_LEN + model.byte_size());
    write_header(&mut out, QUANT_MAGIC, model.arch())?;
    out.extend(model.params().values().map(|&q| q as u8));
    Ok(out)
}

//! Safetensors weight loading for Candle models.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use tracing::debug;

use crate::error::InferenceError;

/// Reads a safetensors file into a `VarBuilder` on `device`.
///
/// Tensors are copied out of the file buffer, so the builder owns its data.
///
/// # Errors
///
/// Returns [`InferenceError::ModelNotFound`] if the file does not exist, and
/// [`InferenceError::Load`] if it cannot be read or holds an unsupported
/// tensor.
pub fn load_safetensors(
    model: &'static str,
    path: &Path,
    device: &Device,
) -> Result<VarBuilder<'static>, InferenceError> {
    if !path.is_file() {
        return Err(InferenceError::ModelNotFound(path.to_path_buf()));
    }
    debug!(model, path = %path.display(), "loading safetensors");

    let data = std::fs::read(path).map_err(|e| InferenceError::load(model, e))?;
    let file = SafeTensors::deserialize(&data).map_err(|e| InferenceError::load(model, e))?;

    let mut tensors: HashMap<String, Tensor> = HashMap::with_capacity(file.len());
    for (name, view) in file.tensors() {
        let dtype = candle_dtype(view.dtype()).ok_or_else(|| {
            InferenceError::load(
                model,
                format!("tensor '{name}' has unsupported dtype {:?}", view.dtype()),
            )
        })?;
        let tensor = Tensor::from_raw_buffer(view.data(), dtype, view.shape(), device)
            .map_err(|e| InferenceError::load(model, format!("tensor '{name}': {e}")))?;
        tensors.insert(name, tensor);
    }
    debug!(model, count = tensors.len(), "weights loaded");

    Ok(VarBuilder::from_tensors(tensors, DType::F32, device))
}

fn candle_dtype(dtype: safetensors::Dtype) -> Option<DType> {
    use safetensors::Dtype as S;
    match dtype {
        S::F32 => Some(DType::F32),
        S::F64 => Some(DType::F64),
        S::F16 => Some(DType::F16),
        S::BF16 => Some(DType::BF16),
        S::I64 => Some(DType::I64),
        S::U8 => Some(DType::U8),
        S::U32 => Some(DType::U32),
        _ => None,
    }
}

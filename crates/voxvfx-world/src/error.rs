use thiserror::Error;

/// Failures while placing models from the scene graph into the world.
#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("transform {transform} references missing node {child}")]
    MissingNode { transform: i32, child: i32 },

    #[error("shape {shape} references missing model {model_id}")]
    MissingModel { shape: i32, model_id: i32 },

    #[error("model {0} was already released")]
    ModelReleased(usize),
}

//! Transformation: cell transforms, the column executor, and the pipeline.

pub mod cell;
pub mod executor;
pub mod pipeline;

pub use cell::{transforms_description, BuiltinTransform, CellTransform, FnTransform};
pub use executor::{apply_to_column, ColumnTransformResult, ExecuteOptions};
pub use pipeline::{
    transform_bytes, transform_file, CsvInfo, PipelineOutput, TransformOptions,
};

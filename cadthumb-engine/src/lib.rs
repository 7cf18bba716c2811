pub mod bounds;
pub mod emit;
pub mod extract;
pub mod render;
pub mod style;
pub mod viewport;

pub mod errors {
    use thiserror::Error;

    /// 单个实体取点失败。调用方记录警告后跳过该实体。
    #[derive(Debug, Error)]
    pub enum ExtractionError {
        #[error("block {0:?} is not defined")]
        MissingBlock(String),
        #[error("block nesting deeper than {limit} at {name:?}")]
        DepthExceeded { name: String, limit: usize },
        #[error("non-finite coordinate in {0} entity")]
        NonFinite(String),
    }

    /// 单个实体渲染失败，同样只影响该实体。
    #[derive(Debug, Error)]
    pub enum RenderError {
        #[error("block {0:?} is not defined")]
        MissingBlock(String),
        #[error("block nesting deeper than {limit} at {name:?}")]
        DepthExceeded { name: String, limit: usize },
        #[error("non-finite geometry produced for {0} entity")]
        NonFinite(String),
    }
}

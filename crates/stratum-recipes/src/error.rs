use thiserror::Error;

pub type RecipeResult<T> = std::result::Result<T, RecipeError>;

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("unknown recipe factory: {0}")]
    UnknownFactory(String),

    #[error("unknown model preset: {0}")]
    UnknownPreset(String),

    #[error("invalid factory expression `{expr}`: {reason}")]
    InvalidExpression { expr: String, reason: String },

    #[error("invalid arguments for {factory}: {message}")]
    InvalidArguments { factory: String, message: String },

    #[error("invalid override `{path}`: {reason}")]
    InvalidOverride { path: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlSerialize(#[from] toml::ser::Error),

    #[error(transparent)]
    TomlParse(#[from] toml::de::Error),
}

use std::fmt;
use std::path::PathBuf;

use crate::model::CategoryId;

/// Errors raised while reading a model file or resolving named objects in it.
///
/// All of these are fatal: they are reported before any scanning begins.
#[derive(Debug, Clone)]
pub enum LoadError {
    FileNotFound(PathBuf),
    Io {
        path: PathBuf,
        message: String,
    },
    Parse {
        path: PathBuf,
        message: String,
    },
    UnsupportedFormat(PathBuf),
    WorkspaceNotFound {
        file: String,
        workspace: String,
    },
    ModelConfigNotFound {
        workspace: String,
        model_config: String,
    },
    PdfNotFound {
        model_config: String,
        pdf: String,
    },
    DuplicateParameter(String),
    /// A pdf, modifier or model config references a parameter that was never declared
    UnknownParameter {
        context: String,
        parameter: String,
    },
    TooManyCategories {
        pdf: String,
        count: usize,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::FileNotFound(path) => {
                write!(f, "file '{}' does not exist", path.display())
            }
            LoadError::Io { path, message } => {
                write!(f, "could not read '{}': {message}", path.display())
            }
            LoadError::Parse { path, message } => {
                write!(f, "could not parse '{}': {message}", path.display())
            }
            LoadError::UnsupportedFormat(path) => write!(
                f,
                "unsupported model file '{}' (expected .json, .yaml or .yml)",
                path.display()
            ),
            LoadError::WorkspaceNotFound { file, workspace } => {
                write!(f, "workspace '{workspace}' not found inside file '{file}'")
            }
            LoadError::ModelConfigNotFound {
                workspace,
                model_config,
            } => write!(
                f,
                "model config '{model_config}' not found in workspace '{workspace}'"
            ),
            LoadError::PdfNotFound { model_config, pdf } => {
                write!(f, "pdf '{pdf}' referenced by model config '{model_config}' not found")
            }
            LoadError::DuplicateParameter(name) => {
                write!(f, "parameter '{name}' is declared more than once")
            }
            LoadError::UnknownParameter { context, parameter } => {
                write!(f, "{context} references undeclared parameter '{parameter}'")
            }
            LoadError::TooManyCategories { pdf, count } => write!(
                f,
                "pdf '{pdf}' has {count} categories, at most {} are supported",
                CategoryId::MAX_COUNT
            ),
        }
    }
}

impl std::error::Error for LoadError {}

/// Structural problems with a loaded model that make it unsafe to scan
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    NotSimultaneous { pdf: String, kind: String },
    ReservedDelimiter { category: String },
    NoParameterOfInterest,
    DuplicateSample { category: String, sample: String },
    ReservedSampleName { category: String, sample: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NotSimultaneous { pdf, kind } => write!(
                f,
                "pdf '{pdf}' is a '{kind}', not a simultaneous pdf; investigate the input histograms"
            ),
            ValidationError::ReservedDelimiter { category } => write!(
                f,
                "category name '{category}' contains the reserved character '/'; rename the channel"
            ),
            ValidationError::NoParameterOfInterest => {
                write!(f, "model config does not designate a parameter of interest")
            }
            ValidationError::DuplicateSample { category, sample } => {
                write!(f, "sample '{sample}' appears twice in category '{category}'")
            }
            ValidationError::ReservedSampleName { category, sample } => write!(
                f,
                "category '{category}' has a component named '{sample}', which is a reserved pseudo-sample"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors from evaluating yields at the current parameter state
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    UnknownCategory(CategoryId),
    UnknownComponent {
        category: String,
        index: usize,
    },
    NoObservableBinding {
        category: String,
    },
    BinMismatch {
        component: String,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnknownCategory(id) => write!(f, "category {id:?} does not exist"),
            EvalError::UnknownComponent { category, index } => {
                write!(f, "category '{category}' has no component #{index}")
            }
            EvalError::NoObservableBinding { category } => {
                write!(f, "category '{category}' has no valid observable binding")
            }
            EvalError::BinMismatch {
                component,
                expected,
                actual,
            } => write!(
                f,
                "component '{component}' has {actual} bins but its observable has {expected}"
            ),
        }
    }
}

impl std::error::Error for EvalError {}

/// Errors related to name lookups after loading
#[derive(Debug, Clone, PartialEq)]
pub enum LookupError {
    SampleNotFound(String),
    ParameterNotFound(String),
    CategoryNotFound(String),
    ConstantNotFound(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::SampleNotFound(name) => {
                write!(f, "could not find sample '{name}' in the sensitivity table")
            }
            LookupError::ParameterNotFound(name) => write!(f, "parameter '{name}' not found"),
            LookupError::CategoryNotFound(name) => write!(f, "category '{name}' not found"),
            LookupError::ConstantNotFound(name) => {
                write!(f, "model constant '{name}' not found")
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// The model changed shape between a snapshot capture and its restore
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotError {
    MissingParameter(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::MissingParameter(name) => write!(
                f,
                "snapshot holds parameter '{name}' which no longer exists in the model"
            ),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Any failure of an inspection run
#[derive(Debug, Clone)]
pub enum InspectError {
    Load(LoadError),
    Validation(ValidationError),
    Eval(EvalError),
    Lookup(LookupError),
    Snapshot(SnapshotError),
}

impl fmt::Display for InspectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectError::Load(e) => write!(f, "{e}"),
            InspectError::Validation(e) => write!(f, "{e}"),
            InspectError::Eval(e) => write!(f, "{e}"),
            InspectError::Lookup(e) => write!(f, "{e}"),
            InspectError::Snapshot(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InspectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InspectError::Load(e) => Some(e),
            InspectError::Validation(e) => Some(e),
            InspectError::Eval(e) => Some(e),
            InspectError::Lookup(e) => Some(e),
            InspectError::Snapshot(e) => Some(e),
        }
    }
}

impl From<LoadError> for InspectError {
    fn from(err: LoadError) -> Self {
        InspectError::Load(err)
    }
}

impl From<ValidationError> for InspectError {
    fn from(err: ValidationError) -> Self {
        InspectError::Validation(err)
    }
}

impl From<EvalError> for InspectError {
    fn from(err: EvalError) -> Self {
        InspectError::Eval(err)
    }
}

impl From<LookupError> for InspectError {
    fn from(err: LookupError) -> Self {
        InspectError::Lookup(err)
    }
}

impl From<SnapshotError> for InspectError {
    fn from(err: SnapshotError) -> Self {
        InspectError::Snapshot(err)
    }
}

pub type Result<T> = std::result::Result<T, InspectError>;

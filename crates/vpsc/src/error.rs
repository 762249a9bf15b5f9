#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("variable {index} is invalid: {reason}")]
    InvalidVariable { index: usize, reason: &'static str },
    #[error("constraint {index} references variable {variable}, but only {count} variables exist")]
    MissingVariable {
        index: usize,
        variable: usize,
        count: usize,
    },
    #[error("constraint {index} has a non-finite gap")]
    InvalidGap { index: usize },
    #[error("constraint {index} is still violated after satisfy (slack {slack})")]
    UnsatisfiedConstraint { index: usize, slack: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;

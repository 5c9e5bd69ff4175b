//! Walking a chain of causes.

use std::fmt;
use std::iter::FusedIterator;
use std::str::FromStr;

use crate::kind::ErrorKind;
use crate::kind_error::{ErrorRef, KindError};

/// The order in which [`errors_from_error`] yields a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorOrder {
    /// The given error first, then its cause, then that cause's cause.
    #[default]
    ConsequenceFirst,
    /// The root cause first, ending with the given error.
    CauseFirst,
}

impl fmt::Display for ErrorOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ConsequenceFirst => "consequence-first",
            Self::CauseFirst => "cause-first",
        })
    }
}

impl FromStr for ErrorOrder {
    type Err = KindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consequence-first" | "ConsequenceFirst" => Ok(Self::ConsequenceFirst),
            "cause-first" | "CauseFirst" => Ok(Self::CauseFirst),
            other => Err(KindError::new(
                format!("Invalid error order: {other:?}"),
                ErrorKind::INVALID_INPUT,
            )),
        }
    }
}

/// Iterator over the errors in a cause chain.
///
/// Consequence-first iteration follows causes lazily. Cause-first
/// iteration has to reach the root before yielding anything, so it walks
/// the chain once up front.
#[derive(Debug, Clone)]
pub struct ErrorChain<'a> {
    state: ChainState<'a>,
}

#[derive(Debug, Clone)]
enum ChainState<'a> {
    Forward(Option<ErrorRef<'a>>),
    Reversed(std::iter::Rev<std::vec::IntoIter<ErrorRef<'a>>>),
}

impl<'a> Iterator for ErrorChain<'a> {
    type Item = ErrorRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            ChainState::Forward(next) => {
                let current = next.take()?;
                *next = current.cause();
                Some(current)
            }
            ChainState::Reversed(errors) => errors.next(),
        }
    }
}

impl FusedIterator for ErrorChain<'_> {}

/// The errors in the chain starting at `error`, in the requested order.
///
/// Structured errors lead to their cause; an opaque error is yielded but
/// ends the chain. `None` yields nothing.
#[must_use]
pub fn errors_from_error(error: Option<ErrorRef<'_>>, order: ErrorOrder) -> ErrorChain<'_> {
    let forward = ErrorChain {
        state: ChainState::Forward(error),
    };
    match order {
        ErrorOrder::ConsequenceFirst => forward,
        ErrorOrder::CauseFirst => {
            let errors: Vec<_> = forward.collect();
            ErrorChain {
                state: ChainState::Reversed(errors.into_iter().rev()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind_error::OpaqueError;

    fn three_deep() -> KindError {
        let root = KindError::builder("root", ErrorKind::NOT_FOUND)
            .cause(OpaqueError::new("IoError", "disk"))
            .build();
        let middle = KindError::caused_by("middle", ErrorKind::INTERNAL, root);
        KindError::caused_by("outer", ErrorKind::UNKNOWN, middle)
    }

    fn names(chain: ErrorChain<'_>) -> Vec<String> {
        chain.map(|e| e.name().to_owned()).collect()
    }

    #[test]
    fn none_is_empty() {
        assert_eq!(errors_from_error(None, ErrorOrder::ConsequenceFirst).count(), 0);
        assert_eq!(errors_from_error(None, ErrorOrder::CauseFirst).count(), 0);
    }

    #[test]
    fn consequence_first() {
        let error = three_deep();
        let chain = errors_from_error(Some(error.as_error_ref()), ErrorOrder::ConsequenceFirst);
        assert_eq!(
            names(chain),
            ["UnknownError", "InternalError", "NotFoundError", "IoError"]
        );
    }

    #[test]
    fn cause_first() {
        let error = three_deep();
        let chain = errors_from_error(Some(error.as_error_ref()), ErrorOrder::CauseFirst);
        assert_eq!(
            names(chain),
            ["IoError", "NotFoundError", "InternalError", "UnknownError"]
        );
    }

    #[test]
    fn opaque_error_alone() {
        let error = OpaqueError::new("Error", "plain");
        let chain: Vec<_> =
            errors_from_error(Some((&error).into()), ErrorOrder::ConsequenceFirst).collect();
        assert_eq!(chain.len(), 1);
        assert!(chain[0].as_kind_error().is_none());
    }

    #[test]
    fn chain_is_fused() {
        let error = KindError::new("single", ErrorKind::INTERNAL);
        let mut chain = errors_from_error(Some(error.as_error_ref()), ErrorOrder::CauseFirst);
        assert!(chain.next().is_some());
        assert!(chain.next().is_none());
        assert!(chain.next().is_none());
    }

    #[test]
    fn parse_order() {
        assert_eq!(
            "cause-first".parse::<ErrorOrder>().unwrap(),
            ErrorOrder::CauseFirst
        );
        assert_eq!(
            "ConsequenceFirst".parse::<ErrorOrder>().unwrap(),
            ErrorOrder::ConsequenceFirst
        );
    }

    #[test]
    fn invalid_order_is_invalid_input() {
        let error = "sideways".parse::<ErrorOrder>().unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::INVALID_INPUT);
        assert!(error.message().contains("sideways"));
    }
}

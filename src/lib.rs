//! Form validation with custom error placement, custom messages and
//! custom validator functions, layered over native constraint validation.
//!
//! The validator talks to its document through the [`Document`] trait. The
//! crate ships [`Dom`], an in-memory document with an HTML parser, a
//! selector subset and browser-style constraint validation.
//!
//! ```
//! use valid_mate::{Dom, FormValidator, Options};
//!
//! let dom = Dom::parse(r#"<form><input id="name" required></form>"#)?;
//! let form = dom.query_selector(dom.root(), "form")?.expect("form");
//! let mut validator = FormValidator::new(dom, form, Options::default())?;
//!
//! let outcome = validator.submit()?;
//! assert!(!outcome.valid);
//! assert!(validator.document().by_id("error-name").is_some());
//! # Ok::<(), valid_mate::Error>(())
//! ```

use std::error::Error as StdError;
use std::fmt;

mod document;
mod dom;
mod events;
mod html;
mod js_regex;
mod messages;
mod selector;
mod trace;
mod validator;
mod validity;

pub use document::Document;
pub use dom::{Dom, NodeId};
pub use events::{SubmitEvent, SubmitOutcome};
pub use messages::{
    FailureReason, GENERIC_ERROR_MESSAGE, MessageTable, MessageTableOverride, ValidationMessages,
    ValidationMessagesOverride,
};
pub use validator::{
    CustomValidator, Field, FieldVerdict, FormValidator, Options, VALIDATOR_ATTR,
    ValidationError,
};
pub use validity::ValidityState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    Dom(String),
    NodeNotFound(String),
    UnsupportedSelector(String),
    InvalidOption(String),
    Validator { name: String, message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::Dom(msg) => write!(f, "dom error: {msg}"),
            Self::NodeNotFound(what) => write!(f, "node not found: {what}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::InvalidOption(msg) => write!(f, "invalid option: {msg}"),
            Self::Validator { name, message } => {
                write!(f, "custom validator {name} failed: {message}")
            }
        }
    }
}

impl StdError for Error {}

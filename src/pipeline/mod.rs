//! Pipeline stages for document triage.
//!
//! Each submodule implements exactly one concern so the agents on top stay
//! thin and every piece can be tested against a stub.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ ocr ──▶ llm ──▶ response
//! (path)   (text)  (raw)   (typed record or fallback)
//! ```
//!
//! 1. [`input`]   : validate the user-supplied path and load bytes or text
//! 2. [`ocr`]     : submit bytes to the document-analysis service and join
//!    the recognised lines
//! 3. [`llm`]     : send one system + user message to the model backend
//!    under a timeout
//! 4. [`response`]: turn the model's free-form text into a typed record, or
//!    classify why it could not be used

pub mod input;
pub mod llm;
pub mod ocr;
pub mod response;
